//! The configuration resolution engine.

use tracing::{debug, warn};

use crate::error::{ConfigError, SourceError, ValidationError};
use crate::interp::expand_references;
use crate::parser::{Parser, ParserRegistry};
use crate::source::{ConfigMap, RawValue, Source};
use crate::typed::{Kind, TypedValue};

/// Layered configuration resolver.
///
/// Sources merge into one flat key space in ascending priority order, so
/// the highest-priority source defining a key wins; among sources at equal
/// priority the one registered later wins. The merged map is cached and
/// rebuilt lazily after [`invalidate`](Config::invalidate) or any change to
/// the source list.
///
/// Typed access goes through [`resolve`](Config::resolve), which hands the
/// raw merged value to the first registered parser that can handle the
/// requested kind.
///
/// ## Strict and lenient modes
///
/// A strict engine fails resolution when any source fails to load. A
/// lenient engine skips failing sources, logs a warning, and keeps going;
/// the skipped errors stay readable through
/// [`load_failures`](Config::load_failures). Missing keys and validation
/// failures are never downgraded in either mode.
///
/// ## Example
///
/// ```no_run
/// use stratoconf::{Config, EnvSource, FileSource, MemorySource, Port};
///
/// let mut config = Config::strict();
/// config.add_source(MemorySource::with_entries("defaults", [("port", 8080)]));
/// config.add_source(FileSource::json("config/app.json", false));
/// config.add_source(EnvSource::with_prefix("APP_"));
///
/// let port: Port = config.resolve("port")?;
/// # Ok::<(), stratoconf::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct Config {
    sources: Vec<Box<dyn Source>>,
    parsers: ParserRegistry,
    strict: bool,
    interpolate: bool,
    cache: ConfigMap,
    dirty: bool,
    failures: Vec<SourceError>,
}

impl Config {
    /// Engine that fails when any source cannot load.
    pub fn strict() -> Self {
        Self::with_mode(true)
    }

    /// Engine that skips failing sources and keeps going.
    pub fn lenient() -> Self {
        Self::with_mode(false)
    }

    fn with_mode(strict: bool) -> Self {
        Self {
            sources: Vec::new(),
            parsers: ParserRegistry::default(),
            strict,
            interpolate: false,
            cache: ConfigMap::new(),
            dirty: true,
            failures: Vec::new(),
        }
    }

    /// Whether the engine is in strict mode.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Switches between strict and lenient modes.
    ///
    /// The merged map is rebuilt on next access; a map merged under one
    /// policy never answers queries under the other.
    pub fn set_strict(&mut self, strict: bool) {
        if self.strict != strict {
            self.strict = strict;
            self.dirty = true;
        }
    }

    /// Enables `${key}` reference expansion over the merged map.
    #[must_use]
    pub fn with_interpolation(mut self, enabled: bool) -> Self {
        self.interpolate = enabled;
        self.dirty = true;
        self
    }

    /// Registers a source.
    ///
    /// Registration order breaks priority ties: of two sources at the same
    /// priority, the later one wins.
    pub fn add_source<S: Source + 'static>(&mut self, source: S) {
        self.sources.push(Box::new(source));
        self.dirty = true;
    }

    /// Removes every source with the given name, reporting whether any was
    /// removed.
    pub fn remove_source(&mut self, name: &str) -> bool {
        let before = self.sources.len();
        self.sources.retain(|source| source.name() != name);
        let removed = self.sources.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// Registers a parser strategy for typed resolution.
    pub fn add_parser<P: Parser + 'static>(&mut self, parser: P) {
        self.parsers.register(parser);
    }

    /// Returns the merged key space, rebuilding it if anything changed.
    pub fn merged(&mut self) -> Result<&ConfigMap, ConfigError> {
        if self.dirty {
            self.rebuild()?;
        }
        Ok(&self.cache)
    }

    /// Whether the merged configuration defines the key.
    ///
    /// In strict mode a failing source surfaces as an error here rather
    /// than reporting the key absent.
    pub fn has(&mut self, key: &str) -> Result<bool, ConfigError> {
        Ok(self.merged()?.contains_key(key))
    }

    /// Fetches the raw merged value for a key.
    pub fn get_raw(&mut self, key: &str) -> Result<RawValue, ConfigError> {
        self.merged()?
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    /// Fetches the raw merged value, substituting `default` when the key is
    /// absent. Source failures in strict mode still surface.
    pub fn get_raw_or(
        &mut self,
        key: &str,
        default: impl Into<RawValue>,
    ) -> Result<RawValue, ConfigError> {
        Ok(self
            .merged()?
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.into()))
    }

    /// Resolves a key as the typed kind `T`.
    ///
    /// A missing key, a source failure in strict mode, or raw data the
    /// selected parser rejects is an error; invalid data is never silently
    /// replaced.
    pub fn resolve<T: TypedValue>(&mut self, key: &str) -> Result<T, ConfigError> {
        let raw = self.get_raw(key)?;
        self.construct::<T>(key, &raw)
    }

    /// Resolves a key as `T`, substituting `default` when the key is
    /// absent.
    ///
    /// The default participates only for a truly missing key; a present but
    /// invalid value still fails.
    pub fn resolve_or<T: TypedValue>(
        &mut self,
        key: &str,
        default: impl Into<RawValue>,
    ) -> Result<T, ConfigError> {
        let raw = self.get_raw_or(key, default)?;
        self.construct::<T>(key, &raw)
    }

    /// Whether the key exists and holds data acceptable for kind `T`.
    ///
    /// Never fails: a missing key, an unhandled kind, a source failure, or
    /// invalid data all come back `false`.
    pub fn is_valid<T: TypedValue>(&mut self, key: &str) -> bool {
        if self.merged().is_err() {
            return false;
        }
        let Some(raw) = self.cache.get(key) else {
            return false;
        };
        self.parsers.validate(raw, &Kind::of::<T>())
    }

    /// Drops the merged map and every source's internal cache, forcing the
    /// next access to reload everything.
    pub fn invalidate(&mut self) {
        for source in &mut self.sources {
            source.invalidate();
        }
        self.cache.clear();
        self.failures.clear();
        self.dirty = true;
    }

    /// Source errors skipped by the most recent lenient rebuild.
    pub fn load_failures(&self) -> &[SourceError] {
        &self.failures
    }

    fn rebuild(&mut self) -> Result<(), ConfigError> {
        // Ascending stable sort: the highest priority lands last in the
        // fold and overwrites, and ties go to the later-registered source.
        let mut order: Vec<usize> = (0..self.sources.len()).collect();
        order.sort_by_key(|&i| self.sources[i].priority());

        self.failures.clear();
        let mut merged = ConfigMap::new();

        for i in order {
            match self.sources[i].load() {
                Ok(map) => merged.extend(map),
                Err(e) if self.strict => return Err(e.into()),
                Err(e) => {
                    warn!(
                        source = %e.name,
                        kind = %e.kind,
                        error = %e.detail,
                        "skipping config source that failed to load"
                    );
                    self.failures.push(e);
                }
            }
        }

        if self.interpolate {
            expand_references(&mut merged)?;
        }

        debug!(keys = merged.len(), "rebuilt merged configuration");
        self.cache = merged;
        self.dirty = false;
        Ok(())
    }

    fn construct<T: TypedValue>(&self, key: &str, raw: &RawValue) -> Result<T, ConfigError> {
        let kind = Kind::of::<T>();
        let boxed = self
            .parsers
            .dispatch(raw, &kind)
            .map_err(|e| e.with_key(key))?;
        let value = boxed.downcast::<T>().map_err(|_| {
            ValidationError::new(
                raw.clone(),
                format!(
                    "parser for kind '{}' produced an unexpected type",
                    kind.name()
                ),
            )
            .with_key(key)
        })?;
        Ok(*value)
    }
}
