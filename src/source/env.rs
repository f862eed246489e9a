//! Environment-variable configuration source.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{priority, ConfigMap, RawValue, Source};
use crate::error::{SourceError, SourceKind};

/// Supplies variable pairs to an [`EnvSource`].
///
/// [`StdEnv`] reads the live process environment; [`MockEnv`] serves a
/// controlled set so tests never touch process-global state.
pub trait EnvProvider: fmt::Debug + Send + Sync {
    /// Returns all available variables as key/value pairs.
    fn vars(&self) -> Vec<(String, String)>;
}

/// Reads the process environment. Variables with non-UTF-8 names or values
/// are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdEnv;

impl EnvProvider for StdEnv {
    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }
}

/// Fixed variable set for tests. Clones share the data, so a retained
/// handle can mutate the "environment" after the source was registered.
#[derive(Debug, Clone, Default)]
pub struct MockEnv {
    vars: Arc<ArcSwap<BTreeMap<String, String>>>,
}

impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mock from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            vars: Arc::new(ArcSwap::from_pointee(vars)),
        }
    }

    /// Sets one variable.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        self.vars.rcu(|vars| {
            let mut next = BTreeMap::clone(vars);
            next.insert(key.clone(), value.clone());
            next
        });
    }

    /// Removes one variable.
    pub fn unset(&self, key: &str) {
        self.vars.rcu(|vars| {
            let mut next = BTreeMap::clone(vars);
            next.remove(key);
            next
        });
    }
}

impl EnvProvider for MockEnv {
    fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .load()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Loads configuration from environment variables.
///
/// An optional prefix filters the variables and is stripped from their
/// names; what remains is lowercased to form the logical key, so `APP_PORT`
/// with prefix `APP_` becomes `port`. An optional separator maps to `.` for
/// nested keys: `APP_DB__HOST` with separator `__` becomes `db.host`.
/// Values stay strings; typed kinds parse them at resolution time.
///
/// The variable set is captured on first load and reused until
/// [`invalidate`](Source::invalidate), so later environment changes are
/// invisible until then.
#[derive(Debug)]
pub struct EnvSource {
    name: String,
    priority: i32,
    prefix: Option<String>,
    separator: Option<String>,
    provider: Box<dyn EnvProvider>,
    cache: Option<ConfigMap>,
}

impl EnvSource {
    /// Reads every variable from the process environment.
    pub fn new() -> Self {
        Self::with_provider(StdEnv)
    }

    /// Reads variables whose names start with `prefix`, stripping it.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let mut source = Self::new();
        source.prefix = Some(prefix.into());
        source
    }

    /// Reads variables from a custom provider instead of the process
    /// environment.
    pub fn with_provider<P: EnvProvider + 'static>(provider: P) -> Self {
        Self {
            name: "environment".to_string(),
            priority: priority::ENVIRONMENT,
            prefix: None,
            separator: None,
            provider: Box::new(provider),
            cache: None,
        }
    }

    /// Filters on and strips the given prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Maps the separator to `.` in logical keys.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        self.separator = Some(separator);
        self
    }

    /// Overrides the priority band.
    pub fn at_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Renames the source.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn snapshot(&self) -> ConfigMap {
        let mut map = ConfigMap::new();
        for (var, value) in self.provider.vars() {
            if let Some(key) = self.logical_key(&var) {
                map.insert(key, RawValue::String(value));
            }
        }
        map
    }

    /// Maps a variable name to its logical key, or `None` when the prefix
    /// does not match or nothing remains after stripping it.
    fn logical_key(&self, var: &str) -> Option<String> {
        let stripped = match &self.prefix {
            Some(prefix) => var.strip_prefix(prefix.as_str())?,
            None => var,
        };
        if stripped.is_empty() {
            return None;
        }
        let mut key = stripped.to_lowercase();
        if let Some(separator) = &self.separator {
            key = key.replace(separator.as_str(), ".");
        }
        Some(key)
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for EnvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Environment
    }

    fn load(&mut self) -> Result<ConfigMap, SourceError> {
        if let Some(cache) = &self.cache {
            return Ok(cache.clone());
        }
        let map = self.snapshot();
        self.cache = Some(map.clone());
        Ok(map)
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }
}
