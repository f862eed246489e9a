//! In-memory configuration source.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use super::{flatten, priority, ConfigMap, RawValue, Source};
use crate::error::{SourceError, SourceErrorDetail, SourceKind};

/// A named, mutable map of configuration values.
///
/// Clones share the underlying data: a mutation through any handle is seen
/// by every other, including a clone already registered with an engine.
/// Loading never fails.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    priority: i32,
    data: Arc<ArcSwap<ConfigMap>>,
}

impl MemorySource {
    /// Empty source at the defaults priority band.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_priority(name, priority::DEFAULTS)
    }

    /// Empty source at the given priority.
    pub fn with_priority(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
            data: Arc::new(ArcSwap::from_pointee(ConfigMap::new())),
        }
    }

    /// Source pre-populated from key/value pairs.
    pub fn with_entries<I, K, V>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RawValue>,
    {
        let source = Self::new(name);
        let map: ConfigMap = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        source.data.store(Arc::new(map));
        source
    }

    /// Builds a source from any serializable value whose JSON form is an
    /// object, flattened the same way a file source flattens its document.
    ///
    /// This is the usual way to turn a defaults struct into the lowest
    /// layer:
    ///
    /// ```no_run
    /// use serde::Serialize;
    /// use stratoconf::MemorySource;
    ///
    /// #[derive(Serialize)]
    /// struct Defaults {
    ///     port: u16,
    ///     host: String,
    /// }
    ///
    /// let defaults = MemorySource::from_value("defaults", &Defaults {
    ///     port: 8080,
    ///     host: "localhost".into(),
    /// })?;
    /// # Ok::<(), stratoconf::SourceError>(())
    /// ```
    pub fn from_value<T: Serialize>(name: impl Into<String>, value: &T) -> Result<Self, SourceError> {
        let name = name.into();
        let json = serde_json::to_value(value).map_err(|e| {
            SourceError::new(
                name.as_str(),
                SourceKind::Memory,
                SourceErrorDetail::Serialize(e),
            )
        })?;
        let RawValue::Object(object) = json else {
            return Err(SourceError::new(
                name.as_str(),
                SourceKind::Memory,
                SourceErrorDetail::NonObjectRoot,
            ));
        };
        let source = Self::new(name);
        source.data.store(Arc::new(flatten(object)));
        Ok(source)
    }

    /// Sets one key, overwriting any previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<RawValue>) {
        let key = key.into();
        let value = value.into();
        self.data.rcu(|map| {
            let mut next = ConfigMap::clone(map);
            next.insert(key.clone(), value.clone());
            next
        });
    }

    /// Removes one key, returning the value it held.
    pub fn remove(&self, key: &str) -> Option<RawValue> {
        let mut removed = None;
        self.data.rcu(|map| {
            let mut next = ConfigMap::clone(map);
            removed = next.remove(key);
            next
        });
        removed
    }

    /// Inserts every entry, overwriting existing keys.
    pub fn merge<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RawValue>,
    {
        let additions: ConfigMap = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.data.rcu(|map| {
            let mut next = ConfigMap::clone(map);
            next.extend(additions.clone());
            next
        });
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.data.store(Arc::new(ConfigMap::new()));
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.data.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.load().is_empty()
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Memory
    }

    fn load(&mut self) -> Result<ConfigMap, SourceError> {
        Ok(ConfigMap::clone(&self.data.load()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_remove_merge_clear() {
        let source = MemorySource::new("mem");
        source.set("a", json!(1));
        source.set("b", json!("two"));
        assert_eq!(source.len(), 2);

        assert_eq!(source.remove("a"), Some(json!(1)));
        assert_eq!(source.remove("a"), None);

        source.merge([("c", json!(true)), ("b", json!("over"))]);
        let mut probe = source.clone();
        let map = probe.load().unwrap();
        assert_eq!(map["b"], json!("over"));
        assert_eq!(map["c"], json!(true));

        source.clear();
        assert!(source.is_empty());
    }

    #[test]
    fn test_clones_share_data() {
        let source = MemorySource::new("mem");
        let handle = source.clone();

        handle.set("port", json!(9000));

        let mut original = source;
        assert_eq!(original.load().unwrap()["port"], json!(9000));
    }

    #[test]
    fn test_from_value_flattens_struct() {
        #[derive(serde::Serialize)]
        struct Db {
            host: String,
            port: u16,
        }

        #[derive(serde::Serialize)]
        struct Defaults {
            db: Db,
            debug: bool,
        }

        let mut source = MemorySource::from_value(
            "defaults",
            &Defaults {
                db: Db {
                    host: "localhost".into(),
                    port: 5432,
                },
                debug: false,
            },
        )
        .unwrap();

        let map = source.load().unwrap();
        assert_eq!(map["db.host"], json!("localhost"));
        assert_eq!(map["db.port"], json!(5432));
        assert_eq!(map["debug"], json!(false));
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        let err = MemorySource::from_value("defaults", &42).unwrap_err();
        assert!(matches!(err.detail, SourceErrorDetail::NonObjectRoot));
        assert_eq!(err.kind, SourceKind::Memory);
    }

    #[test]
    fn test_default_priority_band() {
        let source = MemorySource::new("mem");
        assert_eq!(Source::priority(&source), priority::DEFAULTS);

        let high = MemorySource::with_priority("mem", 200);
        assert_eq!(Source::priority(&high), 200);
    }
}
