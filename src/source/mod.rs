//! Configuration sources and the flat key space they feed.

mod env;
mod file;
mod memory;

pub use env::{EnvProvider, EnvSource, MockEnv, StdEnv};
pub use file::{FileFormat, FileSource};
pub use memory::MemorySource;

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{SourceError, SourceErrorDetail, SourceKind};

/// Untyped configuration data as loaded from a source.
pub type RawValue = serde_json::Value;

/// Flat mapping from dotted keys to raw values.
pub type ConfigMap = BTreeMap<String, RawValue>;

/// Conventional priority bands for the bundled sources.
pub mod priority {
    /// Baked-in defaults, overridden by everything else.
    pub const DEFAULTS: i32 = 10;
    /// Configuration files.
    pub const FILE: i32 = 50;
    /// Process environment, overriding files and defaults.
    pub const ENVIRONMENT: i32 = 100;
}

/// A single place configuration can come from.
///
/// Sources produce a flat [`ConfigMap`]; hierarchical formats are flattened
/// into dotted keys at load time. Implementations cache their loaded state
/// where re-reading is costly; [`invalidate`](Source::invalidate) drops that
/// state so the next load re-reads the backing data.
pub trait Source: fmt::Debug + Send + Sync {
    /// Identifies the source in error messages and logs.
    fn name(&self) -> &str;

    /// Merge priority; higher wins on key collisions.
    fn priority(&self) -> i32;

    /// Flavor tag attached to this source's errors.
    fn kind(&self) -> SourceKind {
        SourceKind::Other("custom")
    }

    /// Loads the source's full key set.
    fn load(&mut self) -> Result<ConfigMap, SourceError>;

    /// Drops any cached state.
    fn invalidate(&mut self) {}

    /// Whether the source currently defines the key.
    ///
    /// A load failure counts as "not present" here; use
    /// [`get`](Source::get) to tell the cases apart.
    fn has(&mut self, key: &str) -> bool {
        self.load().map(|map| map.contains_key(key)).unwrap_or(false)
    }

    /// Fetches one key, failing when the source cannot load or the key is
    /// absent.
    fn get(&mut self, key: &str) -> Result<RawValue, SourceError> {
        let kind = self.kind();
        let map = self.load()?;
        match map.get(key) {
            Some(value) => Ok(value.clone()),
            None => Err(SourceError::new(
                self.name(),
                kind,
                SourceErrorDetail::KeyMissing(key.to_string()),
            )),
        }
    }
}

/// Flattens a JSON object into dotted keys.
///
/// Nested objects contribute their leaves under `parent.child` keys; arrays
/// and every other value are taken verbatim. Empty objects contribute no
/// keys.
pub fn flatten(object: serde_json::Map<String, RawValue>) -> ConfigMap {
    let mut flat = ConfigMap::new();
    flatten_into(&mut flat, String::new(), object);
    flat
}

fn flatten_into(flat: &mut ConfigMap, prefix: String, object: serde_json::Map<String, RawValue>) {
    for (key, value) in object {
        let full = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            RawValue::Object(nested) => flatten_into(flat, full, nested),
            leaf => {
                flat.insert(full, leaf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_object(value: RawValue) -> serde_json::Map<String, RawValue> {
        match value {
            RawValue::Object(object) => object,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_flatten_nested_objects() {
        let flat = flatten(as_object(json!({
            "db": { "host": "localhost", "port": 5432 },
            "name": "app"
        })));

        assert_eq!(flat["db.host"], json!("localhost"));
        assert_eq!(flat["db.port"], json!(5432));
        assert_eq!(flat["name"], json!("app"));
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn test_flatten_keeps_arrays_verbatim() {
        let flat = flatten(as_object(json!({
            "servers": ["a", "b"],
            "matrix": [[1, 2], [3, 4]]
        })));

        assert_eq!(flat["servers"], json!(["a", "b"]));
        assert_eq!(flat["matrix"], json!([[1, 2], [3, 4]]));
    }

    #[test]
    fn test_flatten_deep_nesting() {
        let flat = flatten(as_object(json!({
            "a": { "b": { "c": { "d": true } } }
        })));

        assert_eq!(flat["a.b.c.d"], json!(true));
        assert_eq!(flat.len(), 1);
    }

    #[test]
    fn test_flatten_empty_object_contributes_nothing() {
        let flat = flatten(as_object(json!({
            "empty": {},
            "kept": 1
        })));

        assert!(!flat.contains_key("empty"));
        assert_eq!(flat.len(), 1);
    }

    #[test]
    fn test_source_get_distinguishes_missing_key() {
        let mut source = MemorySource::with_entries("mem", [("present", json!(1))]);

        assert_eq!(Source::get(&mut source, "present").unwrap(), json!(1));
        assert!(source.has("present"));
        assert!(!source.has("absent"));

        let err = Source::get(&mut source, "absent").unwrap_err();
        assert!(matches!(err.detail, SourceErrorDetail::KeyMissing(_)));
        assert_eq!(err.kind, SourceKind::Memory);
    }
}
