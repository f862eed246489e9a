//! File-backed configuration source.

use std::path::{Path, PathBuf};

use super::{flatten, priority, ConfigMap, RawValue, Source};
use crate::error::{SourceError, SourceErrorDetail, SourceKind};

/// On-disk format of a [`FileSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

/// Loads configuration from a JSON or TOML file.
///
/// The document's root must be an object; nested objects flatten into
/// dotted keys and arrays are kept verbatim. A missing file is an error
/// only when the source is required; an optional missing file yields an
/// empty map. An unreadable or malformed file is an error regardless.
///
/// The parsed result is cached until [`invalidate`](Source::invalidate).
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    format: FileFormat,
    required: bool,
    name: String,
    priority: i32,
    cache: Option<ConfigMap>,
}

impl FileSource {
    /// JSON file source. Missing required files fail at load time.
    pub fn json(path: impl AsRef<Path>, required: bool) -> Self {
        Self::with_format(path, FileFormat::Json, required)
    }

    /// TOML file source.
    pub fn toml(path: impl AsRef<Path>, required: bool) -> Self {
        Self::with_format(path, FileFormat::Toml, required)
    }

    pub fn with_format(path: impl AsRef<Path>, format: FileFormat, required: bool) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: path.display().to_string(),
            path,
            format,
            required,
            priority: priority::FILE,
            cache: None,
        }
    }

    /// Overrides the priority band.
    pub fn at_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Renames the source. The default name is the file path.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn fail(&self, detail: SourceErrorDetail) -> SourceError {
        SourceError::new(self.name.as_str(), self.kind(), detail)
    }

    /// Reads, parses, and flattens the file, honoring the required flag.
    fn read(&self) -> Result<ConfigMap, SourceError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return if self.required {
                    Err(self.fail(SourceErrorDetail::FileNotFound(self.path.clone())))
                } else {
                    Ok(ConfigMap::new())
                };
            }
            Err(e) => {
                return Err(self.fail(SourceErrorDetail::Read {
                    path: self.path.clone(),
                    source: e,
                }))
            }
        };

        let value = match self.format {
            FileFormat::Json => serde_json::from_str(&contents).map_err(|e| {
                self.fail(SourceErrorDetail::ParseJson {
                    path: self.path.clone(),
                    source: e,
                })
            })?,
            FileFormat::Toml => {
                let table: toml::Table = toml::from_str(&contents).map_err(|e| {
                    self.fail(SourceErrorDetail::ParseToml {
                        path: self.path.clone(),
                        source: e,
                    })
                })?;
                toml_to_json(toml::Value::Table(table))
            }
        };

        let RawValue::Object(object) = value else {
            return Err(self.fail(SourceErrorDetail::NonObjectRoot));
        };
        Ok(flatten(object))
    }
}

impl Source for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn kind(&self) -> SourceKind {
        match self.format {
            FileFormat::Json => SourceKind::JsonFile,
            FileFormat::Toml => SourceKind::TomlFile,
        }
    }

    fn load(&mut self) -> Result<ConfigMap, SourceError> {
        if let Some(cache) = &self.cache {
            return Ok(cache.clone());
        }
        let map = self.read()?;
        self.cache = Some(map.clone());
        Ok(map)
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }
}

/// Converts a TOML value into the JSON data model. Datetimes become their
/// string form; non-finite floats have no JSON number and become null.
fn toml_to_json(value: toml::Value) -> RawValue {
    match value {
        toml::Value::String(s) => RawValue::String(s),
        toml::Value::Integer(i) => RawValue::from(i),
        toml::Value::Float(f) => RawValue::from(f),
        toml::Value::Boolean(b) => RawValue::Bool(b),
        toml::Value::Datetime(dt) => RawValue::String(dt.to_string()),
        toml::Value::Array(items) => {
            RawValue::Array(items.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => RawValue::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}
