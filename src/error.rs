use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::source::RawValue;

/// Flavor of a configuration source, shown in error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceKind {
    Memory,
    Environment,
    JsonFile,
    TomlFile,
    /// Label for sources defined outside this crate.
    Other(&'static str),
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match *self {
            SourceKind::Memory => "memory",
            SourceKind::Environment => "environment",
            SourceKind::JsonFile => "json file",
            SourceKind::TomlFile => "toml file",
            SourceKind::Other(label) => label,
        };
        f.write_str(label)
    }
}

/// Why a configuration source failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceErrorDetail {
    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("top-level value is not an object")]
    NonObjectRoot,

    #[error("failed to serialize value: {0}")]
    Serialize(serde_json::Error),

    #[error("key not present: {0}")]
    KeyMissing(String),
}

/// Failure originating in a single configuration source.
///
/// Carries the source's name and kind so merged-pipeline errors identify
/// which layer broke.
#[derive(Debug, Error)]
#[error("config source '{name}' ({kind}): {detail}")]
#[non_exhaustive]
pub struct SourceError {
    pub name: String,
    pub kind: SourceKind,
    #[source]
    pub detail: SourceErrorDetail,
}

impl SourceError {
    pub fn new(name: impl Into<String>, kind: SourceKind, detail: SourceErrorDetail) -> Self {
        Self {
            name: name.into(),
            kind,
            detail,
        }
    }
}

/// Raw data rejected while constructing a typed value.
///
/// Parsers produce these without a key; the engine attaches the config key
/// before surfacing the error.
#[derive(Debug, Error)]
#[error("{}", render_validation(.key, .raw, .detail))]
#[non_exhaustive]
pub struct ValidationError {
    pub key: Option<String>,
    pub raw: RawValue,
    pub detail: String,
}

impl ValidationError {
    pub fn new(raw: impl Into<RawValue>, detail: impl Into<String>) -> Self {
        Self {
            key: None,
            raw: raw.into(),
            detail: detail.into(),
        }
    }

    /// Attaches the configuration key the raw data came from.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

fn render_validation(key: &Option<String>, raw: &RawValue, detail: &str) -> String {
    match key {
        Some(key) => format!("invalid value {raw} for key '{key}': {detail}"),
        None => format!("invalid value {raw}: {detail}"),
    }
}

/// Top-level error type for configuration resolution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config key not found: {0}")]
    KeyNotFound(String),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("circular reference detected in configuration")]
    CircularReference,

    #[error("reference expansion exceeded the size limit")]
    ExpansionOverflow,

    #[error("referenced key not found: {0}")]
    ReferenceNotFound(String),

    #[error("cannot reference non-scalar value: {0}")]
    NonScalarReference(String),

    #[error("unclosed reference (missing '}}')")]
    UnclosedReference,
}
