mod config;
mod error;
mod interp;
mod parser;
pub mod source;
mod typed;
pub mod values;

pub use config::Config;
pub use error::{ConfigError, SourceError, SourceErrorDetail, SourceKind, ValidationError};
pub use parser::{DefaultParser, Parser, ParserRegistry};
pub use source::{
    ConfigMap, EnvProvider, EnvSource, FileFormat, FileSource, MemorySource, MockEnv, RawValue,
    Source, StdEnv,
};
pub use typed::{InvalidValue, Kind, TypedValue};
pub use values::{Flag, HostPort, Port};
