//! Typed construction of configuration values.

use std::any::{Any, TypeId};
use std::fmt;

use thiserror::Error;

use crate::source::RawValue;

/// Failure produced by a [`TypedValue`] constructor or validator.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct InvalidValue {
    reason: String,
}

impl InvalidValue {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Shorthand for a type-shape mismatch.
    pub fn expected(what: &str, raw: &RawValue) -> Self {
        Self::new(format!("expected {what}, got {}", raw_shape(raw)))
    }
}

fn raw_shape(raw: &RawValue) -> &'static str {
    match raw {
        RawValue::Null => "null",
        RawValue::Bool(_) => "a boolean",
        RawValue::Number(_) => "a number",
        RawValue::String(_) => "a string",
        RawValue::Array(_) => "an array",
        RawValue::Object(_) => "an object",
    }
}

/// A value that can be built from raw configuration data.
///
/// Implementing this trait is what makes a type resolvable through
/// [`Config::resolve`](crate::Config::resolve). [`construct`](Self::construct)
/// does the real work; [`validate`](Self::validate) defaults to constructing
/// and discarding, and can be overridden when a cheaper check exists.
pub trait TypedValue: Sized + Send + Sync + 'static {
    /// Kind name used in error messages.
    fn kind_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Builds the value from raw data.
    fn construct(raw: &RawValue) -> Result<Self, InvalidValue>;

    /// Checks the raw data without keeping the constructed value.
    fn validate(raw: &RawValue) -> Result<(), InvalidValue> {
        Self::construct(raw).map(drop)
    }
}

/// Runtime token identifying a [`TypedValue`] implementation.
///
/// Carries the type identity plus constructor and validator entry points, so
/// parsers can work with kinds without being generic themselves.
#[derive(Clone, Copy)]
pub struct Kind {
    name: &'static str,
    id: TypeId,
    construct: fn(&RawValue) -> Result<Box<dyn Any + Send + Sync>, InvalidValue>,
    validate: fn(&RawValue) -> Result<(), InvalidValue>,
}

impl Kind {
    /// Returns the token for `T`.
    pub fn of<T: TypedValue>() -> Self {
        Self {
            name: T::kind_name(),
            id: TypeId::of::<T>(),
            construct: |raw| {
                T::construct(raw).map(|value| Box::new(value) as Box<dyn Any + Send + Sync>)
            },
            validate: T::validate,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this token identifies `T`.
    pub fn is<T: TypedValue>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Invokes the kind's constructor on raw data.
    pub fn construct(&self, raw: &RawValue) -> Result<Box<dyn Any + Send + Sync>, InvalidValue> {
        (self.construct)(raw)
    }

    /// Invokes the kind's validator on raw data.
    pub fn validate(&self, raw: &RawValue) -> Result<(), InvalidValue> {
        (self.validate)(raw)
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kind").field("name", &self.name).finish()
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Kind {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_identifies_type() {
        let kind = Kind::of::<i64>();
        assert!(kind.is::<i64>());
        assert!(!kind.is::<bool>());
        assert_eq!(kind.name(), "integer");
    }

    #[test]
    fn test_kind_equality_by_type() {
        assert_eq!(Kind::of::<String>(), Kind::of::<String>());
        assert_ne!(Kind::of::<String>(), Kind::of::<bool>());
    }

    #[test]
    fn test_kind_construct_produces_downcastable_value() {
        let kind = Kind::of::<i64>();
        let boxed = kind.construct(&RawValue::from(42)).unwrap();
        assert_eq!(*boxed.downcast::<i64>().unwrap(), 42);
    }

    #[test]
    fn test_kind_validate_rejects_wrong_shape() {
        let kind = Kind::of::<i64>();
        assert!(kind.validate(&RawValue::Bool(true)).is_err());
        assert!(kind.validate(&RawValue::from(7)).is_ok());
    }
}
