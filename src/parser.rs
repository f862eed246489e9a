//! Parser strategies for turning raw values into typed values.

use std::any::Any;
use std::cmp::Reverse;
use std::fmt;

use crate::error::ValidationError;
use crate::source::RawValue;
use crate::typed::Kind;

/// A strategy for constructing typed values from raw configuration data.
///
/// Registered parsers are consulted in descending [`priority`](Parser::priority)
/// order; the first one whose [`can_handle`](Parser::can_handle) accepts the
/// requested kind is used and its result is final, success or failure.
pub trait Parser: fmt::Debug + Send + Sync {
    /// Selection priority; higher is consulted first. Parsers registered at
    /// equal priority keep their registration order.
    fn priority(&self) -> i32 {
        0
    }

    /// Whether this parser knows how to produce the given kind.
    fn can_handle(&self, kind: &Kind) -> bool;

    /// Produces a value of the given kind from raw data.
    fn parse(
        &self,
        raw: &RawValue,
        kind: &Kind,
    ) -> Result<Box<dyn Any + Send + Sync>, ValidationError>;

    /// Checks the raw data without keeping the result.
    fn check(&self, raw: &RawValue, kind: &Kind) -> bool {
        self.parse(raw, kind).is_ok()
    }
}

/// Fallback parser that defers to the kind's own constructor.
///
/// Sits at the lowest possible priority so that any registered parser
/// shadows it for the kinds it handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultParser;

impl Parser for DefaultParser {
    fn priority(&self) -> i32 {
        i32::MIN
    }

    fn can_handle(&self, _kind: &Kind) -> bool {
        true
    }

    fn parse(
        &self,
        raw: &RawValue,
        kind: &Kind,
    ) -> Result<Box<dyn Any + Send + Sync>, ValidationError> {
        kind.construct(raw)
            .map_err(|e| ValidationError::new(raw.clone(), e.to_string()))
    }

    fn check(&self, raw: &RawValue, kind: &Kind) -> bool {
        kind.validate(raw).is_ok()
    }
}

/// Ordered collection of parser strategies.
#[derive(Debug)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn Parser>>,
}

impl Default for ParserRegistry {
    /// Registry holding only the [`DefaultParser`].
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DefaultParser);
        registry
    }
}

impl ParserRegistry {
    /// Registry with no parsers at all, not even the fallback.
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Registers a parser, keeping the list in descending priority order.
    ///
    /// The sort is stable, so parsers at equal priority are consulted in
    /// registration order.
    pub fn register<P: Parser + 'static>(&mut self, parser: P) {
        self.parsers.push(Box::new(parser));
        self.parsers.sort_by_key(|p| Reverse(p.priority()));
    }

    /// Parses raw data as the given kind via the first capable parser.
    pub fn dispatch(
        &self,
        raw: &RawValue,
        kind: &Kind,
    ) -> Result<Box<dyn Any + Send + Sync>, ValidationError> {
        match self.capable(kind) {
            Some(parser) => parser.parse(raw, kind),
            None => Err(ValidationError::new(
                raw.clone(),
                format!("no parser can handle kind '{}'", kind.name()),
            )),
        }
    }

    /// Whether the raw data is acceptable for the kind, per the first
    /// capable parser. `false` when no parser handles the kind.
    pub fn validate(&self, raw: &RawValue, kind: &Kind) -> bool {
        self.capable(kind).is_some_and(|p| p.check(raw, kind))
    }

    fn capable(&self, kind: &Kind) -> Option<&dyn Parser> {
        self.parsers
            .iter()
            .map(|p| p.as_ref())
            .find(|p| p.can_handle(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Parses integers written as hex strings, handling only the i64 kind.
    #[derive(Debug)]
    struct HexParser;

    impl Parser for HexParser {
        fn can_handle(&self, kind: &Kind) -> bool {
            kind.is::<i64>()
        }

        fn parse(
            &self,
            raw: &RawValue,
            _kind: &Kind,
        ) -> Result<Box<dyn Any + Send + Sync>, ValidationError> {
            let RawValue::String(s) = raw else {
                return Err(ValidationError::new(raw.clone(), "expected a hex string"));
            };
            let digits = s.strip_prefix("0x").unwrap_or(s);
            i64::from_str_radix(digits, 16)
                .map(|n| Box::new(n) as Box<dyn Any + Send + Sync>)
                .map_err(|e| ValidationError::new(raw.clone(), e.to_string()))
        }
    }

    #[derive(Debug)]
    struct NamedProbe {
        label: &'static str,
        priority: i32,
    }

    impl Parser for NamedProbe {
        fn priority(&self) -> i32 {
            self.priority
        }

        fn can_handle(&self, kind: &Kind) -> bool {
            kind.is::<String>()
        }

        fn parse(
            &self,
            _raw: &RawValue,
            _kind: &Kind,
        ) -> Result<Box<dyn Any + Send + Sync>, ValidationError> {
            Ok(Box::new(self.label.to_string()))
        }
    }

    #[test]
    fn test_default_registry_constructs_primitives() {
        let registry = ParserRegistry::default();
        let boxed = registry.dispatch(&json!(42), &Kind::of::<i64>()).unwrap();
        assert_eq!(*boxed.downcast::<i64>().unwrap(), 42);
    }

    #[test]
    fn test_registered_parser_shadows_default() {
        let mut registry = ParserRegistry::default();
        registry.register(HexParser);

        let boxed = registry
            .dispatch(&json!("0xff"), &Kind::of::<i64>())
            .unwrap();
        assert_eq!(*boxed.downcast::<i64>().unwrap(), 255);

        // Other kinds still fall through to the default parser.
        let boxed = registry
            .dispatch(&json!("plain"), &Kind::of::<String>())
            .unwrap();
        assert_eq!(*boxed.downcast::<String>().unwrap(), "plain");
    }

    #[test]
    fn test_first_parser_wins_and_its_failure_is_final() {
        let mut registry = ParserRegistry::default();
        registry.register(HexParser);

        // The hex parser claims the i64 kind, so its rejection stands even
        // though the default parser would have accepted plain "42".
        let result = registry.dispatch(&json!(42), &Kind::of::<i64>());
        assert!(result.is_err());
    }

    #[test]
    fn test_higher_priority_consulted_first() {
        let mut registry = ParserRegistry::empty();
        registry.register(NamedProbe {
            label: "low",
            priority: 1,
        });
        registry.register(NamedProbe {
            label: "high",
            priority: 5,
        });

        let boxed = registry
            .dispatch(&json!("x"), &Kind::of::<String>())
            .unwrap();
        assert_eq!(*boxed.downcast::<String>().unwrap(), "high");
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let mut registry = ParserRegistry::empty();
        registry.register(NamedProbe {
            label: "first",
            priority: 3,
        });
        registry.register(NamedProbe {
            label: "second",
            priority: 3,
        });

        let boxed = registry
            .dispatch(&json!("x"), &Kind::of::<String>())
            .unwrap();
        assert_eq!(*boxed.downcast::<String>().unwrap(), "first");
    }

    #[test]
    fn test_unhandled_kind_is_rejected() {
        let registry = ParserRegistry::empty();
        let result = registry.dispatch(&json!(1), &Kind::of::<i64>());
        assert!(result.is_err());
        assert!(!registry.validate(&json!(1), &Kind::of::<i64>()));
    }

    #[test]
    fn test_validate_uses_first_capable_parser() {
        let mut registry = ParserRegistry::default();
        assert!(registry.validate(&json!(42), &Kind::of::<i64>()));

        registry.register(HexParser);
        assert!(registry.validate(&json!("0x10"), &Kind::of::<i64>()));
        assert!(!registry.validate(&json!(42), &Kind::of::<i64>()));
    }
}
