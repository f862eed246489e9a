//! Ready-made typed values for common configuration fields.
//!
//! Primitive kinds accept both their native JSON shape and the string form
//! environment variables produce, so the same key resolves identically
//! whether it came from a file or from the environment.

use std::fmt;

use url::Url;

use crate::source::RawValue;
use crate::typed::{InvalidValue, TypedValue};

impl TypedValue for String {
    fn kind_name() -> &'static str {
        "string"
    }

    fn construct(raw: &RawValue) -> Result<Self, InvalidValue> {
        match raw {
            RawValue::String(s) => Ok(s.clone()),
            other => Err(InvalidValue::expected("a string", other)),
        }
    }
}

impl TypedValue for i64 {
    fn kind_name() -> &'static str {
        "integer"
    }

    fn construct(raw: &RawValue) -> Result<Self, InvalidValue> {
        match raw {
            RawValue::Number(n) => n
                .as_i64()
                .ok_or_else(|| InvalidValue::new(format!("not an integer: {n}"))),
            RawValue::String(s) => s
                .trim()
                .parse()
                .map_err(|_| InvalidValue::expected("an integer", raw)),
            other => Err(InvalidValue::expected("an integer", other)),
        }
    }
}

impl TypedValue for f64 {
    fn kind_name() -> &'static str {
        "float"
    }

    fn construct(raw: &RawValue) -> Result<Self, InvalidValue> {
        match raw {
            RawValue::Number(n) => n
                .as_f64()
                .ok_or_else(|| InvalidValue::new(format!("not representable as a float: {n}"))),
            RawValue::String(s) => s
                .trim()
                .parse()
                .map_err(|_| InvalidValue::expected("a number", raw)),
            other => Err(InvalidValue::expected("a number", other)),
        }
    }
}

impl TypedValue for bool {
    fn kind_name() -> &'static str {
        "boolean"
    }

    fn construct(raw: &RawValue) -> Result<Self, InvalidValue> {
        match raw {
            RawValue::Bool(b) => Ok(*b),
            RawValue::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            RawValue::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(InvalidValue::expected("a boolean", other)),
        }
    }
}

/// TCP/UDP port number in the range 1-65535.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Port(pub u16);

impl Port {
    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TypedValue for Port {
    fn kind_name() -> &'static str {
        "port"
    }

    fn construct(raw: &RawValue) -> Result<Self, InvalidValue> {
        let n = i64::construct(raw)?;
        match u16::try_from(n) {
            Ok(port) if port != 0 => Ok(Port(port)),
            _ => Err(InvalidValue::new(format!("port out of range 1-65535: {n}"))),
        }
    }
}

/// Boolean switch accepting the usual spellings: true/false, yes/no, on/off,
/// 1/0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag(pub bool);

impl Flag {
    pub fn get(self) -> bool {
        self.0
    }
}

impl TypedValue for Flag {
    fn kind_name() -> &'static str {
        "flag"
    }

    fn construct(raw: &RawValue) -> Result<Self, InvalidValue> {
        match raw {
            RawValue::Bool(b) => Ok(Flag(*b)),
            RawValue::Number(n) if n.as_u64() == Some(1) => Ok(Flag(true)),
            RawValue::Number(n) if n.as_u64() == Some(0) => Ok(Flag(false)),
            RawValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Flag(true)),
                "false" | "no" | "off" | "0" => Ok(Flag(false)),
                _ => Err(InvalidValue::expected("a boolean flag", raw)),
            },
            other => Err(InvalidValue::expected("a boolean flag", other)),
        }
    }
}

/// `host:port` pair such as `"db.internal:5432"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl TypedValue for HostPort {
    fn kind_name() -> &'static str {
        "host:port"
    }

    fn construct(raw: &RawValue) -> Result<Self, InvalidValue> {
        let RawValue::String(s) = raw else {
            return Err(InvalidValue::expected("a 'host:port' string", raw));
        };
        let (host, port) =
            split_host_port(s).ok_or_else(|| InvalidValue::expected("a 'host:port' string", raw))?;
        Ok(HostPort {
            host: host.to_string(),
            port,
        })
    }

    // Checks the shape without building the owned host string.
    fn validate(raw: &RawValue) -> Result<(), InvalidValue> {
        match raw {
            RawValue::String(s) if split_host_port(s).is_some() => Ok(()),
            other => Err(InvalidValue::expected("a 'host:port' string", other)),
        }
    }
}

fn split_host_port(s: &str) -> Option<(&str, u16)> {
    let (host, port) = s.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port: u16 = port.parse().ok()?;
    (port != 0).then_some((host, port))
}

impl TypedValue for Url {
    fn kind_name() -> &'static str {
        "url"
    }

    fn construct(raw: &RawValue) -> Result<Self, InvalidValue> {
        let RawValue::String(s) = raw else {
            return Err(InvalidValue::expected("a URL string", raw));
        };
        Url::parse(s).map_err(|e| InvalidValue::new(format!("invalid url '{s}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_from_number_and_string() {
        assert_eq!(i64::construct(&json!(42)).unwrap(), 42);
        assert_eq!(i64::construct(&json!("42")).unwrap(), 42);
        assert_eq!(i64::construct(&json!(" -7 ")).unwrap(), -7);
        assert!(i64::construct(&json!("forty-two")).is_err());
        assert!(i64::construct(&json!(1.5)).is_err());
    }

    #[test]
    fn test_bool_accepts_string_form() {
        assert!(bool::construct(&json!(true)).unwrap());
        assert!(bool::construct(&json!("TRUE")).unwrap());
        assert!(!bool::construct(&json!("false")).unwrap());
        assert!(bool::construct(&json!("yes")).is_err());
    }

    #[test]
    fn test_port_range() {
        assert_eq!(Port::construct(&json!(8080)).unwrap(), Port(8080));
        assert_eq!(Port::construct(&json!("9000")).unwrap(), Port(9000));
        assert!(Port::construct(&json!(0)).is_err());
        assert!(Port::construct(&json!(70000)).is_err());
        assert!(Port::construct(&json!(-1)).is_err());
    }

    #[test]
    fn test_flag_spellings() {
        for truthy in ["true", "yes", "on", "1", "YES", "On"] {
            assert_eq!(Flag::construct(&json!(truthy)).unwrap(), Flag(true));
        }
        for falsy in ["false", "no", "off", "0"] {
            assert_eq!(Flag::construct(&json!(falsy)).unwrap(), Flag(false));
        }
        assert_eq!(Flag::construct(&json!(1)).unwrap(), Flag(true));
        assert_eq!(Flag::construct(&json!(false)).unwrap(), Flag(false));
        assert!(Flag::construct(&json!("maybe")).is_err());
    }

    #[test]
    fn test_host_port_parsing() {
        let hp = HostPort::construct(&json!("db.internal:5432")).unwrap();
        assert_eq!(hp.host, "db.internal");
        assert_eq!(hp.port, 5432);

        assert!(HostPort::validate(&json!("db.internal:5432")).is_ok());
        assert!(HostPort::validate(&json!("no-port")).is_err());
        assert!(HostPort::validate(&json!(":5432")).is_err());
        assert!(HostPort::validate(&json!("host:0")).is_err());
    }

    #[test]
    fn test_url_value() {
        let url = Url::construct(&json!("https://example.com/api")).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(Url::construct(&json!("not a url")).is_err());
        assert!(Url::construct(&json!(7)).is_err());
    }

    #[test]
    fn test_string_rejects_non_strings() {
        assert_eq!(String::construct(&json!("plain")).unwrap(), "plain");
        assert!(String::construct(&json!(5)).is_err());
    }

    #[test]
    fn test_float_from_number_and_string() {
        assert_eq!(f64::construct(&json!(1.25)).unwrap(), 1.25);
        assert_eq!(f64::construct(&json!("2.5")).unwrap(), 2.5);
        assert_eq!(f64::construct(&json!(3)).unwrap(), 3.0);
        assert!(f64::construct(&json!([])).is_err());
    }
}
