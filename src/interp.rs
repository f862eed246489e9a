//! Reference expansion for configuration values.
//!
//! Merged string values may embed `${key}` references to other entries in
//! the flat key space. Use `$$` to escape and produce a literal `$`.

use crate::error::ConfigError;
use crate::source::{ConfigMap, RawValue};

const MAX_ITERATIONS: usize = 100;
const MAX_EXPANDED_LEN: usize = 1 << 20;

/// Expands all `${key}` references in the map's string values.
///
/// Runs repeated passes until a pass makes no substitution, so references
/// to values that themselves contain references settle too. Exceeding the
/// pass bound means the references are circular. No single value may
/// expand past `MAX_EXPANDED_LEN`, which stops self-amplifying references
/// that double in size on every pass.
pub(crate) fn expand_references(map: &mut ConfigMap) -> Result<(), ConfigError> {
    for _ in 0..MAX_ITERATIONS {
        let snapshot = map.clone();
        let substitutions = expand_pass(map, &snapshot)?;
        if substitutions == 0 {
            return Ok(());
        }
    }

    Err(ConfigError::CircularReference)
}

/// Performs a single pass over all string values.
/// Returns the number of substitutions made.
fn expand_pass(map: &mut ConfigMap, root: &ConfigMap) -> Result<usize, ConfigError> {
    let mut count = 0;

    for value in map.values_mut() {
        if let RawValue::String(s) = value {
            count += expand_string(s, root)?;
        }
    }

    Ok(count)
}

/// Expands all `${...}` references in a string.
/// Handles `$$` escape sequences.
fn expand_string(s: &mut String, root: &ConfigMap) -> Result<usize, ConfigError> {
    let mut result = String::with_capacity(s.len());
    let mut substitutions = 0;
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            match chars.peek() {
                Some('$') => {
                    // Escape sequence: $$ -> $
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    // Reference: ${key}
                    chars.next();
                    let key =
                        consume_until(&mut chars, '}').ok_or(ConfigError::UnclosedReference)?;

                    result.push_str(&lookup(root, &key)?);
                    if result.len() > MAX_EXPANDED_LEN {
                        return Err(ConfigError::ExpansionOverflow);
                    }
                    substitutions += 1;
                }
                _ => {
                    // Just a lone $
                    result.push('$');
                }
            }
        } else {
            result.push(ch);
        }
    }

    *s = result;
    Ok(substitutions)
}

/// Consumes characters until the delimiter, returning the collected string.
fn consume_until(chars: &mut std::iter::Peekable<std::str::Chars>, delim: char) -> Option<String> {
    let mut collected = String::new();
    for ch in chars.by_ref() {
        if ch == delim {
            return Some(collected);
        }
        collected.push(ch);
    }
    None
}

/// Looks up a key in the flat map and renders the value as a string.
fn lookup(root: &ConfigMap, key: &str) -> Result<String, ConfigError> {
    let value = root
        .get(key)
        .ok_or_else(|| ConfigError::ReferenceNotFound(key.to_string()))?;

    match value {
        RawValue::String(s) => Ok(s.clone()),
        RawValue::Number(n) => Ok(n.to_string()),
        RawValue::Bool(b) => Ok(b.to_string()),
        RawValue::Null | RawValue::Array(_) | RawValue::Object(_) => {
            Err(ConfigError::NonScalarReference(key.to_string()))
        }
    }
}
