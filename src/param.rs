//! Captured path parameters and their coercion.
//!
//! A capture token is `{type:name}` or `{name}`. The type decides how the raw
//! path text is turned into a [`Value`]:
//!
//! | Type | Result |
//! |---|---|
//! | `int` | leading integer, `0` when there is none, clamped to the `i64` range |
//! | `float`, `number`, `numeric` | leading decimal number, `0.0` when there is none |
//! | `bool`, `boolean` | `false` for `0 false "" null nil undefined no none`, else `true` |
//! | anything else | the raw string |
//!
//! Coercion never fails. A numeric capture that does not hold a number decodes
//! to zero, so routes relying on numeric captures must validate the value
//! themselves.

use std::fmt;
use std::ops::Index;

use tracing::debug;

use crate::error::Error;

/// Name under which a wildcard tail is captured.
pub const WILDCARD: &str = "*";

const FALSY: [&str; 8] = ["0", "false", "", "null", "nil", "undefined", "no", "none"];

/// Declared type of a capture.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParamType {
    Str,
    Int,
    Float,
    Bool,
}

impl ParamType {
    /// Maps a declared type name. Unrecognized names fall back to [`ParamType::Str`].
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "int" => Self::Int,
            "float" | "number" | "numeric" => Self::Float,
            "bool" | "boolean" => Self::Bool,
            _ => Self::Str,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Str   => "string",
            Self::Int   => "int",
            Self::Float => "float",
            Self::Bool  => "bool",
        }
    }
}

/// A decoded capture value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s)   => f.write_str(s),
            Self::Int(n)   => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b)  => write!(f, "{b}"),
        }
    }
}

/// One capture extracted while matching a path.
#[derive(Clone, Debug, PartialEq)]
pub struct Captured {
    pub name: String,
    pub kind: ParamType,
    pub value: Value,
}

/// A capture declaration inside a pattern: `{type:name}` without the braces.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamType,
}

impl Param {
    /// Parses a capture token, with or without its surrounding braces.
    pub fn parse(token: &str) -> Result<Self, Error> {
        let inner = token
            .strip_prefix('{')
            .and_then(|t| t.strip_suffix('}'))
            .unwrap_or(token);

        let (kind, name) = match inner.split_once(':') {
            Some((kind, name)) => (ParamType::from_name(kind.trim()), name.trim()),
            None => (ParamType::Str, inner.trim()),
        };

        if name.is_empty() {
            return Err(Error::invalid_pattern(token, "capture has no name"));
        }
        if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(Error::invalid_pattern(token, format!("capture name `{name}` is not an identifier")));
        }

        Ok(Self { name: name.to_owned(), kind })
    }

    /// Coerces `raw` according to the declared type.
    pub fn decode(&self, raw: &str) -> Captured {
        let value = match self.kind {
            ParamType::Str => Value::Str(raw.to_owned()),
            ParamType::Int => Value::Int(parse_int(raw).unwrap_or_else(|| {
                debug!(name = %self.name, raw, "non-numeric int capture, using 0");
                0
            })),
            ParamType::Float => Value::Float(parse_float(raw).unwrap_or_else(|| {
                debug!(name = %self.name, raw, "non-numeric float capture, using 0");
                0.0
            })),
            ParamType::Bool => {
                Value::Bool(!FALSY.iter().any(|f| f.eq_ignore_ascii_case(raw)))
            }
        };
        Captured { name: self.name.clone(), kind: self.kind, value }
    }
}

/// Decodes one raw path value against a capture token.
///
/// ```rust
/// use tsuji::param::{decode, Value};
///
/// assert_eq!(decode("{int:id}", "42").unwrap().value, Value::Int(42));
/// assert_eq!(decode("{int:id}", "harrison").unwrap().value, Value::Int(0));
/// assert_eq!(decode("{bool:on}", "No").unwrap().value, Value::Bool(false));
/// ```
pub fn decode(token: &str, raw: &str) -> Result<Captured, Error> {
    Ok(Param::parse(token)?.decode(raw))
}

/// Wildcard tails are never coerced.
pub(crate) fn wildcard(raw: String) -> Captured {
    Captured { name: WILDCARD.to_owned(), kind: ParamType::Str, value: Value::Str(raw) }
}

/// Leading `[+-]?digits`, ignoring leading whitespace. Out-of-range values
/// saturate.
fn parse_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let end = numeric_prefix(s, false);
    if end == 0 {
        return None;
    }
    let digits = &s[..end];
    match digits.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) if digits.starts_with('-') => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

/// Leading `[+-]?digits[.digits][e[+-]digits]`, ignoring leading whitespace.
fn parse_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let end = numeric_prefix(s, true);
    s[..end].parse::<f64>().ok().filter(|n| !n.is_nan())
}

fn numeric_prefix(s: &str, fractional: bool) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut seen_digits = i > digits_start;
    if !fractional {
        return if seen_digits { i } else { 0 };
    }

    if bytes.get(i) == Some(&b'.') {
        let mut j = i + 1;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > i + 1 || seen_digits {
            seen_digits |= j > i + 1;
            i = j;
        }
    }
    if !seen_digits {
        return 0;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

/// Ordered captures for one matched pattern.
///
/// Order follows left-to-right occurrence in the pattern. Handlers usually
/// read them positionally; [`Params::get`] is a convenience lookup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params(Vec<Captured>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, captured: Captured) {
        self.0.push(captured);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Captured> {
        self.0.iter()
    }

    /// The decoded values in pattern order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|c| &c.value)
    }

    /// First capture named `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|c| c.name == name).map(|c| &c.value)
    }

    /// The wildcard tail, if the pattern ended in `*`.
    pub fn wildcard(&self) -> Option<&str> {
        self.get(WILDCARD).and_then(Value::as_str)
    }
}

impl Index<usize> for Params {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.0[index].value
    }
}

impl From<Vec<Captured>> for Params {
    fn from(captures: Vec<Captured>) -> Self {
        Self(captures)
    }
}

impl IntoIterator for Params {
    type Item = Captured;
    type IntoIter = std::vec::IntoIter<Captured>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Captured;
    type IntoIter = std::slice::Iter<'a, Captured>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_forms() {
        assert_eq!(Param::parse("{id}").unwrap(), Param { name: "id".into(), kind: ParamType::Str });
        assert_eq!(Param::parse("{int:id}").unwrap().kind, ParamType::Int);
        assert_eq!(Param::parse("{numeric:v}").unwrap().kind, ParamType::Float);
        assert_eq!(Param::parse("{boolean:on}").unwrap().kind, ParamType::Bool);
        assert_eq!(Param::parse("{uuid:id}").unwrap().kind, ParamType::Str);
        assert!(Param::parse("{}").is_err());
        assert!(Param::parse("{int:}").is_err());
        assert!(Param::parse("{a b}").is_err());
    }

    #[test]
    fn int_coercion() {
        let p = Param::parse("{int:id}").unwrap();
        assert_eq!(p.decode("42").value, Value::Int(42));
        assert_eq!(p.decode("-7").value, Value::Int(-7));
        assert_eq!(p.decode("12abc").value, Value::Int(12));
        assert_eq!(p.decode("harrison").value, Value::Int(0));
        assert_eq!(p.decode("").value, Value::Int(0));
        assert_eq!(p.decode("+").value, Value::Int(0));
    }

    #[test]
    fn int_overflow_saturates() {
        let p = Param::parse("{int:id}").unwrap();
        assert_eq!(p.decode("99999999999999999999").value, Value::Int(i64::MAX));
        assert_eq!(p.decode("-99999999999999999999").value, Value::Int(i64::MIN));
        assert_eq!(p.decode("9223372036854775807").value, Value::Int(i64::MAX));
        assert_eq!(decode("{int:id}", "123456789012345678901x").unwrap().value, Value::Int(i64::MAX));
    }

    #[test]
    fn float_coercion() {
        let p = Param::parse("{float:v}").unwrap();
        assert_eq!(p.decode("1.0").value, Value::Float(1.0));
        assert_eq!(p.decode("2.5e2").value, Value::Float(250.0));
        assert_eq!(p.decode(".5").value, Value::Float(0.5));
        assert_eq!(p.decode("3.").value, Value::Float(3.0));
        assert_eq!(p.decode("NaN").value, Value::Float(0.0));
        assert_eq!(p.decode("v1").value, Value::Float(0.0));
    }

    #[test]
    fn bool_coercion() {
        let p = Param::parse("{bool:flag}").unwrap();
        for falsy in ["0", "false", "", "NULL", "nil", "undefined", "No", "none"] {
            assert_eq!(p.decode(falsy).value, Value::Bool(false), "{falsy}");
        }
        for truthy in ["1", "true", "yes", "anything"] {
            assert_eq!(p.decode(truthy).value, Value::Bool(true), "{truthy}");
        }
    }

    #[test]
    fn params_lookup() {
        let mut params = Params::new();
        params.push(Param::parse("{int:id}").unwrap().decode("9"));
        params.push(wildcard("a/b".into()));
        assert_eq!(params[0], Value::Int(9));
        assert_eq!(params.get("id"), Some(&Value::Int(9)));
        assert_eq!(params.wildcard(), Some("a/b"));
        assert_eq!(params.values().count(), 2);
    }
}
