use std::collections::BTreeMap;
use std::fmt::{self, Display};

use crate::{CLOSE_SENTINEL, DOC_MARKER, OPEN_SENTINEL};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValueError {
    #[error("string contains both quote delimiters and cannot be encoded: {0:?}")]
    Unquotable(String),

    #[error("string contains the reserved token {token:?}")]
    ReservedToken { token: &'static str },

    #[error("string contains a line break outside of a top-level argument position")]
    EmbeddedNewline,

    #[error("float value {0} has no canonical decimal form")]
    NonFiniteFloat(f64),

    #[error("parse error at byte {pos}: expected {expected}")]
    Parse { pos: usize, expected: &'static str },

    #[error("trailing input at byte {pos}")]
    Trailing { pos: usize },
}

/// A recordable value: the tagged union over everything Parrot can carry
/// through a ledger and a replay artifact.
///
/// Map keys are strings and map entries iterate in key order, so encoding is
/// deterministic.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// The absent value; the default for unfilled optional parameters.
    None,
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Encode this value in its canonical textual form.
    ///
    /// Strings quote with `'` unless they contain that character, in which
    /// case `"` is used. A string containing both delimiters, a reserved
    /// sentinel token, or a line break is an error here, never silently
    /// escaped. Multi-line strings are legal only as top-level call
    /// arguments, where the artifact serializer brackets them with sentinel
    /// tokens instead of calling this.
    pub fn encode(&self) -> Result<String, ValueError> {
        match self {
            Value::None => Ok("None".to_owned()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(x) => encode_float(*x),
            Value::Str(s) => quote(s),
            Value::List(items) => {
                let inner = items
                    .iter()
                    .map(Value::encode)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("[{}]", inner.join(", ")))
            }
            Value::Map(entries) => {
                let inner = entries
                    .iter()
                    .map(|(k, v)| Ok(format!("{}: {}", quote(k)?, v.encode()?)))
                    .collect::<Result<Vec<_>, ValueError>>()?;
                Ok(format!("{{{}}}", inner.join(", ")))
            }
        }
    }

    /// Decode a canonical textual form back into a value.
    ///
    /// Inverse of [`Value::encode`]; trailing non-whitespace input is an
    /// error.
    pub fn decode(src: &str) -> Result<Value, ValueError> {
        crate::parse::decode(src)
    }
}

fn encode_float(x: f64) -> Result<String, ValueError> {
    if !x.is_finite() {
        return Err(ValueError::NonFiniteFloat(x));
    }
    // Always carry a decimal point or exponent so the Float tag survives a
    // round-trip.
    let s = format!("{x}");
    if s.contains(['.', 'e', 'E']) {
        Ok(s)
    } else {
        Ok(format!("{s}.0"))
    }
}

/// Quote a string, preferring the single-quote delimiter.
fn quote(s: &str) -> Result<String, ValueError> {
    for token in [OPEN_SENTINEL, CLOSE_SENTINEL, DOC_MARKER] {
        if s.contains(token) {
            return Err(ValueError::ReservedToken { token });
        }
    }
    if s.contains('\n') {
        return Err(ValueError::EmbeddedNewline);
    }
    if !s.contains('\'') {
        Ok(format!("'{s}'"))
    } else if !s.contains('"') {
        Ok(format!("\"{s}\""))
    } else {
        Err(ValueError::Unquotable(s.to_owned()))
    }
}

/// Lossy human-readable rendering: identical to [`Value::encode`] where that
/// succeeds, falling back to a debug form for strings the codec rejects.
impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => match quote(s) {
                Ok(q) => f.write_str(&q),
                Err(_) => write!(f, "{s:?}"),
            },
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match quote(k) {
                        Ok(q) => write!(f, "{q}: {v}")?,
                        Err(_) => write!(f, "{k:?}: {v}")?,
                    }
                }
                f.write_str("}")
            }
            other => match other.encode() {
                Ok(s) => f.write_str(&s),
                Err(_) => write!(f, "{other:?}"),
            },
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_quoting_prefers_single_quotes() {
        assert_eq!(Value::from("hello").encode().unwrap(), "'hello'");
        assert_eq!(Value::from("it's").encode().unwrap(), "\"it's\"");
    }

    #[test]
    fn string_with_both_quotes_is_rejected() {
        let err = Value::from("both ' and \"").encode().unwrap_err();
        assert!(matches!(err, ValueError::Unquotable(_)));
    }

    #[test]
    fn reserved_tokens_are_rejected() {
        for s in [">\"\">", "a <\"\"< b", "doc \"\"\" doc"] {
            let err = Value::from(s).encode().unwrap_err();
            assert!(matches!(err, ValueError::ReservedToken { .. }), "{s}");
        }
    }

    #[test]
    fn floats_keep_their_tag() {
        assert_eq!(Value::Float(5.0).encode().unwrap(), "5.0");
        assert_eq!(Value::Float(2.5).encode().unwrap(), "2.5");
        assert!(Value::Float(f64::NAN).encode().is_err());
    }

    #[test]
    fn large_integral_floats_keep_their_tag() {
        for x in [1e16, -1e17, 9.007199254740992e15] {
            let text = Value::Float(x).encode().unwrap();
            let back = Value::decode(&text).unwrap();
            assert_eq!(back, Value::Float(x), "{text}");
        }
    }

    #[test]
    fn composites_encode_recursively() {
        let v = Value::List(vec![
            Value::None,
            Value::Int(2),
            Value::from("x"),
            Value::List(vec![]),
        ]);
        assert_eq!(v.encode().unwrap(), "[None, 2, 'x', []]");

        let mut m = BTreeMap::new();
        m.insert("b".to_owned(), Value::Int(1));
        m.insert("a".to_owned(), Value::from("y"));
        // BTreeMap iteration is key-ordered, so encoding is deterministic.
        assert_eq!(Value::Map(m).encode().unwrap(), "{'a': 'y', 'b': 1}");
    }

    #[test]
    fn display_is_lossy_where_encode_errors() {
        let v = Value::from("line\nbreak");
        assert!(v.encode().is_err());
        assert_eq!(v.to_string(), "\"line\\nbreak\"");
    }
}
