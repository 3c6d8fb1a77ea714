//! Untyped values as they appear in a configuration file.

use std::fmt;

/// A parsed right-hand side, before it is checked against the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    /// Raw digit run. Range checks happen at bind time.
    Integer(String),
    Array(Vec<ArrayItem>),
}

/// One element of an array, optionally keyed (`"k" => "v"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayItem {
    pub key: Option<String>,
    pub value: Value,
}

impl ArrayItem {
    pub fn plain(value: Value) -> Self {
        Self { key: None, value }
    }

    pub fn keyed(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: Some(key.into()),
            value,
        }
    }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Name of the value's shape, as used in type errors.
    pub fn shape(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Array(_) => "array",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"{}\"", s.replace('"', "\\\""))
}

/// Renders the value in configuration syntax, so the output can be read back.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write_quoted(f, s),
            Value::Integer(digits) => f.write_str(digits),
            Value::Array(items) if items.is_empty() => f.write_str("()"),
            Value::Array(items) => {
                f.write_str("( ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if let Some(key) = &item.key {
                        write_quoted(f, key)?;
                        f.write_str(" => ")?;
                    }
                    write!(f, "{}", item.value)?;
                }
                f.write_str(" )")
            }
        }
    }
}

/// A single `key = value` statement and the line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: Value,
    pub line: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes() {
        assert_eq!(Value::string("x").shape(), "string");
        assert_eq!(Value::Integer("1".into()).shape(), "integer");
        assert_eq!(Value::Array(vec![]).shape(), "array");
    }

    #[test]
    fn display_quotes_and_escapes() {
        assert_eq!(Value::string(r#"a "b""#).to_string(), r#""a \"b\"""#);
        assert_eq!(Value::Integer("80".into()).to_string(), "80");
    }

    #[test]
    fn display_array_with_keys() {
        let v = Value::Array(vec![
            ArrayItem::keyed(".html", Value::string("text/html")),
            ArrayItem::plain(Value::string("index.html")),
        ]);
        assert_eq!(
            v.to_string(),
            r#"( ".html" => "text/html", "index.html" )"#
        );
    }
}
