//! Values carried by log events
//!
//! This module provides:
//! - `FieldValue`: arguments and key-value data attached to an event
//! - `Marker`: named tags on an event
//! - `render_template`: `{}` placeholder substitution for messages

use std::fmt::{self, Write as _};

/// Value type for arguments and structured key-value pairs
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<FieldValue>),
    Map(Vec<(String, FieldValue)>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::UInt(u) => write!(f, "{}", u),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => f.write_str("null"),
            FieldValue::List(items) => {
                f.write_char('[')?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_char(']')
            }
            FieldValue::Map(entries) => {
                f.write_char('{')?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", key, value)?;
                }
                f.write_char('}')
            }
        }
    }
}

impl FieldValue {
    /// Capture any displayable value as a string
    pub fn display<T: fmt::Display + ?Sized>(value: &T) -> Self {
        FieldValue::String(value.to_string())
    }

    /// Capture any debuggable value as a string
    pub fn debug<T: fmt::Debug + ?Sized>(value: &T) -> Self {
        FieldValue::String(format!("{:?}", value))
    }

    /// Convert to serde_json::Value
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::UInt(u) => serde_json::Value::Number((*u).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::List(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json_value).collect())
            }
            FieldValue::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        FieldValue::String(s.clone())
    }
}

impl From<char> for FieldValue {
    fn from(c: char) -> Self {
        FieldValue::String(c.to_string())
    }
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                FieldValue::Int(value as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                FieldValue::UInt(value as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for FieldValue {
    fn from(f: f32) -> Self {
        FieldValue::Float(f as f64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Named tag attached to an event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker(String);

impl Marker {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Marker {
    fn from(name: &str) -> Self {
        Marker::new(name)
    }
}

impl From<String> for Marker {
    fn from(name: String) -> Self {
        Marker(name)
    }
}

/// Substitute `{}` placeholders in `template` with `args`, left to right.
///
/// Placeholders without a matching argument are kept verbatim, surplus
/// arguments are ignored and `\{}` produces a literal `{}`.
pub fn render_template(template: &str, args: &[FieldValue], out: &mut String) {
    let mut rest = template;
    let mut args = args.iter();

    while let Some(pos) = rest.find("{}") {
        let (head, tail) = rest.split_at(pos);
        if let Some(escaped) = head.strip_suffix('\\') {
            out.push_str(escaped);
            out.push_str("{}");
        } else {
            out.push_str(head);
            match args.next() {
                Some(arg) => {
                    let _ = write!(out, "{}", arg);
                }
                None => out.push_str("{}"),
            }
        }
        rest = &tail[2..];
    }
    out.push_str(rest);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(template: &str, args: &[FieldValue]) -> String {
        let mut out = String::new();
        render_template(template, args, &mut out);
        out
    }

    #[test]
    fn test_placeholders_are_substituted_in_order() {
        assert_eq!(
            render("order {} placed by {}", &[42.into(), "alice".into()]),
            "order 42 placed by alice"
        );
    }

    #[test]
    fn test_missing_and_surplus_arguments() {
        assert_eq!(render("{} and {}", &[1.into()]), "1 and {}");
        assert_eq!(render("no placeholders", &[1.into()]), "no placeholders");
    }

    #[test]
    fn test_escaped_placeholder() {
        assert_eq!(render("literal \\{} then {}", &[true.into()]), "literal {} then true");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(FieldValue::from(7u8), FieldValue::UInt(7));
        assert_eq!(FieldValue::from(-3i16), FieldValue::Int(-3));
        assert_eq!(FieldValue::from(None::<i32>), FieldValue::Null);
        assert_eq!(
            FieldValue::from(vec![1, 2]),
            FieldValue::List(vec![FieldValue::Int(1), FieldValue::Int(2)])
        );
        assert_eq!(FieldValue::display(&1.5f32), FieldValue::String("1.5".into()));
    }

    #[test]
    fn test_display_nested() {
        let value = FieldValue::Map(vec![
            ("ids".to_string(), FieldValue::from(vec![1, 2])),
            ("ok".to_string(), FieldValue::Bool(true)),
        ]);
        assert_eq!(value.to_string(), "{ids=[1, 2], ok=true}");
    }

    #[test]
    fn test_to_json_value_preserves_map_order() {
        let value = FieldValue::Map(vec![
            ("z".to_string(), FieldValue::Int(1)),
            ("a".to_string(), FieldValue::Null),
        ]);
        let json = serde_json::to_string(&value.to_json_value()).unwrap();
        assert_eq!(json, r#"{"z":1,"a":null}"#);
    }
}
