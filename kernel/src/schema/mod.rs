//! Structural schema validation for decoded JSON values.
//!
//! A [`Schema`] is a plain tree of node kinds. [`validate`] walks a
//! `serde_json::Value` against it and collects **every** violation, each
//! addressed by a JSON-pointer path (`/meta/period/start`). Validation never
//! stops at the first problem, so a verifier can report the full picture.
//!
//! Closed objects reject unknown fields. Optional fields that are absent are
//! not errors; optional fields that are present are still checked.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// String formats understood by [`Schema::String`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// Any UTF-8 string.
    Any,
    /// A string with at least one character.
    NonEmpty,
    /// Calendar date, exactly `YYYY-MM-DD`.
    Date,
    /// RFC 3339 instant (`2026-01-31T23:59:59.999Z`).
    Timestamp,
}

/// One named field of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
}

impl Field {
    /// A field that must be present.
    #[must_use]
    pub fn required(name: &str, schema: Schema) -> Self {
        Self {
            name: name.to_string(),
            schema,
            required: true,
        }
    }

    /// A field that may be absent.
    #[must_use]
    pub fn optional(name: &str, schema: Schema) -> Self {
        Self {
            name: name.to_string(),
            schema,
            required: false,
        }
    }
}

/// Schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Object with declared fields. `closed` rejects undeclared keys.
    Object { fields: Vec<Field>, closed: bool },
    /// Any JSON object; contents unchecked.
    AnyObject,
    /// Homogeneous array.
    Array(Box<Schema>),
    String(StringFormat),
    /// Integer, optionally bounded below.
    Integer { min: Option<i64> },
    Bool,
    Null,
    /// String drawn from a fixed set.
    Enum(Vec<String>),
    /// Exactly this string.
    Const(String),
    /// `null` or the inner schema.
    Nullable(Box<Schema>),
    /// Anything at all.
    Any,
}

impl Schema {
    /// Closed object over `fields`.
    #[must_use]
    pub fn closed(fields: Vec<Field>) -> Self {
        Self::Object {
            fields,
            closed: true,
        }
    }

    /// Open object over `fields`: undeclared keys are allowed and unchecked.
    #[must_use]
    pub fn open(fields: Vec<Field>) -> Self {
        Self::Object {
            fields,
            closed: false,
        }
    }

    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self::Array(Box::new(items))
    }

    #[must_use]
    pub fn nullable(inner: Schema) -> Self {
        Self::Nullable(Box::new(inner))
    }

    #[must_use]
    pub fn string() -> Self {
        Self::String(StringFormat::Any)
    }

    #[must_use]
    pub fn non_empty() -> Self {
        Self::String(StringFormat::NonEmpty)
    }

    #[must_use]
    pub fn date() -> Self {
        Self::String(StringFormat::Date)
    }

    #[must_use]
    pub fn timestamp() -> Self {
        Self::String(StringFormat::Timestamp)
    }

    #[must_use]
    pub fn count() -> Self {
        Self::Integer { min: Some(0) }
    }

    #[must_use]
    pub fn one_of(values: &[&str]) -> Self {
        Self::Enum(values.iter().map(|v| (*v).to_string()).collect())
    }

    #[must_use]
    pub fn constant(value: &str) -> Self {
        Self::Const(value.to_string())
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON-pointer path of the offending value (`""` is the root).
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {}", self.message)
    }
}

/// Validate `value` against `schema`.
///
/// # Errors
///
/// Returns every [`Violation`] found, in document order (object fields in
/// schema declaration order, then unknown keys in sorted order).
pub fn validate(value: &Value, schema: &Schema) -> Result<(), Vec<Violation>> {
    let mut out = Vec::new();
    let mut path = String::new();
    check(value, schema, &mut path, &mut out);
    if out.is_empty() {
        Ok(())
    } else {
        Err(out)
    }
}

fn push(out: &mut Vec<Violation>, path: &str, message: String) {
    out.push(Violation {
        path: path.to_string(),
        message,
    });
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Append a JSON-pointer segment (RFC 6901 escaping).
fn push_segment(path: &mut String, segment: &str) {
    path.push('/');
    for ch in segment.chars() {
        match ch {
            '~' => path.push_str("~0"),
            '/' => path.push_str("~1"),
            c => path.push(c),
        }
    }
}

fn check(value: &Value, schema: &Schema, path: &mut String, out: &mut Vec<Violation>) {
    match schema {
        Schema::Any => {}
        Schema::Null => {
            if !value.is_null() {
                push(out, path, format!("expected null, got {}", kind_of(value)));
            }
        }
        Schema::Bool => {
            if !value.is_boolean() {
                push(out, path, format!("expected boolean, got {}", kind_of(value)));
            }
        }
        Schema::Integer { min } => match value.as_i64() {
            Some(n) => {
                if let Some(min) = min {
                    if n < *min {
                        push(out, path, format!("integer {n} is below minimum {min}"));
                    }
                }
            }
            None => {
                let got = if value.is_number() {
                    "non-integer number"
                } else {
                    kind_of(value)
                };
                push(out, path, format!("expected integer, got {got}"));
            }
        },
        Schema::String(format) => match value.as_str() {
            Some(s) => check_format(s, *format, path, out),
            None => push(out, path, format!("expected string, got {}", kind_of(value))),
        },
        Schema::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.iter().any(|a| a == s) => {}
            Some(s) => push(
                out,
                path,
                format!("value {s:?} is not one of [{}]", allowed.join(", ")),
            ),
            None => push(out, path, format!("expected string, got {}", kind_of(value))),
        },
        Schema::Const(expected) => match value.as_str() {
            Some(s) if s == expected => {}
            Some(s) => push(out, path, format!("expected {expected:?}, got {s:?}")),
            None => push(out, path, format!("expected string, got {}", kind_of(value))),
        },
        Schema::Nullable(inner) => {
            if !value.is_null() {
                check(value, inner, path, out);
            }
        }
        Schema::AnyObject => {
            if !value.is_object() {
                push(out, path, format!("expected object, got {}", kind_of(value)));
            }
        }
        Schema::Array(items) => {
            let Some(arr) = value.as_array() else {
                push(out, path, format!("expected array, got {}", kind_of(value)));
                return;
            };
            for (i, item) in arr.iter().enumerate() {
                let len = path.len();
                push_segment(path, &i.to_string());
                check(item, items, path, out);
                path.truncate(len);
            }
        }
        Schema::Object { fields, closed } => {
            let Some(map) = value.as_object() else {
                push(out, path, format!("expected object, got {}", kind_of(value)));
                return;
            };
            for field in fields {
                let len = path.len();
                push_segment(path, &field.name);
                match map.get(&field.name) {
                    Some(v) => check(v, &field.schema, path, out),
                    None if field.required => {
                        push(out, path, "required field is missing".to_string());
                    }
                    None => {}
                }
                path.truncate(len);
            }
            if *closed {
                let mut unknown: Vec<&String> = map
                    .keys()
                    .filter(|k| !fields.iter().any(|f| &f.name == *k))
                    .collect();
                unknown.sort();
                for key in unknown {
                    let len = path.len();
                    push_segment(path, key);
                    push(out, path, "unknown field".to_string());
                    path.truncate(len);
                }
            }
        }
    }
}

fn check_format(s: &str, format: StringFormat, path: &str, out: &mut Vec<Violation>) {
    match format {
        StringFormat::Any => {}
        StringFormat::NonEmpty => {
            if s.is_empty() {
                push(out, path, "string must not be empty".to_string());
            }
        }
        StringFormat::Date => {
            if !is_date(s) {
                push(out, path, format!("{s:?} is not a YYYY-MM-DD date"));
            }
        }
        StringFormat::Timestamp => {
            if DateTime::parse_from_rfc3339(s).is_err() {
                push(out, path, format!("{s:?} is not an RFC 3339 timestamp"));
            }
        }
    }
}

/// `true` for a real calendar date written exactly as `YYYY-MM-DD`.
#[must_use]
pub fn is_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}
