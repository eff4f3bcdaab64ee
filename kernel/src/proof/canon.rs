//! Canonical JSON bytes: the single serialization-for-hashing implementation.
//!
//! **Exactly one place** produces canonical JSON bytes. The report body that
//! lands in `AER.json` and every test that pins a digest route through this
//! module.
//!
//! # Canonicalization rules
//!
//! 1. Object keys are sorted lexicographically (byte order), at every level.
//! 2. Arrays keep caller order.
//! 3. No extraneous whitespace (compact form: `{"a":1,"b":2}`).
//! 4. Strings are JSON-escaped per RFC 8259 §7 with one fixed scheme: `"`,
//!    `\`, `\n`, `\r`, `\t` as short escapes, other control characters as
//!    `\u00xx`, everything else passed through as UTF-8.
//! 5. Numbers must be integers (`i64` or `u64`), written in plain decimal.
//!    Floats, NaN and Infinity are rejected to prevent formatting drift.
//! 6. `null`, `true`, `false` are written literally.

use std::fmt::Write as _;
use std::io::Write;

use serde::Serialize;

/// Error type for canonical JSON serialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanonError {
    /// A JSON number was not an integer (float, NaN, Infinity).
    #[error("non-integer number in canonical JSON at {path}: {raw}")]
    NonIntegerNumber { path: String, raw: String },
    /// A typed value could not be converted to a JSON value.
    #[error("value is not representable as JSON: {detail}")]
    Unrepresentable { detail: String },
}

/// Produce canonical JSON bytes from a `serde_json::Value`.
///
/// # Errors
///
/// Returns [`CanonError::NonIntegerNumber`] if any JSON number is not
/// representable as `i64` or `u64`.
pub fn canonical_json_bytes(value: &serde_json::Value) -> Result<Vec<u8>, CanonError> {
    let mut buf = Vec::new();
    let mut path = String::new();
    write_value(&mut buf, value, &mut path)?;
    Ok(buf)
}

/// Produce canonical JSON bytes from any `Serialize` value.
///
/// Any `f32`/`f64` reached during serialization is rejected, finite or not.
/// The scan runs before conversion to a JSON value, so NaN and Infinity fail
/// instead of becoming `null`.
///
/// # Errors
///
/// Returns [`CanonError::Unrepresentable`] if conversion to a JSON value fails
/// (e.g. a map with non-string keys), or [`CanonError::NonIntegerNumber`] as
/// for [`canonical_json_bytes`].
pub fn canonical_json_bytes_of<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonError> {
    value
        .serialize(&mut float_scan::Scanner::default())
        .map_err(|e| match e {
            float_scan::ScanError::Float { path, raw } => CanonError::NonIntegerNumber { path, raw },
            float_scan::ScanError::Custom(detail) => CanonError::Unrepresentable { detail },
        })?;
    let value = serde_json::to_value(value).map_err(|e| CanonError::Unrepresentable {
        detail: e.to_string(),
    })?;
    canonical_json_bytes(&value)
}

/// Returns `true` if `bytes` are exactly the canonical form of the JSON they encode.
#[must_use]
pub fn is_canonical(bytes: &[u8]) -> bool {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) else {
        return false;
    };
    canonical_json_bytes(&value).is_ok_and(|canon| canon == bytes)
}

fn write_value(
    buf: &mut Vec<u8>,
    value: &serde_json::Value,
    path: &mut String,
) -> Result<(), CanonError> {
    match value {
        serde_json::Value::Null => {
            buf.extend_from_slice(b"null");
        }
        serde_json::Value::Bool(b) => {
            if *b {
                buf.extend_from_slice(b"true");
            } else {
                buf.extend_from_slice(b"false");
            }
        }
        serde_json::Value::Number(n) => {
            write_number(buf, n, path)?;
        }
        serde_json::Value::String(s) => {
            write_string(buf, s);
        }
        serde_json::Value::Array(arr) => {
            buf.push(b'[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                let len = path.len();
                let _ = write!(path, "/{i}");
                write_value(buf, item, path)?;
                path.truncate(len);
            }
            buf.push(b']');
        }
        serde_json::Value::Object(map) => {
            // Sorted keys (lexicographic byte order), independent of map impl.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            buf.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_string(buf, key);
                buf.push(b':');
                let len = path.len();
                push_segment(path, key);
                write_value(buf, &map[*key], path)?;
                path.truncate(len);
            }
            buf.push(b'}');
        }
    }
    Ok(())
}

/// Append one JSON Pointer segment, escaping `~` and `/` per RFC 6901.
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

fn pointer(path: &str) -> String {
    if path.is_empty() {
        "/".into()
    } else {
        path.to_string()
    }
}

fn write_number(
    buf: &mut Vec<u8>,
    n: &serde_json::Number,
    path: &str,
) -> Result<(), CanonError> {
    // Try i64 first (handles negatives), then u64 (handles large positives).
    if let Some(i) = n.as_i64() {
        let _ = write!(buf, "{i}");
        Ok(())
    } else if let Some(u) = n.as_u64() {
        let _ = write!(buf, "{u}");
        Ok(())
    } else {
        Err(CanonError::NonIntegerNumber {
            path: pointer(path),
            raw: n.to_string(),
        })
    }
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for ch in s.chars() {
        match ch {
            '"' => buf.extend_from_slice(b"\\\""),
            '\\' => buf.extend_from_slice(b"\\\\"),
            '\n' => buf.extend_from_slice(b"\\n"),
            '\r' => buf.extend_from_slice(b"\\r"),
            '\t' => buf.extend_from_slice(b"\\t"),
            c if c < '\u{0020}' => {
                let _ = write!(buf, "\\u{:04x}", c as u32);
            }
            c => {
                let mut utf8_buf = [0u8; 4];
                let encoded = c.encode_utf8(&mut utf8_buf);
                buf.extend_from_slice(encoded.as_bytes());
            }
        }
    }
    buf.push(b'"');
}

/// A serializer that produces nothing and fails on the first float.
mod float_scan {
    use std::fmt::{self, Display};

    use serde::ser::{self, Serialize};

    use super::{pointer, push_segment};

    #[derive(Debug)]
    pub(super) enum ScanError {
        Float { path: String, raw: String },
        Custom(String),
    }

    impl Display for ScanError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Float { path, raw } => write!(f, "float {raw} at {path}"),
                Self::Custom(msg) => f.write_str(msg),
            }
        }
    }

    impl std::error::Error for ScanError {}

    impl ser::Error for ScanError {
        fn custom<T: Display>(msg: T) -> Self {
            Self::Custom(msg.to_string())
        }
    }

    #[derive(Debug, Default)]
    pub(super) struct Scanner {
        path: String,
    }

    impl Scanner {
        fn float(&self, raw: String) -> Result<(), ScanError> {
            Err(ScanError::Float {
                path: pointer(&self.path),
                raw,
            })
        }

        fn nested<T: ?Sized + Serialize>(&mut self, segment: &str, value: &T) -> Result<(), ScanError> {
            let len = self.path.len();
            push_segment(&mut self.path, segment);
            let result = value.serialize(&mut *self);
            self.path.truncate(len);
            result
        }

        fn compound(&mut self, variant: Option<&str>) -> Compound<'_> {
            let base = self.path.len();
            if let Some(variant) = variant {
                push_segment(&mut self.path, variant);
            }
            Compound {
                scan: self,
                base,
                index: 0,
                key: None,
            }
        }
    }

    pub(super) struct Compound<'a> {
        scan: &'a mut Scanner,
        base: usize,
        index: usize,
        key: Option<String>,
    }

    impl Compound<'_> {
        fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ScanError> {
            let segment = self.index.to_string();
            self.index += 1;
            self.scan.nested(&segment, value)
        }

        fn finish(self) -> Result<(), ScanError> {
            self.scan.path.truncate(self.base);
            Ok(())
        }
    }

    /// Map keys as they will appear in the pointer.
    fn key_text<T: ?Sized + Serialize>(key: &T) -> String {
        match serde_json::to_value(key) {
            Ok(serde_json::Value::String(s)) => s,
            Ok(other) => other.to_string(),
            Err(_) => String::new(),
        }
    }

    impl<'a> ser::Serializer for &'a mut Scanner {
        type Ok = ();
        type Error = ScanError;
        type SerializeSeq = Compound<'a>;
        type SerializeTuple = Compound<'a>;
        type SerializeTupleStruct = Compound<'a>;
        type SerializeTupleVariant = Compound<'a>;
        type SerializeMap = Compound<'a>;
        type SerializeStruct = Compound<'a>;
        type SerializeStructVariant = Compound<'a>;

        fn serialize_bool(self, _: bool) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_i8(self, _: i8) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_i16(self, _: i16) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_i32(self, _: i32) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_i64(self, _: i64) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_i128(self, _: i128) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_u8(self, _: u8) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_u16(self, _: u16) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_u32(self, _: u32) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_u64(self, _: u64) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_u128(self, _: u128) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_f32(self, v: f32) -> Result<(), ScanError> {
            self.float(v.to_string())
        }
        fn serialize_f64(self, v: f64) -> Result<(), ScanError> {
            self.float(v.to_string())
        }
        fn serialize_char(self, _: char) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_str(self, _: &str) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_bytes(self, _: &[u8]) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_none(self) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), ScanError> {
            value.serialize(self)
        }
        fn serialize_unit(self) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_unit_struct(self, _: &'static str) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Result<(), ScanError> {
            Ok(())
        }
        fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _: &'static str, value: &T) -> Result<(), ScanError> {
            value.serialize(self)
        }
        fn serialize_newtype_variant<T: ?Sized + Serialize>(
            self,
            _: &'static str,
            _: u32,
            variant: &'static str,
            value: &T,
        ) -> Result<(), ScanError> {
            self.nested(variant, value)
        }
        fn serialize_seq(self, _: Option<usize>) -> Result<Compound<'a>, ScanError> {
            Ok(self.compound(None))
        }
        fn serialize_tuple(self, _: usize) -> Result<Compound<'a>, ScanError> {
            Ok(self.compound(None))
        }
        fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Compound<'a>, ScanError> {
            Ok(self.compound(None))
        }
        fn serialize_tuple_variant(
            self,
            _: &'static str,
            _: u32,
            variant: &'static str,
            _: usize,
        ) -> Result<Compound<'a>, ScanError> {
            Ok(self.compound(Some(variant)))
        }
        fn serialize_map(self, _: Option<usize>) -> Result<Compound<'a>, ScanError> {
            Ok(self.compound(None))
        }
        fn serialize_struct(self, _: &'static str, _: usize) -> Result<Compound<'a>, ScanError> {
            Ok(self.compound(None))
        }
        fn serialize_struct_variant(
            self,
            _: &'static str,
            _: u32,
            variant: &'static str,
            _: usize,
        ) -> Result<Compound<'a>, ScanError> {
            Ok(self.compound(Some(variant)))
        }
    }

    impl ser::SerializeSeq for Compound<'_> {
        type Ok = ();
        type Error = ScanError;
        fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ScanError> {
            self.element(value)
        }
        fn end(self) -> Result<(), ScanError> {
            self.finish()
        }
    }

    impl ser::SerializeTuple for Compound<'_> {
        type Ok = ();
        type Error = ScanError;
        fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ScanError> {
            self.element(value)
        }
        fn end(self) -> Result<(), ScanError> {
            self.finish()
        }
    }

    impl ser::SerializeTupleStruct for Compound<'_> {
        type Ok = ();
        type Error = ScanError;
        fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ScanError> {
            self.element(value)
        }
        fn end(self) -> Result<(), ScanError> {
            self.finish()
        }
    }

    impl ser::SerializeTupleVariant for Compound<'_> {
        type Ok = ();
        type Error = ScanError;
        fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ScanError> {
            self.element(value)
        }
        fn end(self) -> Result<(), ScanError> {
            self.finish()
        }
    }

    impl ser::SerializeMap for Compound<'_> {
        type Ok = ();
        type Error = ScanError;
        fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), ScanError> {
            self.key = Some(key_text(key));
            Ok(())
        }
        fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ScanError> {
            let key = self.key.take().unwrap_or_default();
            self.scan.nested(&key, value)
        }
        fn end(self) -> Result<(), ScanError> {
            self.finish()
        }
    }

    impl ser::SerializeStruct for Compound<'_> {
        type Ok = ();
        type Error = ScanError;
        fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), ScanError> {
            self.scan.nested(key, value)
        }
        fn end(self) -> Result<(), ScanError> {
            self.finish()
        }
    }

    impl ser::SerializeStructVariant for Compound<'_> {
        type Ok = ();
        type Error = ScanError;
        fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), ScanError> {
            self.scan.nested(key, value)
        }
        fn end(self) -> Result<(), ScanError> {
            self.finish()
        }
    }
}
