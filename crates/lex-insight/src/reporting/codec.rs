//! Safe numeric encoding for reports.
//!
//! Dashboards parse the report with a strict JSON parser, which rejects the
//! `NaN` and `Infinity` tokens some numeric code emits. Encoding therefore runs
//! in layers:
//!
//! 1. Every plotted number is a [`NumericValue`], whose `Serialize` impl writes
//!    non-finite floats as `null`. Optional statistics use [`finite_or_null`].
//! 2. [`encode_strict`] walks the typed output through a checking serializer
//!    and refuses to emit a document holding a non-finite float.
//! 3. [`encode_output`] falls back to [`sanitize_value`] if the strict pass
//!    fails, so a run always produces a document.

use std::fmt;

use crate::error::{AnalysisError, Result};
use serde::ser::{
    self, SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant, SerializeTuple,
    SerializeTupleStruct, SerializeTupleVariant,
};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

/// A number as it appears in report data.
///
/// One variant per representation the analysis produces; each maps to a plain
/// JSON scalar (or array), with non-finite floats mapped to `null`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Array(Vec<NumericValue>),
}

impl NumericValue {
    /// The value as a float, if it is a scalar number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumericValue::Int(v) => Some(*v as f64),
            NumericValue::UInt(v) => Some(*v as f64),
            NumericValue::Float(v) => Some(*v),
            NumericValue::Bool(_) | NumericValue::Array(_) => None,
        }
    }
}

impl Serialize for NumericValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            NumericValue::Int(v) => serializer.serialize_i64(*v),
            NumericValue::UInt(v) => serializer.serialize_u64(*v),
            NumericValue::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            NumericValue::Float(_) => serializer.serialize_none(),
            NumericValue::Bool(v) => serializer.serialize_bool(*v),
            NumericValue::Array(values) => values.serialize(serializer),
        }
    }
}

impl From<i64> for NumericValue {
    fn from(v: i64) -> Self {
        NumericValue::Int(v)
    }
}

impl From<usize> for NumericValue {
    fn from(v: usize) -> Self {
        NumericValue::UInt(v as u64)
    }
}

impl From<u64> for NumericValue {
    fn from(v: u64) -> Self {
        NumericValue::UInt(v)
    }
}

impl From<f64> for NumericValue {
    fn from(v: f64) -> Self {
        NumericValue::Float(v)
    }
}

impl From<bool> for NumericValue {
    fn from(v: bool) -> Self {
        NumericValue::Bool(v)
    }
}

impl<T: Into<NumericValue>> From<Vec<T>> for NumericValue {
    fn from(values: Vec<T>) -> Self {
        NumericValue::Array(values.into_iter().map(Into::into).collect())
    }
}

/// `serialize_with` hook for optional statistics: `None` and non-finite
/// values both become `null`.
pub fn finite_or_null<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(v) if v.is_finite() => serializer.serialize_f64(*v),
        _ => serializer.serialize_none(),
    }
}

// =============================================================================
// Strict Check
// =============================================================================

/// First non-finite float found by [`FiniteCheck`], with its location.
#[derive(Debug)]
struct NonFinite {
    reason: String,
    /// Innermost segment first.
    path: Vec<String>,
}

impl NonFinite {
    fn within(mut self, segment: String) -> Self {
        self.path.push(segment);
        self
    }
}

impl fmt::Display for NonFinite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: String = self.path.iter().rev().map(String::as_str).collect();
        write!(f, "{} at ${}", self.reason, path)
    }
}

impl std::error::Error for NonFinite {}

impl ser::Error for NonFinite {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        NonFinite {
            reason: msg.to_string(),
            path: Vec::new(),
        }
    }
}

type Checked = std::result::Result<(), NonFinite>;

/// Serializer that produces nothing and fails on the first NaN or infinity.
struct FiniteCheck;

/// Compound state: element index, or the current map key.
#[derive(Default)]
struct Walk {
    index: usize,
    key: String,
}

impl Walk {
    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        let index = self.index;
        self.index += 1;
        value
            .serialize(FiniteCheck)
            .map_err(|e| e.within(format!("[{}]", index)))
    }

    fn field<T: ?Sized + Serialize>(key: &str, value: &T) -> Checked {
        value
            .serialize(FiniteCheck)
            .map_err(|e| e.within(format!(".{}", key)))
    }
}

impl Serializer for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;
    type SerializeSeq = Walk;
    type SerializeTuple = Walk;
    type SerializeTupleStruct = Walk;
    type SerializeTupleVariant = Walk;
    type SerializeMap = Walk;
    type SerializeStruct = Walk;
    type SerializeStructVariant = Walk;

    fn serialize_bool(self, _: bool) -> Checked {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> Checked {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> Checked {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> Checked {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> Checked {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> Checked {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> Checked {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> Checked {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> Checked {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Checked {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Checked {
        if v.is_finite() {
            Ok(())
        } else {
            Err(NonFinite {
                reason: format!("non-finite number {}", v),
                path: Vec::new(),
            })
        }
    }

    fn serialize_char(self, _: char) -> Checked {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> Checked {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> Checked {
        Ok(())
    }

    fn serialize_none(self) -> Checked {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Checked {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Checked {
        Ok(())
    }

    fn serialize_unit_struct(self, _: &'static str) -> Checked {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Checked {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        value: &T,
    ) -> Checked {
        Walk::field(variant, value)
    }

    fn serialize_seq(self, _: Option<usize>) -> std::result::Result<Walk, NonFinite> {
        Ok(Walk::default())
    }

    fn serialize_tuple(self, _: usize) -> std::result::Result<Walk, NonFinite> {
        Ok(Walk::default())
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Walk, NonFinite> {
        Ok(Walk::default())
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Walk, NonFinite> {
        Ok(Walk::default())
    }

    fn serialize_map(self, _: Option<usize>) -> std::result::Result<Walk, NonFinite> {
        Ok(Walk::default())
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> std::result::Result<Walk, NonFinite> {
        Ok(Walk::default())
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Walk, NonFinite> {
        Ok(Walk::default())
    }
}

impl SerializeSeq for Walk {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        self.element(value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl SerializeTuple for Walk {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        self.element(value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl SerializeTupleStruct for Walk {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        self.element(value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl SerializeTupleVariant for Walk {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        self.element(value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl SerializeMap for Walk {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Checked {
        key.serialize(FiniteCheck)?;
        self.key = match serde_json::to_value(key) {
            Ok(Value::String(name)) => name,
            Ok(other) => other.to_string(),
            Err(_) => format!("<key {}>", self.index),
        };
        self.index += 1;
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        Walk::field(&self.key, value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl SerializeStruct for Walk {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Checked {
        Walk::field(key, value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl SerializeStructVariant for Walk {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Checked {
        Walk::field(key, value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Serialize strictly: fail rather than emit a non-finite number.
///
/// The check runs on the typed output, before serde_json gets a chance to
/// write non-finite floats as `null`.
pub fn encode_strict<T: ?Sized + Serialize>(output: &T, pretty: bool) -> Result<String> {
    output
        .serialize(FiniteCheck)
        .map_err(|e| AnalysisError::Serialization(e.to_string()))?;

    let encoded = if pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    };
    Ok(encoded)
}

/// Convert the output into a JSON tree with every non-finite float as `null`.
pub fn sanitize_value<T: ?Sized + Serialize>(output: &T) -> Result<Value> {
    // serde_json numbers are finite, so the conversion nulls NaN and infinities.
    Ok(serde_json::to_value(output)?)
}

/// Text encoding of the emitted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    /// UTF-8, non-ASCII characters written as-is.
    #[default]
    Utf8,
    /// ASCII only; everything else escaped as `\uXXXX`.
    Ascii,
}

impl OutputEncoding {
    pub fn apply(self, json: String) -> String {
        match self {
            OutputEncoding::Utf8 => json,
            OutputEncoding::Ascii => escape_non_ascii(&json),
        }
    }
}

/// Escape non-ASCII characters. Only valid on serialized JSON, where such
/// characters can only occur inside string literals.
fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

/// Encode any serializable output as one JSON document.
///
/// Runs strict encoding; if it fails, logs a warning and emits the sanitized
/// tree instead.
pub fn encode_output<T: Serialize>(
    output: &T,
    encoding: OutputEncoding,
    pretty: bool,
) -> Result<String> {
    let json = match encode_strict(output, pretty) {
        Ok(json) => json,
        Err(e) => {
            warn!("Strict encoding failed ({}), falling back to lenient output", e);
            let value = sanitize_value(output)?;
            if pretty {
                serde_json::to_string_pretty(&value)?
            } else {
                serde_json::to_string(&value)?
            }
        }
    };

    Ok(encoding.apply(json))
}
