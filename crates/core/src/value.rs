// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

use std::fmt::{Display, Formatter};

use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive, Zero};
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::error::{MergeError, Result};

/// A cell value, represented as a native Rust type.
///
/// Values cross exactly two boundaries: outward through a backend's staging
/// transfer, and inward when generated identity values are written back into
/// records.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// The absence of a value (SQL NULL)
	Null,
	/// A boolean: true or false
	Bool(bool),
	/// A 4-byte signed integer
	Int32(i32),
	/// An 8-byte signed integer
	Int64(i64),
	/// An 8-byte floating point
	Float64(f64),
	/// An arbitrary-precision decimal
	Decimal(BigDecimal),
	/// A UTF-8 encoded text
	Text(String),
	/// A date value (year, month, day)
	Date(NaiveDate),
	/// A date and time value without offset
	DateTime(NaiveDateTime),
	/// A UUID
	Uuid(Uuid),
	/// Raw binary data
	Bytes(Vec<u8>),
	/// A structured JSON payload
	Json(serde_json::Value),
}

/// The declared type of a record field or cell, without a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
	Bool,
	Int32,
	Int64,
	Float64,
	Decimal,
	Text,
	Date,
	DateTime,
	Uuid,
	Bytes,
	Json,
}

impl Display for ValueKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			ValueKind::Bool => "bool",
			ValueKind::Int32 => "int32",
			ValueKind::Int64 => "int64",
			ValueKind::Float64 => "float64",
			ValueKind::Decimal => "decimal",
			ValueKind::Text => "text",
			ValueKind::Date => "date",
			ValueKind::DateTime => "datetime",
			ValueKind::Uuid => "uuid",
			ValueKind::Bytes => "bytes",
			ValueKind::Json => "json",
		};
		f.write_str(name)
	}
}

impl Value {
	pub fn kind(&self) -> Option<ValueKind> {
		match self {
			Value::Null => None,
			Value::Bool(_) => Some(ValueKind::Bool),
			Value::Int32(_) => Some(ValueKind::Int32),
			Value::Int64(_) => Some(ValueKind::Int64),
			Value::Float64(_) => Some(ValueKind::Float64),
			Value::Decimal(_) => Some(ValueKind::Decimal),
			Value::Text(_) => Some(ValueKind::Text),
			Value::Date(_) => Some(ValueKind::Date),
			Value::DateTime(_) => Some(ValueKind::DateTime),
			Value::Uuid(_) => Some(ValueKind::Uuid),
			Value::Bytes(_) => Some(ValueKind::Bytes),
			Value::Json(_) => Some(ValueKind::Json),
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Whether this value is the zero value of its kind.
	///
	/// Identity back-mapping only assigns generated values to records whose
	/// identity field still holds the zero value; anything else means the
	/// caller supplied the identity and the record is skipped.
	pub fn is_default(&self) -> bool {
		match self {
			Value::Null => true,
			Value::Bool(b) => !b,
			Value::Int32(v) => *v == 0,
			Value::Int64(v) => *v == 0,
			Value::Float64(v) => *v == 0.0,
			Value::Decimal(v) => v.is_zero(),
			Value::Text(v) => v.is_empty(),
			Value::Uuid(v) => v.is_nil(),
			Value::Bytes(v) => v.is_empty(),
			Value::Date(_) | Value::DateTime(_) | Value::Json(_) => false,
		}
	}

	/// Convert this value into the given kind.
	///
	/// Used only for identity back-mapping, where the declared type of the
	/// identity field and the wire type of the readback cursor can differ
	/// (simple-protocol readbacks surface numbers as text). Fails with a
	/// conversion error when the payload cannot represent the target kind.
	pub fn coerce(self, kind: ValueKind) -> Result<Value> {
		if self.is_null() || self.kind() == Some(kind) {
			return Ok(self);
		}
		let coerced = match (&self, kind) {
			(Value::Int32(v), ValueKind::Int64) => Some(Value::Int64(i64::from(*v))),
			(Value::Int64(v), ValueKind::Int32) => i32::try_from(*v).ok().map(Value::Int32),
			(Value::Int32(v), ValueKind::Decimal) => BigDecimal::from_i32(*v).map(Value::Decimal),
			(Value::Int64(v), ValueKind::Decimal) => BigDecimal::from_i64(*v).map(Value::Decimal),
			(Value::Int32(v), ValueKind::Float64) => Some(Value::Float64(f64::from(*v))),
			(Value::Int64(v), ValueKind::Float64) => Some(Value::Float64(*v as f64)),
			(Value::Decimal(v), ValueKind::Int32) => v.to_i32().map(Value::Int32),
			(Value::Decimal(v), ValueKind::Int64) => v.to_i64().map(Value::Int64),
			(Value::Float64(v), ValueKind::Int64) => {
				(v.fract() == 0.0).then(|| Value::Int64(*v as i64))
			}
			(Value::Float64(v), ValueKind::Int32) => {
				(v.fract() == 0.0 && *v >= f64::from(i32::MIN) && *v <= f64::from(i32::MAX))
					.then(|| Value::Int32(*v as i32))
			}
			(Value::Text(v), ValueKind::Int32) => v.trim().parse().ok().map(Value::Int32),
			(Value::Text(v), ValueKind::Int64) => v.trim().parse().ok().map(Value::Int64),
			(Value::Text(v), ValueKind::Float64) => v.trim().parse().ok().map(Value::Float64),
			(Value::Text(v), ValueKind::Decimal) => v.trim().parse().ok().map(Value::Decimal),
			(Value::Text(v), ValueKind::Uuid) => Uuid::parse_str(v.trim()).ok().map(Value::Uuid),
			(Value::Text(v), ValueKind::Bool) => match v.trim() {
				"t" | "true" | "1" => Some(Value::Bool(true)),
				"f" | "false" | "0" => Some(Value::Bool(false)),
				_ => None,
			},
			(_, ValueKind::Text) => Some(Value::Text(self.to_text())),
			_ => None,
		};
		coerced.ok_or_else(|| MergeError::Conversion {
			from: self.kind().map(|k| k.to_string()).unwrap_or_else(|| "null".into()),
			to: kind.to_string(),
		})
	}

	/// Render the payload as plain text, without SQL quoting.
	pub fn to_text(&self) -> String {
		match self {
			Value::Null => String::new(),
			Value::Bool(b) => b.to_string(),
			Value::Int32(v) => v.to_string(),
			Value::Int64(v) => v.to_string(),
			Value::Float64(v) => v.to_string(),
			Value::Decimal(v) => v.to_string(),
			Value::Text(v) => v.clone(),
			Value::Date(v) => v.format("%Y-%m-%d").to_string(),
			Value::DateTime(v) => v.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
			Value::Uuid(v) => v.to_string(),
			Value::Bytes(v) => {
				let mut out = String::with_capacity(2 + v.len() * 2);
				out.push_str("\\x");
				for b in v {
					out.push_str(&format!("{b:02x}"));
				}
				out
			}
			Value::Json(v) => v.to_string(),
		}
	}
}

/// Conversion of a native field type into a [`Value`], with its declared kind.
///
/// Implemented for every type `#[derive(Record)]` accepts in a field position.
pub trait IntoValue {
	const KIND: ValueKind;

	fn into_value(self) -> Value;
}

/// Conversion of a [`Value`] back into a native field type.
///
/// Used by generated setters; the engine coerces the value to the field's
/// declared kind first, so a mismatch here means the payload genuinely cannot
/// be represented.
pub trait FromValue: Sized {
	fn from_value(value: Value) -> Option<Self>;
}

macro_rules! value_conversions {
	($($ty:ty => $kind:ident, $variant:ident;)*) => {
		$(
			impl IntoValue for $ty {
				const KIND: ValueKind = ValueKind::$kind;

				fn into_value(self) -> Value {
					Value::$variant(self)
				}
			}

			impl FromValue for $ty {
				fn from_value(value: Value) -> Option<Self> {
					match value {
						Value::$variant(v) => Some(v),
						_ => None,
					}
				}
			}

			impl From<$ty> for Value {
				fn from(v: $ty) -> Self {
					Value::$variant(v)
				}
			}
		)*
	};
}

value_conversions! {
	bool => Bool, Bool;
	i32 => Int32, Int32;
	i64 => Int64, Int64;
	f64 => Float64, Float64;
	BigDecimal => Decimal, Decimal;
	String => Text, Text;
	NaiveDate => Date, Date;
	NaiveDateTime => DateTime, DateTime;
	Uuid => Uuid, Uuid;
	Vec<u8> => Bytes, Bytes;
	serde_json::Value => Json, Json;
}

impl<T: IntoValue> IntoValue for Option<T> {
	const KIND: ValueKind = T::KIND;

	fn into_value(self) -> Value {
		match self {
			Some(v) => v.into_value(),
			None => Value::Null,
		}
	}
}

impl<T: FromValue> FromValue for Option<T> {
	fn from_value(value: Value) -> Option<Self> {
		match value {
			Value::Null => Some(None),
			other => T::from_value(other).map(Some),
		}
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Text(v.to_string())
	}
}
