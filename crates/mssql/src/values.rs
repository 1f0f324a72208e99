// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! Conversions between engine values and TDS column data.

use std::borrow::Cow;

use bigdecimal::{BigDecimal, ToPrimitive, num_bigint::BigInt};
use bulkmerge_core::{Value, ValueKind};
use tiberius::{ColumnData, IntoSql, numeric::Numeric};

pub(crate) fn from_column_data(data: ColumnData<'_>) -> Value {
	match data {
		ColumnData::U8(v) => v.map(|v| Value::Int32(i32::from(v))).unwrap_or(Value::Null),
		ColumnData::I16(v) => v.map(|v| Value::Int32(i32::from(v))).unwrap_or(Value::Null),
		ColumnData::I32(v) => v.map(Value::Int32).unwrap_or(Value::Null),
		ColumnData::I64(v) => v.map(Value::Int64).unwrap_or(Value::Null),
		ColumnData::F32(v) => v.map(|v| Value::Float64(f64::from(v))).unwrap_or(Value::Null),
		ColumnData::F64(v) => v.map(Value::Float64).unwrap_or(Value::Null),
		ColumnData::Bit(v) => v.map(Value::Bool).unwrap_or(Value::Null),
		ColumnData::String(v) => v.map(|v| Value::Text(v.into_owned())).unwrap_or(Value::Null),
		ColumnData::Guid(v) => v.map(Value::Uuid).unwrap_or(Value::Null),
		ColumnData::Binary(v) => v.map(|v| Value::Bytes(v.into_owned())).unwrap_or(Value::Null),
		ColumnData::Numeric(v) => v
			.map(|n| Value::Decimal(BigDecimal::new(BigInt::from(n.value()), i64::from(n.scale()))))
			.unwrap_or(Value::Null),
		_ => Value::Null,
	}
}

pub(crate) fn to_column_data(value: Value, kind: Option<ValueKind>) -> ColumnData<'static> {
	match value {
		Value::Null => null_of(kind),
		Value::Bool(v) => ColumnData::Bit(Some(v)),
		Value::Int32(v) => ColumnData::I32(Some(v)),
		Value::Int64(v) => ColumnData::I64(Some(v)),
		Value::Float64(v) => ColumnData::F64(Some(v)),
		Value::Decimal(v) => ColumnData::Numeric(Some(to_numeric(&v))),
		Value::Text(v) => ColumnData::String(Some(Cow::Owned(v))),
		Value::Date(v) => v.into_sql(),
		Value::DateTime(v) => v.into_sql(),
		Value::Uuid(v) => ColumnData::Guid(Some(v)),
		Value::Bytes(v) => ColumnData::Binary(Some(Cow::Owned(v))),
		Value::Json(v) => ColumnData::String(Some(Cow::Owned(v.to_string()))),
	}
}

fn null_of(kind: Option<ValueKind>) -> ColumnData<'static> {
	match kind {
		Some(ValueKind::Bool) => ColumnData::Bit(None),
		Some(ValueKind::Int32) => ColumnData::I32(None),
		Some(ValueKind::Int64) => ColumnData::I64(None),
		Some(ValueKind::Float64) => ColumnData::F64(None),
		Some(ValueKind::Decimal) => ColumnData::Numeric(None),
		Some(ValueKind::Uuid) => ColumnData::Guid(None),
		Some(ValueKind::Bytes) => ColumnData::Binary(None),
		Some(ValueKind::Date) => ColumnData::Date(None),
		Some(ValueKind::DateTime) => ColumnData::DateTime2(None),
		_ => ColumnData::String(None),
	}
}

fn to_numeric(value: &BigDecimal) -> Numeric {
	let (digits, exponent) = value.as_bigint_and_exponent();
	if exponent >= 0 && exponent <= i64::from(u8::MAX) {
		if let Some(mantissa) = digits.to_i128() {
			return Numeric::new_with_scale(mantissa, exponent as u8);
		}
	}
	// Out-of-range scale: round through a fixed scale of 10
	let rescaled = value.with_scale(10);
	let (digits, _) = rescaled.as_bigint_and_exponent();
	Numeric::new_with_scale(digits.to_i128().unwrap_or_default(), 10)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_core_kinds() {
		assert_eq!(from_column_data(to_column_data(Value::Int64(7), None)), Value::Int64(7));
		assert_eq!(from_column_data(to_column_data(Value::Bool(true), None)), Value::Bool(true));
		assert_eq!(
			from_column_data(to_column_data(Value::Text("x".into()), None)),
			Value::Text("x".into())
		);
	}

	#[test]
	fn nulls_are_typed_by_declared_kind() {
		assert!(matches!(null_of(Some(ValueKind::Int64)), ColumnData::I64(None)));
		assert!(matches!(null_of(Some(ValueKind::Text)), ColumnData::String(None)));
		assert!(matches!(null_of(None), ColumnData::String(None)));
	}

	#[test]
	fn decimals_keep_scale() {
		let decimal: BigDecimal = "12.34".parse().unwrap();
		let numeric = to_numeric(&decimal);
		assert_eq!(numeric.value(), 1234);
		assert_eq!(numeric.scale(), 2);
	}
}
