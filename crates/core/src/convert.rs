// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! Value converters applied while staging records for transfer.
//!
//! A converter rewrites every outgoing value of one declared kind, e.g.
//! rendering JSON payloads as text for a backend without a native JSON
//! column. Converters apply on the staging path only; identity back-mapping
//! never consults them.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
	error::{MergeError, Result},
	value::{Value, ValueKind},
};

/// Boxed conversion function. Receives the value read from the record
/// (possibly [`Value::Null`]) and returns the value handed to the backend.
pub type Converter = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Registry of converters keyed by declared field kind.
///
/// Registration is last-write-wins and there is no unregister. The map is
/// shared by all calls running on one engine; concurrent register/lookup are
/// safe but not transactional - a converter registered mid-call applies to
/// rows not yet staged.
#[derive(Default)]
pub struct ConverterRegistry {
	converters: DashMap<ValueKind, Converter>,
}

impl ConverterRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a converter for every field declared with `kind`.
	pub fn register<F>(&self, kind: ValueKind, converter: F)
	where
		F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
	{
		self.converters.insert(kind, Arc::new(converter));
	}

	/// Look up the converter for a kind, if one is registered.
	pub fn lookup(&self, kind: ValueKind) -> Option<Converter> {
		self.converters.get(&kind).map(|entry| Arc::clone(entry.value()))
	}

	/// Apply the registered converter for `kind` to `value`, passing the
	/// value through untouched when no converter is registered.
	pub fn apply(&self, kind: ValueKind, value: Value) -> Result<Value> {
		match self.lookup(kind) {
			Some(converter) => converter(value).map_err(|detail| MergeError::Converter {
				kind: kind.to_string(),
				detail,
			}),
			None => Ok(value),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.converters.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unregistered_kind_passes_through() {
		let registry = ConverterRegistry::new();
		let v = registry.apply(ValueKind::Int64, Value::Int64(5)).unwrap();
		assert_eq!(v, Value::Int64(5));
	}

	#[test]
	fn json_to_text_converter() {
		let registry = ConverterRegistry::new();
		registry.register(ValueKind::Json, |v| Ok(Value::Text(v.to_text())));

		let payload = serde_json::json!({"a": 1});
		let converted = registry.apply(ValueKind::Json, Value::Json(payload)).unwrap();
		assert_eq!(converted, Value::Text("{\"a\":1}".into()));
	}

	#[test]
	fn registration_is_last_write_wins() {
		let registry = ConverterRegistry::new();
		registry.register(ValueKind::Text, |_| Ok(Value::Text("first".into())));
		registry.register(ValueKind::Text, |_| Ok(Value::Text("second".into())));

		let v = registry.apply(ValueKind::Text, Value::Text("x".into())).unwrap();
		assert_eq!(v, Value::Text("second".into()));
	}

	#[test]
	fn converter_failure_surfaces_kind() {
		let registry = ConverterRegistry::new();
		registry.register(ValueKind::Uuid, |_| Err("boom".into()));

		let err = registry.apply(ValueKind::Uuid, Value::Null).unwrap_err();
		assert!(matches!(err, MergeError::Converter { .. }));
	}
}
