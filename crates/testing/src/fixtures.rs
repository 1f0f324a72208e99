// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! Hand-written record fixtures.
//!
//! Implemented manually rather than derived so the core crate can use them
//! without depending on the derive macro.

use bulkmerge_core::{FieldDef, IntoValue, Record, Value, ValueKind};

/// The classic identity-table shape: `Person(Id identity, Name, Age)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
	pub id: i64,
	pub name: String,
	pub age: i32,
}

impl Person {
	pub fn new(id: i64, name: impl Into<String>, age: i32) -> Self {
		Self {
			id,
			name: name.into(),
			age,
		}
	}
}

const PERSON_FIELDS: &[FieldDef] = &[
	FieldDef {
		name: "id",
		column: "Id",
		kind: ValueKind::Int64,
		key: false,
	},
	FieldDef {
		name: "name",
		column: "Name",
		kind: ValueKind::Text,
		key: false,
	},
	FieldDef {
		name: "age",
		column: "Age",
		kind: ValueKind::Int32,
		key: false,
	},
];

impl Record for Person {
	fn table() -> &'static str {
		"Person"
	}

	fn fields() -> &'static [FieldDef] {
		PERSON_FIELDS
	}

	fn get(&self, field: &str) -> Value {
		match field {
			"id" => self.id.into_value(),
			"name" => self.name.clone().into_value(),
			"age" => self.age.into_value(),
			_ => Value::Null,
		}
	}

	fn set(&mut self, field: &str, value: Value) {
		match field {
			"id" => {
				if let Value::Int64(v) = value {
					self.id = v;
				}
			}
			"name" => {
				if let Value::Text(v) = value {
					self.name = v;
				}
			}
			"age" => {
				if let Value::Int32(v) = value {
					self.age = v;
				}
			}
			_ => {}
		}
	}
}

/// A keyless, identity-less shape for plain copy and error paths:
/// `AuditEntry(Source, Message)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
	pub source: String,
	pub message: String,
}

const AUDIT_FIELDS: &[FieldDef] = &[
	FieldDef {
		name: "source",
		column: "Source",
		kind: ValueKind::Text,
		key: false,
	},
	FieldDef {
		name: "message",
		column: "Message",
		kind: ValueKind::Text,
		key: false,
	},
];

impl Record for AuditEntry {
	fn table() -> &'static str {
		"AuditEntry"
	}

	fn fields() -> &'static [FieldDef] {
		AUDIT_FIELDS
	}

	fn get(&self, field: &str) -> Value {
		match field {
			"source" => self.source.clone().into_value(),
			"message" => self.message.clone().into_value(),
			_ => Value::Null,
		}
	}

	fn set(&mut self, field: &str, value: Value) {
		match field {
			"source" => {
				if let Value::Text(v) = value {
					self.source = v;
				}
			}
			"message" => {
				if let Value::Text(v) = value {
					self.message = v;
				}
			}
			_ => {}
		}
	}
}

/// Metadata rows matching [`Person`] against a table with a bigint identity
/// primary key.
pub fn person_columns() -> Vec<Vec<bulkmerge_core::Value>> {
	crate::column_rows(&[
		("Id", "bigint", true, true),
		("Name", "varchar", false, false),
		("Age", "int", false, false),
	])
}
