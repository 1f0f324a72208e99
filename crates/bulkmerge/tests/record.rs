// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! `#[derive(Record)]` behavior.

use bulkmerge::{Record, Value, ValueKind};
use bulkmerge_core::Record as RecordTrait;

#[derive(Record)]
struct Plain {
	id: i64,
	name: String,
}

#[derive(Record)]
#[record(table = "People", schema = "app")]
struct Renamed {
	#[record(column = "Id", key)]
	id: i64,
	#[record(column = "FullName")]
	name: String,
	#[record(skip)]
	cached_len: usize,
	age: Option<i32>,
}

#[test]
fn table_defaults_to_type_name() {
	assert_eq!(<Plain as RecordTrait>::table(), "Plain");
	assert_eq!(<Plain as RecordTrait>::schema(), None);
}

#[test]
fn table_and_schema_attributes_override() {
	assert_eq!(<Renamed as RecordTrait>::table(), "People");
	assert_eq!(<Renamed as RecordTrait>::schema(), Some("app"));
}

#[test]
fn fields_carry_renames_keys_and_kinds() {
	let fields = <Renamed as RecordTrait>::fields();
	assert_eq!(fields.len(), 3, "skipped fields are absent");

	assert_eq!(fields[0].name, "id");
	assert_eq!(fields[0].column, "Id");
	assert_eq!(fields[0].kind, ValueKind::Int64);
	assert!(fields[0].key);

	assert_eq!(fields[1].column, "FullName");
	assert!(!fields[1].key);

	assert_eq!(fields[2].name, "age");
	assert_eq!(fields[2].kind, ValueKind::Int32, "Option wraps the inner kind");
}

#[test]
fn get_reads_fields_by_name() {
	let record = Renamed {
		id: 9,
		name: "n".into(),
		cached_len: 1,
		age: None,
	};
	assert_eq!(record.get("id"), Value::Int64(9));
	assert_eq!(record.get("name"), Value::Text("n".into()));
	assert_eq!(record.get("age"), Value::Null);
}

#[test]
fn unknown_and_skipped_names_read_null_and_ignore_writes() {
	let mut record = Renamed {
		id: 1,
		name: "n".into(),
		cached_len: 7,
		age: Some(2),
	};
	assert_eq!(record.get("cached_len"), Value::Null);
	assert_eq!(record.get("no_such_field"), Value::Null);

	record.set("no_such_field", Value::Int64(3));
	record.set("cached_len", Value::Int64(3));
	assert_eq!(record.cached_len, 7);
}

#[test]
fn set_writes_matching_kinds_and_options() {
	let mut record = Renamed {
		id: 0,
		name: String::new(),
		cached_len: 0,
		age: None,
	};
	record.set("id", Value::Int64(42));
	record.set("age", Value::Int32(30));
	record.set("name", Value::Text("set".into()));
	assert_eq!(record.id, 42);
	assert_eq!(record.age, Some(30));
	assert_eq!(record.name, "set");

	// Nulling an optional field clears it
	record.set("age", Value::Null);
	assert_eq!(record.age, None);

	// A mismatched payload is ignored rather than corrupting the field
	record.set("id", Value::Text("nope".into()));
	assert_eq!(record.id, 42);
}
