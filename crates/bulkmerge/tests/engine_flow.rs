// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! Full-stack flows: derived records through the engine, converters on the
//! staging path, and the blocking variants.

use bulkmerge::{BulkEngine, MergeOptions, Record, Value, ValueKind, blocking::BlockingEngine};
use bulkmerge_testing::{ScriptedExecutor, column_rows, identity_rows};
use bulkmerge_core::{MySqlDialect, PostgresDialect};

#[derive(Record, Debug, PartialEq, Clone)]
#[record(table = "Document")]
struct Document {
	#[record(column = "Id")]
	id: i64,
	#[record(column = "Title")]
	title: String,
	#[record(column = "Payload")]
	payload: serde_json::Value,
}

fn document_columns() -> Vec<Vec<Value>> {
	column_rows(&[
		("Id", "bigint", true, true),
		("Title", "varchar", false, false),
		("Payload", "text", false, false),
	])
}

#[tokio::test]
async fn converters_rewrite_staged_cells_only() {
	let engine = BulkEngine::new();
	// Structured payloads go to the wire as text
	engine.converters().register(ValueKind::Json, |v| Ok(Value::Text(v.to_text())));

	let mut executor = ScriptedExecutor::new("app", PostgresDialect);
	executor.push_query_result(document_columns());
	executor.push_query_result(identity_rows(&[7]));

	let mut docs = vec![Document {
		id: 0,
		title: "t".into(),
		payload: serde_json::json!({"k": "v"}),
	}];
	engine.bulk_insert(&mut executor, &mut docs, &MergeOptions::new()).await.unwrap();

	let staged = &executor.bulk_writes[0].rows[0];
	assert_eq!(staged[2], Value::Text("{\"k\":\"v\"}".into()));
	// Identity readback bypassed the converter chain entirely
	assert_eq!(docs[0].id, 7);
}

#[tokio::test]
async fn derived_keys_feed_the_dialect() {
	let engine = BulkEngine::new();
	let mut executor = ScriptedExecutor::new("app", MySqlDialect);
	// Metadata reports no primary key; the derive-level key wins instead
	executor.push_query_result(column_rows(&[
		("Code", "varchar", false, false),
		("Amount", "int", false, false),
	]));

	#[derive(Record)]
	struct Tally {
		#[record(column = "Code", key)]
		code: String,
		#[record(column = "Amount")]
		amount: i32,
	}

	let records = vec![Tally {
		code: "a".into(),
		amount: 1,
	}];
	engine.bulk_delete(&mut executor, &records, &MergeOptions::new()).await.unwrap();

	let delete = &executor.executed[1];
	assert!(delete.contains("`Tally`.`Code` = "));
}

#[test]
fn blocking_variants_run_the_same_flow() {
	let engine = BlockingEngine::new().unwrap();
	let mut executor = ScriptedExecutor::new("app", PostgresDialect);
	executor.push_query_result(document_columns());
	executor.push_query_result(identity_rows(&[41, 42]));

	let mut docs = vec![
		Document {
			id: 0,
			title: "a".into(),
			payload: serde_json::json!(1),
		},
		Document {
			id: 0,
			title: "b".into(),
			payload: serde_json::json!(2),
		},
	];
	engine.bulk_insert(&mut executor, &mut docs, &MergeOptions::new()).unwrap();

	assert_eq!(docs[0].id, 41);
	assert_eq!(docs[1].id, 42);
	assert_eq!(executor.close_calls, 1);
}

#[test]
fn blocking_copy_and_delete_round_out_the_surface() {
	let engine = BlockingEngine::new().unwrap();
	let mut executor = ScriptedExecutor::new("app", PostgresDialect);

	let docs = vec![Document {
		id: 3,
		title: "only".into(),
		payload: serde_json::json!(null),
	}];
	engine.bulk_copy(&mut executor, &docs, &MergeOptions::new()).unwrap();
	assert_eq!(executor.bulk_writes[0].destination, "Document");

	executor.push_query_result(document_columns());
	engine.bulk_delete(&mut executor, &docs, &MergeOptions::new()).unwrap();
	assert!(executor.executed.iter().any(|sql| sql.contains("DELETE FROM \"Document\"")));
}
