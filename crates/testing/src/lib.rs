// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! Test support: a scripted in-memory [`Executor`] and record fixtures.
//!
//! The scripted executor records every statement, drains every staging
//! transfer into memory and serves query results from a FIFO script, which
//! is enough to drive the whole orchestrator state machine without a
//! server.

pub mod fixtures;

use std::collections::VecDeque;
use std::fmt;

use async_trait::async_trait;
use bulkmerge_core::{
	BufferedRows, Dialect, Executor, MergeError, Result, RowSource, RowStream, Value,
};

/// One captured staging transfer.
#[derive(Debug, Clone)]
pub struct BulkWrite {
	pub destination: String,
	pub columns: Vec<String>,
	pub rows: Vec<Vec<Value>>,
	pub batch_size: usize,
}

#[derive(Debug)]
struct ScriptedFailure(String);

impl fmt::Display for ScriptedFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl std::error::Error for ScriptedFailure {}

/// Scripted [`Executor`].
///
/// Starts closed so connection-ownership paths run; use
/// [`ScriptedExecutor::already_open`] for the caller-owned variant. Query
/// results are served in the order they were scripted: typically the column
/// introspection rows first, then identity readback rows.
pub struct ScriptedExecutor {
	database: String,
	dialect: Box<dyn Dialect>,
	open: bool,
	pub open_calls: usize,
	pub close_calls: usize,
	pub executed: Vec<String>,
	pub queried: Vec<String>,
	pub bulk_writes: Vec<BulkWrite>,
	query_results: VecDeque<Vec<Vec<Value>>>,
	fail_next_execute: Option<String>,
	fail_next_bulk_write: Option<String>,
}

impl ScriptedExecutor {
	pub fn new(database: impl Into<String>, dialect: impl Dialect + 'static) -> Self {
		Self {
			database: database.into(),
			dialect: Box::new(dialect),
			open: false,
			open_calls: 0,
			close_calls: 0,
			executed: Vec::new(),
			queried: Vec::new(),
			bulk_writes: Vec::new(),
			query_results: VecDeque::new(),
			fail_next_execute: None,
			fail_next_bulk_write: None,
		}
	}

	pub fn already_open(database: impl Into<String>, dialect: impl Dialect + 'static) -> Self {
		let mut executor = Self::new(database, dialect);
		executor.open = true;
		executor
	}

	/// Queue rows for the next [`Executor::query`] call.
	pub fn push_query_result(&mut self, rows: Vec<Vec<Value>>) {
		self.query_results.push_back(rows);
	}

	/// Make the next [`Executor::execute`] fail with a transport error.
	pub fn fail_next_execute(&mut self, message: impl Into<String>) {
		self.fail_next_execute = Some(message.into());
	}

	/// Make the next staging transfer fail with a transport error.
	pub fn fail_next_bulk_write(&mut self, message: impl Into<String>) {
		self.fail_next_bulk_write = Some(message.into());
	}
}

#[async_trait]
impl Executor for ScriptedExecutor {
	fn dialect(&self) -> &dyn Dialect {
		self.dialect.as_ref()
	}

	fn database(&self) -> &str {
		&self.database
	}

	fn is_open(&self) -> bool {
		self.open
	}

	async fn open(&mut self) -> Result<()> {
		self.open = true;
		self.open_calls += 1;
		Ok(())
	}

	async fn close(&mut self) -> Result<()> {
		self.open = false;
		self.close_calls += 1;
		Ok(())
	}

	async fn execute(&mut self, sql: &str, _timeout: Option<std::time::Duration>) -> Result<u64> {
		if let Some(message) = self.fail_next_execute.take() {
			return Err(MergeError::transport("statement execution", ScriptedFailure(message)));
		}
		self.executed.push(sql.to_string());
		Ok(0)
	}

	async fn query(
		&mut self,
		sql: &str,
		_timeout: Option<std::time::Duration>,
	) -> Result<Box<dyn RowStream>> {
		self.queried.push(sql.to_string());
		let rows = self.query_results.pop_front().unwrap_or_default();
		Ok(Box::new(BufferedRows::new(rows)))
	}

	async fn bulk_write(
		&mut self,
		destination: &str,
		rows: &mut dyn RowSource,
		batch_size: usize,
		_timeout: Option<std::time::Duration>,
	) -> Result<()> {
		if let Some(message) = self.fail_next_bulk_write.take() {
			return Err(MergeError::transport("bulk transfer", ScriptedFailure(message)));
		}
		let columns = rows.columns().to_vec();
		let mut captured = Vec::new();
		while rows.advance() {
			let mut row = Vec::with_capacity(columns.len());
			for index in 0..columns.len() {
				row.push(rows.value(index)?);
			}
			captured.push(row);
		}
		self.bulk_writes.push(BulkWrite {
			destination: destination.to_string(),
			columns,
			rows: captured,
			batch_size,
		});
		Ok(())
	}
}

/// Introspection rows in the positional wire shape:
/// `(name, declared_type, is_identity, is_primary_key)`.
pub fn column_rows(columns: &[(&str, &str, bool, bool)]) -> Vec<Vec<Value>> {
	columns
		.iter()
		.map(|(name, ty, identity, key)| {
			vec![
				Value::Text((*name).to_string()),
				Value::Text((*ty).to_string()),
				Value::Int32(i32::from(*identity)),
				Value::Int32(i32::from(*key)),
			]
		})
		.collect()
}

/// Identity readback rows: one single-cell row per generated value.
pub fn identity_rows(ids: &[i64]) -> Vec<Vec<Value>> {
	ids.iter().map(|id| vec![Value::Int64(*id)]).collect()
}
