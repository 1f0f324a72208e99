// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! Table metadata introspection and the process-wide column cache.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
	error::{MergeError, Result},
	executor::Executor,
	value::Value,
};

/// Metadata for one physical column of the target table.
///
/// At most one column per table carries the identity flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
	pub name: String,
	pub declared_type: String,
	pub is_identity: bool,
	pub is_primary_key: bool,
}

/// Cache of introspected table columns, keyed by `"{database}.{table}"`.
///
/// Lazily populated, never invalidated: an out-of-band schema change is not
/// observed until the engine is rebuilt. That staleness is the intended
/// trade-off - metadata lookups cost one query per table per engine
/// lifetime, not one per call.
///
/// Concurrent misses for the same table may both run the introspection
/// query; both arrive at the same answer and the insert is idempotent.
#[derive(Default)]
pub struct ColumnCache {
	tables: DashMap<String, Arc<Vec<ColumnInfo>>>,
}

impl ColumnCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Columns of `table`, introspecting on first use.
	pub async fn columns_for<E>(&self, executor: &mut E, table: &str) -> Result<Arc<Vec<ColumnInfo>>>
	where
		E: Executor + ?Sized,
	{
		let key = format!("{}.{}", executor.database(), table);
		if let Some(cached) = self.tables.get(&key) {
			return Ok(Arc::clone(cached.value()));
		}

		let sql = executor.dialect().columns_query(executor.database(), table);
		tracing::debug!(table, sql = %sql, "introspecting columns");

		let mut rows = executor.query(&sql, None).await?;
		let mut columns = Vec::new();
		while let Some(row) = rows.next().await? {
			columns.push(parse_column_row(table, row)?);
		}

		let columns = Arc::new(columns);
		self.tables.insert(key, Arc::clone(&columns));
		Ok(columns)
	}

	pub fn contains(&self, database: &str, table: &str) -> bool {
		self.tables.contains_key(&format!("{database}.{table}"))
	}

	pub fn len(&self) -> usize {
		self.tables.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tables.is_empty()
	}
}

/// Parse one introspection row: `(name, declared_type, is_identity,
/// is_primary_key)`, consumed positionally. Flags use the backend's
/// integer-as-boolean convention.
fn parse_column_row(table: &str, row: Vec<Value>) -> Result<ColumnInfo> {
	let mut cells = row.into_iter();
	let name = match cells.next() {
		Some(Value::Text(name)) => name,
		Some(other) => other.to_text(),
		None => {
			return Err(MergeError::Introspection {
				table: table.to_string(),
				detail: "missing column name".into(),
			});
		}
	};
	let declared_type = cells.next().map(|v| v.to_text()).unwrap_or_default();
	let is_identity = flag(table, cells.next())?;
	let is_primary_key = flag(table, cells.next())?;

	Ok(ColumnInfo {
		name,
		declared_type,
		is_identity,
		is_primary_key,
	})
}

fn flag(table: &str, value: Option<Value>) -> Result<bool> {
	match value {
		Some(Value::Int32(v)) => Ok(v == 1),
		Some(Value::Int64(v)) => Ok(v == 1),
		Some(Value::Bool(v)) => Ok(v),
		Some(Value::Text(v)) => Ok(v.trim() == "1"),
		Some(Value::Null) => Ok(false),
		other => Err(MergeError::Introspection {
			table: table.to_string(),
			detail: format!("unexpected flag cell: {other:?}"),
		}),
	}
}
