// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! Per-call option resolution: table, schema, keys, identity and the
//! field-to-column mapping, frozen into an immutable context before any DDL
//! or DML is issued.

use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
	error::{MergeError, Result},
	executor::Executor,
	record::{FieldDef, Record},
	schema::{ColumnCache, ColumnInfo},
};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Caller-tunable knobs for one bulk operation.
#[derive(Debug, Clone)]
pub struct MergeOptions {
	/// Target table; defaults to the record type's table name.
	pub table: Option<String>,
	/// Target schema; defaults to the record type's schema, then the
	/// dialect default.
	pub schema: Option<String>,
	/// Explicit primary-key columns. When absent, key-marked record fields
	/// win, then introspected primary-key columns.
	pub primary_keys: Option<Vec<String>>,
	/// Fields excluded from this call, matched case-insensitively against
	/// field and column names. Excluded fields never reach any statement
	/// and are never read from the records.
	pub exclude: Vec<String>,
	/// Rows per transfer batch.
	pub batch_size: usize,
	/// Per-network-operation timeout. Each round trip gets the full budget.
	pub timeout: Option<Duration>,
	/// Write server-generated identity values back into the records
	/// (insert and insert-or-update only).
	pub map_identity: bool,
}

impl Default for MergeOptions {
	fn default() -> Self {
		Self {
			table: None,
			schema: None,
			primary_keys: None,
			exclude: Vec::new(),
			batch_size: DEFAULT_BATCH_SIZE,
			timeout: None,
			map_identity: true,
		}
	}
}

impl MergeOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn table(mut self, table: impl Into<String>) -> Self {
		self.table = Some(table.into());
		self
	}

	pub fn schema(mut self, schema: impl Into<String>) -> Self {
		self.schema = Some(schema.into());
		self
	}

	pub fn primary_keys<I, S>(mut self, keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.primary_keys = Some(keys.into_iter().map(Into::into).collect());
		self
	}

	pub fn exclude<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.exclude = fields.into_iter().map(Into::into).collect();
		self
	}

	pub fn batch_size(mut self, batch_size: usize) -> Self {
		self.batch_size = batch_size;
		self
	}

	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	pub fn map_identity(mut self, map_identity: bool) -> Self {
		self.map_identity = map_identity;
		self
	}
}

/// Resolved, immutable facts for one call.
///
/// Built once, never mutated, owned by the orchestrating call for its whole
/// duration.
#[derive(Debug, Clone)]
pub struct MergeContext {
	pub table: String,
	pub schema: Option<String>,
	/// Staging table name; absent for plain bulk copy.
	pub staging: Option<String>,
	/// Outgoing column name paired with the record field feeding it, in
	/// field declaration order, exclusions already applied.
	pub mapping: Vec<(String, &'static FieldDef)>,
	/// Introspected metadata, lower-cased column name keyed; absent for
	/// plain bulk copy.
	pub columns: Option<Arc<HashMap<String, ColumnInfo>>>,
	pub identity: Option<ColumnInfo>,
	pub primary_keys: Vec<String>,
	pub batch_size: usize,
	pub timeout: Option<Duration>,
	pub map_identity: bool,
}

impl MergeContext {
	/// The mapped column names, in cursor order.
	pub fn column_names(&self) -> Vec<String> {
		self.mapping.iter().map(|(column, _)| column.clone()).collect()
	}

	/// The record field feeding the identity column, when both exist.
	pub fn identity_field(&self) -> Option<&'static FieldDef> {
		let identity = self.identity.as_ref()?;
		self.mapping
			.iter()
			.find(|(column, _)| column.eq_ignore_ascii_case(&identity.name))
			.map(|(_, field)| *field)
	}
}

fn excluded(options: &MergeOptions, field: &FieldDef) -> bool {
	options
		.exclude
		.iter()
		.any(|e| e.eq_ignore_ascii_case(field.name) || e.eq_ignore_ascii_case(field.column))
}

/// Resolve one call's context. `staged` selects the staged-merge path with
/// introspection; plain bulk copy passes false and gets a transfer-only
/// context.
pub(crate) async fn build_context<T, E>(
	cache: &ColumnCache,
	executor: &mut E,
	options: &MergeOptions,
	staged: bool,
) -> Result<MergeContext>
where
	T: Record,
	E: Executor + ?Sized,
{
	let table = options.table.clone().unwrap_or_else(|| T::table().to_string());

	let mapping: Vec<(String, &'static FieldDef)> = T::fields()
		.iter()
		.filter(|field| !excluded(options, field))
		.map(|field| (field.column.to_string(), field))
		.collect();

	if !staged {
		return Ok(MergeContext {
			table,
			schema: options.schema.clone().or_else(|| T::schema().map(str::to_string)),
			staging: None,
			mapping,
			columns: None,
			identity: None,
			primary_keys: Vec::new(),
			batch_size: options.batch_size,
			timeout: options.timeout,
			map_identity: false,
		});
	}

	let introspected = cache.columns_for(executor, &table).await?;
	let by_name: HashMap<String, ColumnInfo> = introspected
		.iter()
		.map(|c| (c.name.to_lowercase(), c.clone()))
		.collect();

	for (column, field) in &mapping {
		if !by_name.contains_key(&column.to_lowercase()) {
			return Err(MergeError::UnknownColumn {
				field: field.name.to_string(),
				column: column.clone(),
				table,
			});
		}
	}

	let mut primary_keys = options.primary_keys.clone().unwrap_or_else(|| {
		T::fields()
			.iter()
			.filter(|f| f.key)
			.map(|f| f.column.to_string())
			.collect()
	});
	if primary_keys.is_empty() {
		primary_keys = introspected
			.iter()
			.filter(|c| c.is_primary_key)
			.map(|c| c.name.clone())
			.collect();
	}

	let identity = introspected.iter().find(|c| c.is_identity).cloned();
	let schema = options
		.schema
		.clone()
		.or_else(|| T::schema().map(str::to_string))
		.or_else(|| executor.dialect().default_schema().map(str::to_string));
	let staging = Some(executor.dialect().staging_table_name(&table));

	Ok(MergeContext {
		table,
		schema,
		staging,
		mapping,
		columns: Some(Arc::new(by_name)),
		identity,
		primary_keys,
		batch_size: options.batch_size,
		timeout: options.timeout,
		map_identity: options.map_identity,
	})
}
