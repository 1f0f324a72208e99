// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! The staged-merge orchestrator.
//!
//! One call walks: ensure the connection is open, build the context, create
//! and widen the staging table as one batch, stream the records into it via
//! the backend's native transfer, execute the operation's reconciliation
//! statement, optionally back-map generated identities, and close the
//! connection again when this engine opened it.
//!
//! Failures abort the remaining steps and propagate unchanged. A staging
//! table created before the failure is only cleaned up when the failing
//! batch itself carried the drop; an abort between staging and
//! reconciliation can leak it until the session ends.

use tracing::{debug, instrument};

use crate::{
	context::{MergeContext, MergeOptions, build_context},
	convert::ConverterRegistry,
	dialect::Dialect,
	error::{MergeError, Result},
	executor::{Executor, RowStream},
	reader::RecordCursor,
	record::Record,
	schema::ColumnCache,
	value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeOperation {
	Insert,
	InsertOrUpdate,
	Update,
	Delete,
}

impl MergeOperation {
	fn requires_keys(self) -> bool {
		matches!(self, MergeOperation::InsertOrUpdate | MergeOperation::Update | MergeOperation::Delete)
	}

	fn maps_identity(self) -> bool {
		matches!(self, MergeOperation::Insert | MergeOperation::InsertOrUpdate)
	}

	fn name(self) -> &'static str {
		match self {
			MergeOperation::Insert => "insert",
			MergeOperation::InsertOrUpdate => "insert_or_update",
			MergeOperation::Update => "update",
			MergeOperation::Delete => "delete",
		}
	}

	fn render(self, dialect: &dyn Dialect, ctx: &MergeContext) -> String {
		let columns = ctx.column_names();
		let staging = ctx.staging.as_deref().unwrap_or_default();
		let identity = ctx.identity.as_ref();
		match self {
			MergeOperation::Insert => {
				dialect.insert_query(&columns, &ctx.table, staging, &ctx.primary_keys, identity)
			}
			MergeOperation::InsertOrUpdate => {
				dialect.insert_or_update_query(&columns, &ctx.table, staging, &ctx.primary_keys, identity)
			}
			MergeOperation::Update => {
				dialect.update_query(&columns, &ctx.table, staging, &ctx.primary_keys, identity)
			}
			MergeOperation::Delete => {
				dialect.delete_query(&ctx.table, staging, &ctx.primary_keys, identity)
			}
		}
	}
}

/// Bulk-operation entry point.
///
/// Owns the two shared, process-lifetime stores: the column cache and the
/// converter registry. Build one engine and share it; every cache entry and
/// converter registered on it is visible to all calls running through it.
/// The engine itself holds no per-call state - concurrent calls on separate
/// connections need no coordination.
#[derive(Default)]
pub struct BulkEngine {
	columns: ColumnCache,
	converters: ConverterRegistry,
}

impl BulkEngine {
	pub fn new() -> Self {
		Self::default()
	}

	/// Converter registry consulted while staging records.
	pub fn converters(&self) -> &ConverterRegistry {
		&self.converters
	}

	/// Introspected column metadata, keyed by `"{database}.{table}"`.
	pub fn column_cache(&self) -> &ColumnCache {
		&self.columns
	}

	/// Stream records straight into the target table with the backend's
	/// native transfer. No staging table, no metadata lookup, no identity
	/// mapping.
	#[instrument(level = "debug", skip_all, fields(rows = records.len()))]
	pub async fn bulk_copy<T, E>(&self, executor: &mut E, records: &[T], options: &MergeOptions) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		let owned = ensure_open(executor).await?;
		let result = self.copy_inner(executor, records, options).await;
		finish(executor, owned, result).await
	}

	/// Insert all records. With an identity column present and identity
	/// mapping on, generated values are written back into records whose
	/// identity field holds its default value, in input order.
	#[instrument(level = "debug", skip_all, fields(rows = records.len()))]
	pub async fn bulk_insert<T, E>(
		&self,
		executor: &mut E,
		records: &mut [T],
		options: &MergeOptions,
	) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		let owned = ensure_open(executor).await?;
		let result = self.merge_mapping_identity(executor, records, options, MergeOperation::Insert).await;
		finish(executor, owned, result).await
	}

	/// Insert records without a primary-key match, update the rest.
	/// Identity mapping covers the inserted subset only.
	#[instrument(level = "debug", skip_all, fields(rows = records.len()))]
	pub async fn bulk_insert_or_update<T, E>(
		&self,
		executor: &mut E,
		records: &mut [T],
		options: &MergeOptions,
	) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		let owned = ensure_open(executor).await?;
		let result = self
			.merge_mapping_identity(executor, records, options, MergeOperation::InsertOrUpdate)
			.await;
		finish(executor, owned, result).await
	}

	/// Update every target row whose primary key matches a record. Rows
	/// without a match are untouched; zero matches is not an error.
	#[instrument(level = "debug", skip_all, fields(rows = records.len()))]
	pub async fn bulk_update<T, E>(&self, executor: &mut E, records: &[T], options: &MergeOptions) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		let owned = ensure_open(executor).await?;
		let result = self.merge_discarding_rows(executor, records, options, MergeOperation::Update).await;
		finish(executor, owned, result).await
	}

	/// Delete every target row whose primary key matches a record.
	#[instrument(level = "debug", skip_all, fields(rows = records.len()))]
	pub async fn bulk_delete<T, E>(&self, executor: &mut E, records: &[T], options: &MergeOptions) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		let owned = ensure_open(executor).await?;
		let result = self.merge_discarding_rows(executor, records, options, MergeOperation::Delete).await;
		finish(executor, owned, result).await
	}

	async fn copy_inner<T, E>(&self, executor: &mut E, records: &[T], options: &MergeOptions) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		let ctx = build_context::<T, E>(&self.columns, executor, options, false).await?;
		let mut cursor = RecordCursor::new(records, &ctx.mapping, &self.converters);
		executor.bulk_write(&ctx.table, &mut cursor, ctx.batch_size, ctx.timeout).await
	}

	async fn merge_mapping_identity<T, E>(
		&self,
		executor: &mut E,
		records: &mut [T],
		options: &MergeOptions,
		operation: MergeOperation,
	) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		let (ctx, rows) = self.run_merge(executor, &*records, options, operation).await?;
		if let Some(mut rows) = rows {
			map_identities(&ctx, rows.as_mut(), records).await?;
		}
		Ok(())
	}

	async fn merge_discarding_rows<T, E>(
		&self,
		executor: &mut E,
		records: &[T],
		options: &MergeOptions,
		operation: MergeOperation,
	) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		self.run_merge(executor, records, options, operation).await.map(|_| ())
	}

	/// States ContextBuilt through ReconciliationStatementExecuted. Returns
	/// the identity readback cursor when the operation produced one.
	async fn run_merge<T, E>(
		&self,
		executor: &mut E,
		records: &[T],
		options: &MergeOptions,
		operation: MergeOperation,
	) -> Result<(MergeContext, Option<Box<dyn RowStream>>)>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		let ctx = build_context::<T, E>(&self.columns, executor, options, true).await?;
		if operation.requires_keys() && ctx.primary_keys.is_empty() {
			return Err(MergeError::NoPrimaryKey {
				table: ctx.table,
			});
		}

		let staging = ctx.staging.clone().unwrap_or_default();

		let ddl = {
			let dialect = executor.dialect();
			let mut ddl = dialect.create_staging_table(&staging, &ctx.table, Some(&ctx.column_names()));
			if let Some(identity) = &ctx.identity {
				ddl.push('\n');
				ddl.push_str(&dialect.widen_identity_column(&staging, identity));
			}
			ddl
		};
		debug!(operation = operation.name(), table = %ctx.table, sql = %ddl, "creating staging table");
		executor.execute(&ddl, ctx.timeout).await?;

		let mut cursor = RecordCursor::new(records, &ctx.mapping, &self.converters);
		executor.bulk_write(&staging, &mut cursor, ctx.batch_size, ctx.timeout).await?;

		let statement = operation.render(executor.dialect(), &ctx);
		debug!(operation = operation.name(), table = %ctx.table, sql = %statement, "reconciling");

		let wants_identity = operation.maps_identity() && ctx.map_identity && ctx.identity.is_some();
		if wants_identity {
			let rows = executor.query(&statement, ctx.timeout).await?;
			Ok((ctx, Some(rows)))
		} else {
			executor.execute(&statement, ctx.timeout).await?;
			Ok((ctx, None))
		}
	}
}

async fn ensure_open<E>(executor: &mut E) -> Result<bool>
where
	E: Executor + ?Sized,
{
	if executor.is_open() {
		Ok(false)
	} else {
		executor.open().await?;
		Ok(true)
	}
}

/// Close the connection when this call opened it, success or abort; a close
/// failure after an abort never masks the original error.
async fn finish<E>(executor: &mut E, owned: bool, result: Result<()>) -> Result<()>
where
	E: Executor + ?Sized,
{
	if owned {
		match &result {
			Ok(()) => executor.close().await?,
			Err(_) => {
				let _ = executor.close().await;
			}
		}
	}
	result
}

/// Assign generated identity values to records still holding the identity
/// kind's default, in input order. Records with a caller-supplied identity
/// are skipped without consuming a cursor row.
async fn map_identities<T: Record>(
	ctx: &MergeContext,
	rows: &mut dyn RowStream,
	records: &mut [T],
) -> Result<()> {
	let Some(identity) = ctx.identity.as_ref() else {
		return Ok(());
	};
	let field = ctx.identity_field().ok_or_else(|| MergeError::UnmappedIdentity {
		column: identity.name.clone(),
		table: ctx.table.clone(),
	})?;

	for record in records.iter_mut() {
		if !record.get(field.name).is_default() {
			continue;
		}
		match rows.next().await? {
			Some(row) => {
				let value = row.into_iter().next().unwrap_or(Value::Null);
				record.set(field.name, value.coerce(field.kind)?);
			}
			None => break,
		}
	}
	Ok(())
}
