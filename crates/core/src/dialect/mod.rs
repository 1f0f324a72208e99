// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! SQL rendering, one implementation per backend.
//!
//! Dialects are pure: given column, table, primary-key and identity facts
//! they produce complete SQL text with identifiers escaped per the backend's
//! quoting rule. They issue nothing themselves.
//!
//! Shared contracts every implementation upholds:
//!
//! - staging-table creation copies structure only, never data;
//! - terminal statements drop the staging table in the same batch, so the
//!   orchestrator never has to remember cleanup on the happy path;
//! - identity readbacks surface generated values in ascending identity
//!   order, which equals staged input order because each backend assigns
//!   identities while scanning the staging table in order;
//! - the insert-or-update readback surfaces identities for the inserted
//!   subset only.

mod mssql;
mod mysql;
mod postgres;

pub use mssql::SqlServerDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

use crate::schema::ColumnInfo;

pub trait Dialect: Send + Sync {
	/// Schema assumed when the caller specifies none.
	fn default_schema(&self) -> Option<&'static str>;

	/// A syntactically valid staging-table name for `table`, unique enough
	/// that concurrent calls cannot collide.
	fn staging_table_name(&self, table: &str) -> String;

	/// DDL creating an empty staging table shaped like `source`, restricted
	/// to `columns` where the backend supports column projection.
	fn create_staging_table(&self, staging: &str, source: &str, columns: Option<&[String]>) -> String;

	/// DDL replacing the staging table's identity column with a plain
	/// column of the same declared type, so the staging table accepts
	/// caller-supplied or absent identity values.
	fn widen_identity_column(&self, staging: &str, identity: &ColumnInfo) -> String;

	/// Copy staged rows into the target. Excludes the identity column from
	/// the inserted column list; when an identity exists, the batch also
	/// returns one generated identity per inserted row.
	fn insert_query(
		&self,
		columns: &[String],
		table: &str,
		staging: &str,
		primary_keys: &[String],
		identity: Option<&ColumnInfo>,
	) -> String;

	/// Update target rows whose primary-key columns match a staged row,
	/// setting all non-key columns from the staged values.
	fn update_query(
		&self,
		columns: &[String],
		table: &str,
		staging: &str,
		primary_keys: &[String],
		identity: Option<&ColumnInfo>,
	) -> String;

	/// Delete target rows whose primary-key columns match a staged row.
	fn delete_query(
		&self,
		table: &str,
		staging: &str,
		primary_keys: &[String],
		identity: Option<&ColumnInfo>,
	) -> String;

	/// For each staged row: update the primary-key match when one exists,
	/// insert otherwise. With an identity present, the batch returns the
	/// generated identities of the inserted subset only.
	fn insert_or_update_query(
		&self,
		columns: &[String],
		table: &str,
		staging: &str,
		primary_keys: &[String],
		identity: Option<&ColumnInfo>,
	) -> String;

	/// The introspection query behind the column cache. Must return one row
	/// per column with exactly four positional fields: name, declared type,
	/// identity flag (0/1), primary-key flag (0/1).
	fn columns_query(&self, database: &str, table: &str) -> String;
}

/// Columns minus the identity column, preserving order.
fn without_identity<'a>(columns: &'a [String], identity: Option<&ColumnInfo>) -> Vec<&'a str> {
	columns
		.iter()
		.map(String::as_str)
		.filter(|c| identity.is_none_or(|id| !c.eq_ignore_ascii_case(&id.name)))
		.collect()
}

/// Columns minus the primary-key columns, preserving order.
fn without_keys<'a>(columns: &[&'a str], primary_keys: &[String]) -> Vec<&'a str> {
	columns
		.iter()
		.copied()
		.filter(|c| !primary_keys.iter().any(|pk| pk.eq_ignore_ascii_case(c)))
		.collect()
}

/// Escape a string for interpolation into a single-quoted SQL literal.
fn escape_literal(raw: &str) -> String {
	raw.replace('\'', "''")
}
