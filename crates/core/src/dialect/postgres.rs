// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

use uuid::Uuid;

use super::{Dialect, escape_literal, without_identity, without_keys};
use crate::schema::ColumnInfo;

/// PostgreSQL dialect.
///
/// Staging tables are session-scoped temporaries (`SELECT * INTO TEMP`), so
/// a crash between staging and reconciliation leaks the table only until the
/// session ends. Identity readbacks go through `RETURNING` CTEs ordered by
/// the identity column.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

fn quote(ident: &str) -> String {
	format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quoted_list(columns: &[&str]) -> String {
	columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(",")
}

fn key_match(primary_keys: &[String], target: &str, source: &str) -> String {
	primary_keys
		.iter()
		.map(|pk| format!("{target}.{pk} = {source}.{pk}", pk = quote(pk)))
		.collect::<Vec<_>>()
		.join(" AND ")
}

fn set_list(columns: &[&str], source: &str) -> String {
	columns
		.iter()
		.map(|c| format!("{col} = {source}.{col}", col = quote(c)))
		.collect::<Vec<_>>()
		.join(",")
}

impl Dialect for PostgresDialect {
	fn default_schema(&self) -> Option<&'static str> {
		Some("public")
	}

	fn staging_table_name(&self, table: &str) -> String {
		format!("{table}_{}", Uuid::new_v4().simple())
	}

	fn create_staging_table(&self, staging: &str, source: &str, _columns: Option<&[String]>) -> String {
		format!("SELECT * INTO TEMP {} FROM {} WHERE 1 = 0;", quote(staging), quote(source))
	}

	fn widen_identity_column(&self, staging: &str, identity: &ColumnInfo) -> String {
		format!(
			"ALTER TABLE {staging} DROP COLUMN {column};\nALTER TABLE {staging} ADD {column} {ty}",
			staging = quote(staging),
			column = quote(&identity.name),
			ty = identity.declared_type,
		)
	}

	fn insert_query(
		&self,
		columns: &[String],
		table: &str,
		staging: &str,
		_primary_keys: &[String],
		identity: Option<&ColumnInfo>,
	) -> String {
		let insertable = quoted_list(&without_identity(columns, identity));
		let insert_clause = format!(
			"INSERT INTO {table} ({insertable})\nSELECT {insertable} FROM {staging}",
			table = quote(table),
			staging = quote(staging),
		);
		match identity {
			Some(identity) => {
				let id = quote(&identity.name);
				format!(
					"WITH \"inserted\" AS ({insert_clause}\nRETURNING {id})\nSELECT {id} FROM \"inserted\" ORDER BY {id} ASC;\nDROP TABLE {staging}",
					staging = quote(staging),
				)
			}
			None => format!("{insert_clause};\nDROP TABLE {}", quote(staging)),
		}
	}

	fn update_query(
		&self,
		columns: &[String],
		table: &str,
		staging: &str,
		primary_keys: &[String],
		identity: Option<&ColumnInfo>,
	) -> String {
		let assignable = without_keys(&without_identity(columns, identity), primary_keys);
		format!(
			"UPDATE {table} AS d\nSET {sets}\nFROM {staging} AS s\nWHERE {keys};\nDROP TABLE {staging}",
			table = quote(table),
			staging = quote(staging),
			sets = set_list(&assignable, "s"),
			keys = key_match(primary_keys, "d", "s"),
		)
	}

	fn delete_query(
		&self,
		table: &str,
		staging: &str,
		primary_keys: &[String],
		_identity: Option<&ColumnInfo>,
	) -> String {
		format!(
			"DELETE FROM {table} AS d\nUSING {staging} AS s\nWHERE {keys};\nDROP TABLE {staging}",
			table = quote(table),
			staging = quote(staging),
			keys = key_match(primary_keys, "d", "s"),
		)
	}

	fn insert_or_update_query(
		&self,
		columns: &[String],
		table: &str,
		staging: &str,
		primary_keys: &[String],
		identity: Option<&ColumnInfo>,
	) -> String {
		let insertable = without_identity(columns, identity);
		let assignable = without_keys(&insertable, primary_keys);
		let insert_list = quoted_list(&insertable);

		// Update the matches and remove them from staging, then insert what
		// remains. Runs as one batch; the two statements see the same
		// session-scoped staging table.
		let update_phase = format!(
			"WITH \"updated\" AS (UPDATE {table} AS d\nSET {sets}\nFROM {staging} AS s\nWHERE {keys}\nRETURNING {returning})\nDELETE FROM {staging} AS d\nUSING \"updated\" AS s WHERE {keys};",
			table = quote(table),
			staging = quote(staging),
			sets = set_list(&assignable, "s"),
			keys = key_match(primary_keys, "d", "s"),
			returning = primary_keys.iter().map(|pk| format!("d.{}", quote(pk))).collect::<Vec<_>>().join(","),
		);
		let insert_clause = format!(
			"INSERT INTO {table} ({insert_list})\nSELECT {insert_list} FROM {staging}",
			table = quote(table),
			staging = quote(staging),
		);
		match identity {
			Some(identity) => {
				let id = quote(&identity.name);
				format!(
					"{update_phase}\nWITH \"inserted\" AS ({insert_clause}\nRETURNING {id})\nSELECT {id} FROM \"inserted\" ORDER BY {id} ASC;\nDROP TABLE {staging}",
					staging = quote(staging),
				)
			}
			None => format!("{update_phase}\n{insert_clause};\nDROP TABLE {}", quote(staging)),
		}
	}

	fn columns_query(&self, _database: &str, table: &str) -> String {
		format!(
			r#"SELECT
    c.column_name,
    c.data_type,
    CASE
        WHEN c.column_default LIKE 'nextval%' THEN 1
        WHEN c.is_identity = 'YES' THEN 1
        ELSE 0
    END AS is_identity,
    CASE
        WHEN pk.column_name IS NOT NULL THEN 1
        ELSE 0
    END AS is_primary_key
FROM information_schema.columns c
LEFT JOIN (
    SELECT kcu.table_name, kcu.column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND tc.table_schema = 'public'
) pk
  ON c.table_name = pk.table_name
  AND c.column_name = pk.column_name
WHERE c.table_name = '{}'
ORDER BY c.ordinal_position;"#,
			escape_literal(table)
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn identity() -> ColumnInfo {
		ColumnInfo {
			name: "Id".into(),
			declared_type: "bigint".into(),
			is_identity: true,
			is_primary_key: true,
		}
	}

	fn columns() -> Vec<String> {
		vec!["Id".into(), "Name".into(), "Age".into()]
	}

	#[test]
	fn staging_names_are_unique() {
		let d = PostgresDialect;
		let a = d.staging_table_name("Person");
		let b = d.staging_table_name("Person");
		assert_ne!(a, b);
		assert!(a.starts_with("Person_"));
	}

	#[test]
	fn create_staging_copies_structure_only() {
		let d = PostgresDialect;
		let sql = d.create_staging_table("Person_x", "Person", None);
		assert_eq!(sql, "SELECT * INTO TEMP \"Person_x\" FROM \"Person\" WHERE 1 = 0;");
	}

	#[test]
	fn widen_identity_drops_and_readds() {
		let d = PostgresDialect;
		let sql = d.widen_identity_column("Person_x", &identity());
		assert_eq!(
			sql,
			"ALTER TABLE \"Person_x\" DROP COLUMN \"Id\";\nALTER TABLE \"Person_x\" ADD \"Id\" bigint"
		);
	}

	#[test]
	fn insert_with_identity_returns_ordered_ids_and_drops_staging() {
		let d = PostgresDialect;
		let sql = d.insert_query(&columns(), "Person", "Person_x", &["Id".into()], Some(&identity()));
		assert!(sql.contains("WITH \"inserted\" AS (INSERT INTO \"Person\" (\"Name\",\"Age\")"));
		assert!(sql.contains("RETURNING \"Id\""));
		assert!(sql.contains("ORDER BY \"Id\" ASC"));
		assert!(sql.ends_with("DROP TABLE \"Person_x\""));
		// Identity never appears in the inserted column list
		assert!(!sql.contains("(\"Id\",\"Name\",\"Age\")"));
	}

	#[test]
	fn insert_without_identity_still_drops_staging() {
		let d = PostgresDialect;
		let sql = d.insert_query(&columns()[1..].to_vec(), "Person", "Person_x", &[], None);
		assert!(sql.starts_with("INSERT INTO \"Person\" (\"Name\",\"Age\")"));
		assert!(sql.ends_with("DROP TABLE \"Person_x\""));
	}

	#[test]
	fn update_joins_staging_on_keys() {
		let d = PostgresDialect;
		let sql = d.update_query(&columns(), "Person", "Person_x", &["Id".into()], Some(&identity()));
		assert!(sql.starts_with("UPDATE \"Person\" AS d"));
		assert!(sql.contains("SET \"Name\" = s.\"Name\",\"Age\" = s.\"Age\""));
		assert!(sql.contains("WHERE d.\"Id\" = s.\"Id\""));
		assert!(sql.ends_with("DROP TABLE \"Person_x\""));
	}

	#[test]
	fn delete_matches_on_keys_only() {
		let d = PostgresDialect;
		let sql = d.delete_query("Person", "Person_x", &["Id".into()], None);
		assert_eq!(
			sql,
			"DELETE FROM \"Person\" AS d\nUSING \"Person_x\" AS s\nWHERE d.\"Id\" = s.\"Id\";\nDROP TABLE \"Person_x\""
		);
	}

	#[test]
	fn upsert_updates_matches_then_inserts_remainder() {
		let d = PostgresDialect;
		let sql = d.insert_or_update_query(&columns(), "Person", "Person_x", &["Id".into()], Some(&identity()));
		let update_pos = sql.find("WITH \"updated\"").unwrap();
		let insert_pos = sql.find("WITH \"inserted\"").unwrap();
		assert!(update_pos < insert_pos);
		// Matched rows leave staging before the insert phase
		assert!(sql.contains("DELETE FROM \"Person_x\" AS d\nUSING \"updated\""));
		assert!(sql.contains("ORDER BY \"Id\" ASC"));
		assert!(sql.ends_with("DROP TABLE \"Person_x\""));
	}

	#[test]
	fn upsert_without_identity_has_no_readback() {
		let d = PostgresDialect;
		let sql = d.insert_or_update_query(&columns(), "Person", "Person_x", &["Id".into()], None);
		assert!(!sql.contains("RETURNING \"Id\""));
		assert!(sql.ends_with("DROP TABLE \"Person_x\""));
	}

	#[test]
	fn columns_query_escapes_table_literal() {
		let d = PostgresDialect;
		let sql = d.columns_query("app", "per'son");
		assert!(sql.contains("WHERE c.table_name = 'per''son'"));
	}
}
