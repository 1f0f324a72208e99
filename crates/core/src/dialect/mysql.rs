// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

use uuid::Uuid;

use super::{Dialect, escape_literal, without_identity, without_keys};
use crate::schema::ColumnInfo;

/// Identifier length cap; staging names are truncated to stay below it.
const MAX_IDENTIFIER_LEN: usize = 63;

/// MySQL dialect.
///
/// MySQL has no `MERGE` and no `RETURNING`; the upsert rides on
/// `ON DUPLICATE KEY UPDATE` and identity readback scans the
/// `LAST_INSERT_ID()` range captured while both tables are locked. That
/// range is contiguous and ascending only under consecutive identity
/// allocation, which the surrounding `LOCK TABLES` guarantees.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

fn quote(ident: &str) -> String {
	format!("`{}`", ident.replace('`', "``"))
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

fn identity_readback(table: &str, staging: &str, identity: &ColumnInfo) -> String {
	format!(
		"SET @row_count = ROW_COUNT();\nSET @last_insert_id = LAST_INSERT_ID();\nUNLOCK TABLES;\nSELECT {id} FROM {table} WHERE {id} >= @last_insert_id AND {id} <= @last_insert_id + (@row_count - 1) ORDER BY {id} ASC;\nDROP TABLE {staging}",
		id = quote(&identity.name),
		table = quote(table),
		staging = quote(staging),
	)
}

impl Dialect for MySqlDialect {
	fn default_schema(&self) -> Option<&'static str> {
		None
	}

	fn staging_table_name(&self, table: &str) -> String {
		let name = format!("{table}_{}", Uuid::new_v4().simple());
		if name.chars().count() >= MAX_IDENTIFIER_LEN {
			name.chars().take(MAX_IDENTIFIER_LEN).collect()
		} else {
			name
		}
	}

	fn create_staging_table(&self, staging: &str, source: &str, _columns: Option<&[String]>) -> String {
		format!(
			"CREATE TEMPORARY TABLE IF NOT EXISTS {} AS (SELECT * FROM {} WHERE 1 = 0);",
			quote(staging),
			quote(source)
		)
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
			"INSERT INTO {table} ({insertable})\nSELECT {insertable} FROM {staging};",
			table = quote(table),
			staging = quote(staging),
		);
		match identity {
			Some(identity) => format!(
				"LOCK TABLES {staging} READ, {table} WRITE;\n{insert_clause}\n{readback}",
				staging = quote(staging),
				table = quote(table),
				readback = identity_readback(table, staging, identity),
			),
			None => format!("{insert_clause}\nDROP TABLE {}", quote(staging)),
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
		let sets = assignable
			.iter()
			.map(|c| format!("{table}.{col} = {staging}.{col}", table = quote(table), staging = quote(staging), col = quote(c)))
			.collect::<Vec<_>>()
			.join(",");
		format!(
			"UPDATE {table} INNER JOIN {staging} ON ({keys})\nSET {sets};\nDROP TABLE {staging}",
			table = quote(table),
			staging = quote(staging),
			keys = key_match(primary_keys, &quote(table), &quote(staging)),
			sets = sets,
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
			"DELETE {table}\nFROM {table}\nINNER JOIN {staging} ON ({keys});\nDROP TABLE {staging}",
			table = quote(table),
			staging = quote(staging),
			keys = key_match(primary_keys, &quote(table), &quote(staging)),
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
		// Unlike the other backends the full column list stays, identity
		// included: staged identity values are what ON DUPLICATE KEY matches
		// against for pre-assigned rows.
		let all = columns.iter().map(String::as_str).collect::<Vec<_>>();
		let column_list = quoted_list(&all);
		let assignable = without_keys(&all, primary_keys);
		let sets = assignable
			.iter()
			.map(|c| format!("{table}.{col} = {staging}.{col}", table = quote(table), staging = quote(staging), col = quote(c)))
			.collect::<Vec<_>>()
			.join(",");
		let upsert_clause = format!(
			"INSERT INTO {table} ({column_list}) SELECT {column_list} FROM {staging}\nON DUPLICATE KEY UPDATE {sets};",
			table = quote(table),
			staging = quote(staging),
		);
		match identity {
			Some(identity) => format!(
				"LOCK TABLES {staging} READ, {table} WRITE;\n{upsert_clause}\n{readback}",
				staging = quote(staging),
				table = quote(table),
				readback = identity_readback(table, staging, identity),
			),
			None => format!("{upsert_clause}\nDROP TABLE {}", quote(staging)),
		}
	}

	fn columns_query(&self, database: &str, table: &str) -> String {
		format!(
			r#"SELECT
    c.COLUMN_NAME,
    c.DATA_TYPE,
    CASE
        WHEN c.EXTRA LIKE '%auto_increment%' THEN 1
        ELSE 0
    END AS is_identity,
    CASE
        WHEN k.CONSTRAINT_NAME = 'PRIMARY' THEN 1
        ELSE 0
    END AS is_primary_key
FROM INFORMATION_SCHEMA.COLUMNS c
LEFT JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE k
    ON c.TABLE_SCHEMA = k.TABLE_SCHEMA
   AND c.TABLE_NAME = k.TABLE_NAME
   AND c.COLUMN_NAME = k.COLUMN_NAME
   AND k.CONSTRAINT_NAME = 'PRIMARY'
WHERE c.TABLE_SCHEMA = '{}'
  AND c.TABLE_NAME = '{}'
ORDER BY c.ORDINAL_POSITION;"#,
			escape_literal(database),
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
	fn staging_name_respects_identifier_cap() {
		let d = MySqlDialect;
		let long = "t".repeat(80);
		let name = d.staging_table_name(&long);
		assert!(name.len() < 64);

		let short = d.staging_table_name("Person");
		assert!(short.starts_with("Person_"));
	}

	#[test]
	fn create_staging_copies_structure_only() {
		let d = MySqlDialect;
		let sql = d.create_staging_table("Person_x", "Person", None);
		assert_eq!(
			sql,
			"CREATE TEMPORARY TABLE IF NOT EXISTS `Person_x` AS (SELECT * FROM `Person` WHERE 1 = 0);"
		);
	}

	#[test]
	fn insert_with_identity_locks_and_scans_id_range() {
		let d = MySqlDialect;
		let sql = d.insert_query(&columns(), "Person", "Person_x", &["Id".into()], Some(&identity()));
		assert!(sql.starts_with("LOCK TABLES `Person_x` READ, `Person` WRITE;"));
		assert!(sql.contains("INSERT INTO `Person` (`Name`,`Age`)"));
		assert!(sql.contains("SET @last_insert_id = LAST_INSERT_ID();"));
		assert!(sql.contains("UNLOCK TABLES;"));
		assert!(sql.contains("`Id` >= @last_insert_id AND `Id` <= @last_insert_id + (@row_count - 1)"));
		assert!(sql.ends_with("DROP TABLE `Person_x`"));
	}

	#[test]
	fn insert_without_identity_skips_lock_protocol() {
		let d = MySqlDialect;
		let sql = d.insert_query(&columns()[1..].to_vec(), "Person", "Person_x", &[], None);
		assert!(!sql.contains("LOCK TABLES"));
		assert!(sql.ends_with("DROP TABLE `Person_x`"));
	}

	#[test]
	fn upsert_keeps_identity_in_column_list() {
		let d = MySqlDialect;
		let sql = d.insert_or_update_query(&columns(), "Person", "Person_x", &["Id".into()], Some(&identity()));
		// Staged identities drive duplicate-key matching
		assert!(sql.contains("INSERT INTO `Person` (`Id`,`Name`,`Age`)"));
		assert!(sql.contains("ON DUPLICATE KEY UPDATE `Person`.`Name` = `Person_x`.`Name`"));
		assert!(sql.ends_with("DROP TABLE `Person_x`"));
	}

	#[test]
	fn update_joins_on_keys() {
		let d = MySqlDialect;
		let sql = d.update_query(&columns(), "Person", "Person_x", &["Id".into()], Some(&identity()));
		assert!(sql.contains("UPDATE `Person` INNER JOIN `Person_x` ON (`Person`.`Id` = `Person_x`.`Id`)"));
		assert!(sql.contains("SET `Person`.`Name` = `Person_x`.`Name`,`Person`.`Age` = `Person_x`.`Age`"));
	}

	#[test]
	fn delete_removes_matches_only() {
		let d = MySqlDialect;
		let sql = d.delete_query("Person", "Person_x", &["Id".into()], None);
		assert_eq!(
			sql,
			"DELETE `Person`\nFROM `Person`\nINNER JOIN `Person_x` ON (`Person`.`Id` = `Person_x`.`Id`);\nDROP TABLE `Person_x`"
		);
	}

	#[test]
	fn columns_query_filters_by_database_and_table() {
		let d = MySqlDialect;
		let sql = d.columns_query("app", "Person");
		assert!(sql.contains("WHERE c.TABLE_SCHEMA = 'app'"));
		assert!(sql.contains("AND c.TABLE_NAME = 'Person'"));
	}
}
