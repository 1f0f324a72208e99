// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

use super::{Dialect, escape_literal, without_identity, without_keys};
use crate::schema::ColumnInfo;

/// SQL Server dialect.
///
/// Staging tables are `#`-prefixed, connection-scoped temporaries, so even a
/// crashed call cannot leak one past its session. Reconciliation uses
/// `MERGE`; identity readback routes `OUTPUT inserted` rows through a table
/// variable and selects them in ascending identity order.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerDialect;

fn quote(ident: &str) -> String {
	format!("[{}]", ident.replace(']', "]]"))
}

fn quoted_list(columns: &[&str]) -> String {
	columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(",")
}

fn key_match(primary_keys: &[String]) -> String {
	primary_keys
		.iter()
		.map(|pk| format!("S.{pk} = T.{pk}", pk = quote(pk)))
		.collect::<Vec<_>>()
		.join(" AND ")
}

fn set_list(columns: &[&str]) -> String {
	columns
		.iter()
		.map(|c| format!("T.{col} = S.{col}", col = quote(c)))
		.collect::<Vec<_>>()
		.join(",")
}

impl Dialect for SqlServerDialect {
	fn default_schema(&self) -> Option<&'static str> {
		Some("dbo")
	}

	fn staging_table_name(&self, table: &str) -> String {
		format!("#{table}")
	}

	fn create_staging_table(&self, staging: &str, source: &str, columns: Option<&[String]>) -> String {
		let projection = match columns {
			Some(columns) => {
				let refs = columns.iter().map(String::as_str).collect::<Vec<_>>();
				quoted_list(&refs)
			}
			None => "*".to_string(),
		};
		format!(
			"SELECT {projection} INTO {staging} FROM {source} WITH(READUNCOMMITTED) WHERE 1 = 0",
			source = quote(source),
		)
	}

	fn widen_identity_column(&self, staging: &str, identity: &ColumnInfo) -> String {
		// A table must keep at least one column at all times, hence the
		// throwaway placeholder around the drop/re-add.
		let column = quote(&identity.name);
		let placeholder = quote(&format!("_widen_{}", identity.name));
		format!(
			"ALTER TABLE {staging} ADD {placeholder} BIT\nALTER TABLE {staging} DROP COLUMN {column}\nALTER TABLE {staging} ADD {column} {ty}\nALTER TABLE {staging} DROP COLUMN {placeholder}",
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
		match identity {
			Some(identity) => {
				let id = quote(&identity.name);
				format!(
					"DECLARE @Id TABLE ([Id] {ty})\nINSERT INTO {table}({insertable})\nOUTPUT inserted.{id} INTO @Id\nSELECT {insertable} FROM {staging}\nSELECT [Id] FROM @Id ORDER BY [Id] ASC\nDROP TABLE {staging}",
					ty = identity.declared_type,
					table = quote(table),
				)
			}
			None => format!(
				"INSERT INTO {table}({insertable})\nSELECT {insertable} FROM {staging}\nDROP TABLE {staging}",
				table = quote(table),
			),
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
			"MERGE {table} AS T\nUSING (SELECT * FROM {staging}) AS S\nON ({keys})\nWHEN MATCHED\nTHEN UPDATE SET {sets};\nDROP TABLE {staging}",
			table = quote(table),
			keys = key_match(primary_keys),
			sets = set_list(&assignable),
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
			"MERGE {table} AS T\nUSING (SELECT * FROM {staging}) AS S\nON ({keys})\nWHEN MATCHED\nTHEN DELETE;\nDROP TABLE {staging}",
			table = quote(table),
			keys = key_match(primary_keys),
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
		let column_list = quoted_list(&insertable);
		let merge = format!(
			"MERGE {table} AS T\nUSING {staging} AS S\nON ({keys})\nWHEN NOT MATCHED\nTHEN INSERT ({column_list}) VALUES ({column_list})\nWHEN MATCHED\nTHEN UPDATE SET {sets}",
			table = quote(table),
			staging = quote(staging),
			keys = key_match(primary_keys),
			sets = set_list(&assignable),
		);
		match identity {
			Some(identity) => {
				let id = quote(&identity.name);
				format!(
					"DECLARE @Id TABLE ([Action] VARCHAR(20), [Id] {ty})\n{merge}\nOUTPUT $action, inserted.{id} INTO @Id ([Action], [Id]);\nSELECT [Id] FROM @Id WHERE [Action] = 'INSERT' ORDER BY [Id] ASC\nDROP TABLE {staging}",
					ty = identity.declared_type,
				)
			}
			None => format!("{merge};\nDROP TABLE {staging}"),
		}
	}

	fn columns_query(&self, _database: &str, table: &str) -> String {
		format!(
			r#"SELECT
    c.name AS column_name,
    t.name AS data_type,
    CASE WHEN c.is_identity = 1 THEN 1 ELSE 0 END AS is_identity,
    COALESCE(i.is_primary_key, 0) AS is_primary_key
FROM sys.columns c
JOIN sys.types t ON c.user_type_id = t.user_type_id
LEFT JOIN sys.index_columns ic
    ON c.object_id = ic.object_id AND c.column_id = ic.column_id
LEFT JOIN sys.indexes i
    ON ic.object_id = i.object_id AND ic.index_id = i.index_id AND i.is_primary_key = 1
JOIN sys.objects o ON c.object_id = o.object_id
WHERE o.type = 'U'
  AND o.name = '{}'
ORDER BY c.column_id"#,
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
	fn staging_table_is_session_scoped() {
		let d = SqlServerDialect;
		assert_eq!(d.staging_table_name("Person"), "#Person");
	}

	#[test]
	fn create_staging_projects_mapped_columns() {
		let d = SqlServerDialect;
		let sql = d.create_staging_table("#Person", "Person", Some(&columns()));
		assert_eq!(
			sql,
			"SELECT [Id],[Name],[Age] INTO #Person FROM [Person] WITH(READUNCOMMITTED) WHERE 1 = 0"
		);
	}

	#[test]
	fn widen_identity_keeps_table_nonempty_throughout() {
		let d = SqlServerDialect;
		let sql = d.widen_identity_column("#Person", &identity());
		let add_placeholder = sql.find("ADD [_widen_Id] BIT").unwrap();
		let drop_identity = sql.find("DROP COLUMN [Id]").unwrap();
		let add_plain = sql.find("ADD [Id] bigint").unwrap();
		let drop_placeholder = sql.find("DROP COLUMN [_widen_Id]").unwrap();
		assert!(add_placeholder < drop_identity);
		assert!(drop_identity < add_plain);
		assert!(add_plain < drop_placeholder);
	}

	#[test]
	fn insert_with_identity_outputs_into_table_variable() {
		let d = SqlServerDialect;
		let sql = d.insert_query(&columns(), "Person", "#Person", &["Id".into()], Some(&identity()));
		assert!(sql.starts_with("DECLARE @Id TABLE ([Id] bigint)"));
		assert!(sql.contains("INSERT INTO [Person]([Name],[Age])"));
		assert!(sql.contains("OUTPUT inserted.[Id] INTO @Id"));
		assert!(sql.contains("SELECT [Id] FROM @Id ORDER BY [Id] ASC"));
		assert!(sql.ends_with("DROP TABLE #Person"));
	}

	#[test]
	fn upsert_merges_and_reads_back_inserted_subset_only() {
		let d = SqlServerDialect;
		let sql = d.insert_or_update_query(&columns(), "Person", "#Person", &["Id".into()], Some(&identity()));
		assert!(sql.contains("MERGE [Person] AS T"));
		assert!(sql.contains("WHEN NOT MATCHED\nTHEN INSERT ([Name],[Age]) VALUES ([Name],[Age])"));
		assert!(sql.contains("WHEN MATCHED\nTHEN UPDATE SET T.[Name] = S.[Name],T.[Age] = S.[Age]"));
		assert!(sql.contains("OUTPUT $action, inserted.[Id] INTO @Id ([Action], [Id]);"));
		assert!(sql.contains("WHERE [Action] = 'INSERT' ORDER BY [Id] ASC"));
		assert!(sql.ends_with("DROP TABLE #Person"));
	}

	#[test]
	fn upsert_without_identity_terminates_merge_and_drops() {
		let d = SqlServerDialect;
		let sql = d.insert_or_update_query(&columns(), "Person", "#Person", &["Id".into()], None);
		assert!(!sql.contains("DECLARE @Id"));
		assert!(sql.contains("THEN UPDATE SET T.[Name] = S.[Name],T.[Age] = S.[Age];"));
		assert!(sql.ends_with("DROP TABLE #Person"));
	}

	#[test]
	fn update_and_delete_use_merge_matching() {
		let d = SqlServerDialect;
		let update = d.update_query(&columns(), "Person", "#Person", &["Id".into()], None);
		assert!(update.contains("ON (S.[Id] = T.[Id])"));
		assert!(update.contains("WHEN MATCHED\nTHEN UPDATE SET"));

		let delete = d.delete_query("Person", "#Person", &["Id".into()], None);
		assert!(delete.contains("WHEN MATCHED\nTHEN DELETE;"));
		assert!(delete.ends_with("DROP TABLE #Person"));
	}

	#[test]
	fn columns_query_targets_user_table() {
		let d = SqlServerDialect;
		let sql = d.columns_query("app", "Person");
		assert!(sql.contains("WHERE o.type = 'U'"));
		assert!(sql.contains("AND o.name = 'Person'"));
	}
}
