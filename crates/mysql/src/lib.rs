// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! MySQL executor for bulkmerge.
//!
//! Wraps a `mysql_async` connection. Staging transfers run as multi-row
//! `INSERT` batches of the configured batch size; `LOAD DATA LOCAL INFILE`
//! needs `local_infile` enabled server-side, which most managed MySQL
//! offerings refuse, so the batched insert is the portable fast path.
//!
//! The reconciliation batches the MySQL dialect renders contain several
//! statements (`LOCK TABLES`, the merge, the identity range scan); the
//! wrapped connection must allow multi-statement text queries.

mod encode;

use std::time::Duration;

use async_trait::async_trait;
use bulkmerge_core::{
	BufferedRows, Dialect, Executor, MergeError, MySqlDialect, Result, RowSource, RowStream, Value,
};
use futures_util::TryStreamExt;
use mysql_async::{Conn, prelude::Queryable};
use tracing::trace;

/// [`Executor`] over a live `mysql_async` connection.
///
/// The connection is established before it gets here; the engine never owns
/// it. To run inside a transaction, start one on the connection before the
/// call and commit after it returns.
pub struct MySqlExecutor {
	conn: Conn,
	database: String,
}

impl MySqlExecutor {
	/// Wrap a connection. `database` keys the column cache and feeds the
	/// dialect's introspection query; it must name the schema the
	/// connection uses.
	pub fn new(conn: Conn, database: impl Into<String>) -> Self {
		Self {
			conn,
			database: database.into(),
		}
	}

	/// Hand the connection back, e.g. to disconnect cleanly.
	pub fn into_inner(self) -> Conn {
		self.conn
	}
}

async fn bounded<F, T>(operation: &'static str, timeout: Option<Duration>, fut: F) -> Result<T>
where
	F: std::future::Future<Output = Result<T>>,
{
	match timeout {
		Some(limit) => match tokio::time::timeout(limit, fut).await {
			Ok(result) => result,
			Err(_) => Err(MergeError::Timeout {
				operation,
			}),
		},
		None => fut.await,
	}
}

fn from_mysql(value: mysql_async::Value) -> Value {
	use mysql_async::Value as My;
	match value {
		My::NULL => Value::Null,
		// The text protocol surfaces strings and numbers as bytes
		My::Bytes(bytes) => Value::Text(String::from_utf8_lossy(&bytes).into_owned()),
		My::Int(v) => Value::Int64(v),
		My::UInt(v) => i64::try_from(v).map(Value::Int64).unwrap_or(Value::Null),
		My::Float(v) => Value::Float64(f64::from(v)),
		My::Double(v) => Value::Float64(v),
		other => Value::Text(other.as_sql(true)),
	}
}

#[async_trait]
impl Executor for MySqlExecutor {
	fn dialect(&self) -> &dyn Dialect {
		&MySqlDialect
	}

	fn database(&self) -> &str {
		&self.database
	}

	fn is_open(&self) -> bool {
		true
	}

	async fn open(&mut self) -> Result<()> {
		Ok(())
	}

	async fn close(&mut self) -> Result<()> {
		Ok(())
	}

	async fn execute(&mut self, sql: &str, timeout: Option<Duration>) -> Result<u64> {
		bounded("statement execution", timeout, async {
			self.conn
				.query_drop(sql)
				.await
				.map_err(|e| MergeError::transport("statement execution", e))?;
			Ok(self.conn.affected_rows())
		})
		.await
	}

	async fn query(&mut self, sql: &str, timeout: Option<Duration>) -> Result<Box<dyn RowStream>> {
		let rows = bounded("query execution", timeout, async {
			let mut result = self
				.conn
				.query_iter(sql)
				.await
				.map_err(|e| MergeError::transport("query execution", e))?;

			// Keep the rows of the last set that produced any; the identity
			// readback is the final SELECT of its batch
			let mut last: Vec<Vec<Value>> = Vec::new();
			while let Some(stream) = result
				.stream::<mysql_async::Row>()
				.await
				.map_err(|e| MergeError::transport("query execution", e))?
			{
				let rows: Vec<mysql_async::Row> = stream
					.try_collect()
					.await
					.map_err(|e| MergeError::transport("query execution", e))?;
				if !rows.is_empty() {
					last = rows
						.into_iter()
						.map(|row| row.unwrap().into_iter().map(from_mysql).collect())
						.collect();
				}
			}
			Ok(last)
		})
		.await?;
		Ok(Box::new(BufferedRows::new(rows)))
	}

	async fn bulk_write(
		&mut self,
		destination: &str,
		rows: &mut dyn RowSource,
		batch_size: usize,
		timeout: Option<Duration>,
	) -> Result<()> {
		let prefix = encode::insert_prefix(destination, rows.columns());
		trace!(destination, batch_size, "staging via batched inserts");

		bounded("bulk transfer", timeout, async {
			let width = rows.columns().len();
			let mut tuples: Vec<String> = Vec::with_capacity(batch_size);
			loop {
				let advanced = rows.advance();
				if advanced {
					tuples.push(encode::row_tuple(rows, width)?);
				}
				if tuples.len() >= batch_size || (!advanced && !tuples.is_empty()) {
					let statement = format!("{prefix} VALUES {}", tuples.join(","));
					self.conn
						.query_drop(&statement)
						.await
						.map_err(|e| MergeError::transport("bulk transfer", e))?;
					tuples.clear();
				}
				if !advanced {
					break;
				}
			}
			Ok(())
		})
		.await
	}
}
