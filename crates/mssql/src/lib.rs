// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! SQL Server executor for bulkmerge.
//!
//! Wraps a `tiberius` client. Staging transfers ride the TDS bulk-load
//! stream (`Client::bulk_insert`); statement batches run as raw ad-hoc
//! batches so the `#`-prefixed staging tables stay visible across the
//! statements of one call - wrapping them in `sp_executesql` would scope
//! the temp table to a single invocation.

mod values;

use std::time::Duration;

use async_trait::async_trait;
use bulkmerge_core::{
	BufferedRows, Dialect, Executor, MergeError, Result, RowSource, RowStream, SqlServerDialect, Value,
};
use futures_util::io::{AsyncRead, AsyncWrite};
use tiberius::Client;
use tracing::trace;

/// [`Executor`] over a live `tiberius` client.
///
/// The client is connected before it gets here; the engine never owns the
/// connection. Transactions are driven through the same client with
/// explicit `BEGIN TRAN` / `COMMIT` batches.
pub struct MssqlExecutor<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send,
{
	client: Client<S>,
	database: String,
}

impl<S> MssqlExecutor<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send,
{
	/// Wrap a connected client. `database` keys the column cache and must
	/// name the database the client is connected to.
	pub fn new(client: Client<S>, database: impl Into<String>) -> Self {
		Self {
			client,
			database: database.into(),
		}
	}

	/// Hand the client back, e.g. to close it cleanly.
	pub fn into_inner(self) -> Client<S> {
		self.client
	}

	async fn run_batch(&mut self, sql: &str) -> Result<Vec<Vec<tiberius::Row>>> {
		let stream = self
			.client
			.simple_query(sql.to_string())
			.await
			.map_err(|e| MergeError::transport("statement execution", e))?;
		stream
			.into_results()
			.await
			.map_err(|e| MergeError::transport("statement execution", e))
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

#[async_trait]
impl<S> Executor for MssqlExecutor<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send,
{
	fn dialect(&self) -> &dyn Dialect {
		&SqlServerDialect
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
			self.run_batch(sql).await?;
			Ok(0)
		})
		.await
	}

	async fn query(&mut self, sql: &str, timeout: Option<Duration>) -> Result<Box<dyn RowStream>> {
		let results = bounded("query execution", timeout, self.run_batch(sql)).await?;
		// The identity readback is the last row-bearing set of its batch
		let rows = results
			.into_iter()
			.filter(|set| !set.is_empty())
			.next_back()
			.unwrap_or_default()
			.into_iter()
			.map(|row| row.into_iter().map(values::from_column_data).collect::<Vec<Value>>())
			.collect();
		Ok(Box::new(BufferedRows::new(rows)))
	}

	async fn bulk_write(
		&mut self,
		destination: &str,
		rows: &mut dyn RowSource,
		_batch_size: usize,
		timeout: Option<Duration>,
	) -> Result<()> {
		trace!(destination, "starting tds bulk load");
		bounded("bulk transfer", timeout, async {
			let mut request = self
				.client
				.bulk_insert(destination)
				.await
				.map_err(|e| MergeError::transport("bulk transfer", e))?;

			let width = rows.columns().len();
			while rows.advance() {
				let mut token_row = tiberius::TokenRow::new();
				for index in 0..width {
					token_row.push(values::to_column_data(rows.value(index)?, rows.kind(index)));
				}
				request.send(token_row).await.map_err(|e| MergeError::transport("bulk transfer", e))?;
			}
			request.finalize().await.map_err(|e| MergeError::transport("bulk transfer", e))?;
			Ok(())
		})
		.await
	}
}
