// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! PostgreSQL executor for bulkmerge.
//!
//! Wraps a `tokio-postgres` client or transaction. Staging transfers go
//! through `COPY ... FROM STDIN` in text format; statement batches run over
//! the simple protocol, which executes multi-statement reconciliation
//! batches in one round trip and surfaces readback rows as text.
//!
//! The wrapped handle is connected before it gets here, so the engine never
//! owns the connection; dropping the client closes it.

mod copy;

use std::time::Duration;

use async_trait::async_trait;
use bulkmerge_core::{
	BufferedRows, Dialect, Executor, MergeError, PostgresDialect, Result, RowSource, RowStream, Value,
};
use bytes::Bytes;
use futures_util::SinkExt;
use tokio_postgres::{Client, SimpleQueryMessage, Transaction};
use tracing::trace;

enum PgHandle<'a> {
	Client(&'a Client),
	Transaction(&'a Transaction<'a>),
}

/// [`Executor`] over a live `tokio-postgres` handle.
pub struct PgExecutor<'a> {
	handle: PgHandle<'a>,
	database: String,
}

impl<'a> PgExecutor<'a> {
	/// Wrap a connected client. `database` keys the column cache and must
	/// name the database the client is connected to.
	pub fn new(client: &'a Client, database: impl Into<String>) -> Self {
		Self {
			handle: PgHandle::Client(client),
			database: database.into(),
		}
	}

	/// Wrap an open transaction; every statement and transfer issued by the
	/// engine joins it.
	pub fn with_transaction(transaction: &'a Transaction<'a>, database: impl Into<String>) -> Self {
		Self {
			handle: PgHandle::Transaction(transaction),
			database: database.into(),
		}
	}

	async fn batch_execute(&self, sql: &str) -> std::result::Result<(), tokio_postgres::Error> {
		match &self.handle {
			PgHandle::Client(client) => client.batch_execute(sql).await,
			PgHandle::Transaction(transaction) => transaction.batch_execute(sql).await,
		}
	}

	async fn simple_query(
		&self,
		sql: &str,
	) -> std::result::Result<Vec<SimpleQueryMessage>, tokio_postgres::Error> {
		match &self.handle {
			PgHandle::Client(client) => client.simple_query(sql).await,
			PgHandle::Transaction(transaction) => transaction.simple_query(sql).await,
		}
	}

	async fn copy_in(
		&self,
		sql: &str,
	) -> std::result::Result<tokio_postgres::CopyInSink<Bytes>, tokio_postgres::Error> {
		match &self.handle {
			PgHandle::Client(client) => client.copy_in(sql).await,
			PgHandle::Transaction(transaction) => transaction.copy_in(sql).await,
		}
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

/// Split simple-protocol messages into result sets and keep the rows of the
/// last set that produced any.
fn last_row_set(messages: Vec<SimpleQueryMessage>) -> Vec<Vec<Value>> {
	let mut last = Vec::new();
	let mut current = Vec::new();
	for message in messages {
		match message {
			SimpleQueryMessage::Row(row) => {
				let mut cells = Vec::with_capacity(row.len());
				for index in 0..row.len() {
					cells.push(match row.get(index) {
						Some(text) => Value::Text(text.to_string()),
						None => Value::Null,
					});
				}
				current.push(cells);
			}
			SimpleQueryMessage::CommandComplete(_) => {
				if !current.is_empty() {
					last = std::mem::take(&mut current);
				}
			}
			_ => {}
		}
	}
	if !current.is_empty() {
		last = current;
	}
	last
}

#[async_trait]
impl Executor for PgExecutor<'_> {
	fn dialect(&self) -> &dyn Dialect {
		&PostgresDialect
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
			self.batch_execute(sql)
				.await
				.map_err(|e| MergeError::transport("statement execution", e))?;
			Ok(0)
		})
		.await
	}

	async fn query(&mut self, sql: &str, timeout: Option<Duration>) -> Result<Box<dyn RowStream>> {
		let messages = bounded("query execution", timeout, async {
			self.simple_query(sql).await.map_err(|e| MergeError::transport("query execution", e))
		})
		.await?;
		Ok(Box::new(BufferedRows::new(last_row_set(messages))))
	}

	async fn bulk_write(
		&mut self,
		destination: &str,
		rows: &mut dyn RowSource,
		batch_size: usize,
		timeout: Option<Duration>,
	) -> Result<()> {
		let columns = rows
			.columns()
			.iter()
			.map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
			.collect::<Vec<_>>()
			.join(",");
		let statement = format!(
			"COPY \"{}\" ({columns}) FROM STDIN",
			destination.replace('"', "\"\"")
		);
		trace!(destination, statement = %statement, "starting copy");

		bounded("bulk transfer", timeout, async {
			let sink = self
				.copy_in(&statement)
				.await
				.map_err(|e| MergeError::transport("bulk transfer", e))?;
			futures_util::pin_mut!(sink);

			let width = rows.columns().len();
			let mut buffer = String::new();
			let mut buffered = 0usize;
			while rows.advance() {
				copy::encode_row(&mut buffer, rows, width)?;
				buffered += 1;
				if buffered >= batch_size {
					sink.send(Bytes::from(std::mem::take(&mut buffer)))
						.await
						.map_err(|e| MergeError::transport("bulk transfer", e))?;
					buffered = 0;
				}
			}
			if !buffer.is_empty() {
				sink.send(Bytes::from(buffer))
					.await
					.map_err(|e| MergeError::transport("bulk transfer", e))?;
			}
			sink.finish().await.map_err(|e| MergeError::transport("bulk transfer", e))?;
			Ok(())
		})
		.await
	}
}
