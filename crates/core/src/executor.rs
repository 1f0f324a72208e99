// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! The backend boundary.
//!
//! Everything the engine needs from a database driver fits in [`Executor`]:
//! open/close with ownership semantics, batch statement execution, a row
//! cursor for queries, and the backend-native staging transfer. Drivers own
//! the wire protocols; the engine owns the orchestration.
//!
//! A driver transaction handle is itself an executor - statements issued
//! through it run inside that transaction. The engine never manages
//! transactions beyond using whatever handle the caller supplies.

use std::time::Duration;

use async_trait::async_trait;

use crate::{dialect::Dialect, error::Result, reader::RowSource, value::Value};

/// Row-at-a-time cursor over a query result.
///
/// Multi-statement batches surface the rows of the last row-bearing result
/// set; identity readbacks rely on this.
#[async_trait]
pub trait RowStream: Send {
	/// The next row, or None when the cursor is exhausted.
	async fn next(&mut self) -> Result<Option<Vec<Value>>>;
}

/// [`RowStream`] over rows a driver has already buffered.
pub struct BufferedRows {
	rows: std::vec::IntoIter<Vec<Value>>,
}

impl BufferedRows {
	pub fn new(rows: Vec<Vec<Value>>) -> Self {
		Self {
			rows: rows.into_iter(),
		}
	}
}

#[async_trait]
impl RowStream for BufferedRows {
	async fn next(&mut self) -> Result<Option<Vec<Value>>> {
		Ok(self.rows.next())
	}
}

/// A live backend connection (or transaction) the engine can drive.
///
/// Exclusive to one call while that call runs; the engine takes `&mut self`
/// for every operation and never shares an executor across concurrent calls.
///
/// Every network operation takes an independent timeout. There is no
/// cross-step deadline and no retry at this seam.
#[async_trait]
pub trait Executor: Send {
	/// The SQL dialect of this backend.
	fn dialect(&self) -> &dyn Dialect;

	/// Database (catalog) name, used to key the column cache.
	fn database(&self) -> &str;

	/// Whether the connection is currently open. Adapters over drivers that
	/// connect eagerly always report true.
	fn is_open(&self) -> bool;

	/// Open the connection. Only called when [`Executor::is_open`] returned
	/// false; the engine then owns the connection and closes it when the
	/// call finishes, aborted or not.
	async fn open(&mut self) -> Result<()>;

	/// Close the connection. Only called by the engine for connections it
	/// opened itself.
	async fn close(&mut self) -> Result<()>;

	/// Execute a statement batch, returning the affected row count where
	/// the driver reports one.
	async fn execute(&mut self, sql: &str, timeout: Option<Duration>) -> Result<u64>;

	/// Execute a statement batch and open a cursor over its rows.
	async fn query(&mut self, sql: &str, timeout: Option<Duration>) -> Result<Box<dyn RowStream>>;

	/// Stream `rows` into `destination` using the backend's native bulk
	/// transfer. Column order is taken from [`RowSource::columns`] and must
	/// be preserved on the wire.
	async fn bulk_write(
		&mut self,
		destination: &str,
		rows: &mut dyn RowSource,
		batch_size: usize,
		timeout: Option<Duration>,
	) -> Result<()>;
}
