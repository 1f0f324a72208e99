// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! Synchronous variants of the bulk operations.
//!
//! Wraps a [`BulkEngine`] together with a private current-thread runtime and
//! blocks on each call. Must not be used from inside an async context.

use tokio::runtime::Runtime;

use crate::{
	context::MergeOptions,
	convert::ConverterRegistry,
	engine::BulkEngine,
	error::{MergeError, Result},
	executor::Executor,
	record::Record,
};

pub struct BlockingEngine {
	engine: BulkEngine,
	runtime: Runtime,
}

impl BlockingEngine {
	pub fn new() -> Result<Self> {
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.map_err(|e| MergeError::transport("blocking runtime setup", e))?;
		Ok(Self {
			engine: BulkEngine::new(),
			runtime,
		})
	}

	/// Converter registry of the wrapped engine.
	pub fn converters(&self) -> &ConverterRegistry {
		self.engine.converters()
	}

	pub fn bulk_copy<T, E>(&self, executor: &mut E, records: &[T], options: &MergeOptions) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		self.runtime.block_on(self.engine.bulk_copy(executor, records, options))
	}

	pub fn bulk_insert<T, E>(&self, executor: &mut E, records: &mut [T], options: &MergeOptions) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		self.runtime.block_on(self.engine.bulk_insert(executor, records, options))
	}

	pub fn bulk_insert_or_update<T, E>(
		&self,
		executor: &mut E,
		records: &mut [T],
		options: &MergeOptions,
	) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		self.runtime.block_on(self.engine.bulk_insert_or_update(executor, records, options))
	}

	pub fn bulk_update<T, E>(&self, executor: &mut E, records: &[T], options: &MergeOptions) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		self.runtime.block_on(self.engine.bulk_update(executor, records, options))
	}

	pub fn bulk_delete<T, E>(&self, executor: &mut E, records: &[T], options: &MergeOptions) -> Result<()>
	where
		T: Record,
		E: Executor + ?Sized,
	{
		self.runtime.block_on(self.engine.bulk_delete(executor, records, options))
	}
}
