// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! Set-based bulk insert, upsert, update and delete for PostgreSQL, MySQL
//! and SQL Server.
//!
//! ```no_run
//! use bulkmerge::{BulkEngine, MergeOptions, Record};
//!
//! #[derive(Record)]
//! struct Person {
//! 	id: i64,
//! 	name: String,
//! 	age: i32,
//! }
//!
//! # async fn example(executor: &mut impl bulkmerge::Executor) -> bulkmerge::Result<()> {
//! let engine = BulkEngine::new();
//! let mut people = vec![Person { id: 0, name: "A".into(), age: 1 }];
//! engine.bulk_insert(executor, &mut people, &MergeOptions::new()).await?;
//! assert_ne!(people[0].id, 0);
//! # Ok(())
//! # }
//! ```
//!
//! Backends are enabled per feature: `postgres`, `mysql`, `mssql`.

pub use bulkmerge_core::*;
pub use bulkmerge_derive::Record;

#[cfg(feature = "mssql")]
pub use bulkmerge_mssql as mssql;
#[cfg(feature = "mysql")]
pub use bulkmerge_mysql as mysql;
#[cfg(feature = "postgres")]
pub use bulkmerge_postgres as postgres;
