// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

pub type Result<T> = std::result::Result<T, MergeError>;

/// Everything that can go wrong in a bulk operation.
///
/// Configuration and schema problems surface before any DDL or DML is issued;
/// transport and conversion problems abort the remaining steps of the call.
/// Nothing is retried, and no error is downgraded to a partial success.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
	/// The operation needs a primary key and neither the record type, the
	/// call options nor table introspection produced one.
	#[error("no primary key resolved for table '{table}'; the operation cannot match staged rows")]
	NoPrimaryKey {
		table: String,
	},

	/// A mapped field has no corresponding column in the target table.
	#[error("field '{field}' maps to column '{column}' which does not exist in table '{table}'")]
	UnknownColumn {
		field: String,
		column: String,
		table: String,
	},

	/// Identity back-mapping was requested but no record field maps to the
	/// identity column reported by introspection.
	#[error("no record field maps to identity column '{column}' of table '{table}'")]
	UnmappedIdentity {
		column: String,
		table: String,
	},

	/// The backend introspection query returned a malformed row.
	#[error("malformed column metadata row from table '{table}': {detail}")]
	Introspection {
		table: String,
		detail: String,
	},

	/// A value could not be converted between its declared kind and the
	/// kind required at a boundary.
	#[error("cannot convert value of kind {from} to {to}")]
	Conversion {
		from: String,
		to: String,
	},

	/// A registered converter rejected a value.
	#[error("converter for kind {kind} failed: {detail}")]
	Converter {
		kind: String,
		detail: String,
	},

	/// Connection open/close, statement execution or the staging transfer
	/// failed at the driver layer. Propagated unchanged, never retried.
	#[error("transport failure during {operation}: {source}")]
	Transport {
		operation: &'static str,
		#[source]
		source: Box<dyn std::error::Error + Send + Sync>,
	},

	/// A network operation exceeded its per-step timeout.
	#[error("{operation} timed out")]
	Timeout {
		operation: &'static str,
	},
}

impl MergeError {
	/// Wrap a driver error as a transport failure for the named step.
	pub fn transport(
		operation: &'static str,
		source: impl std::error::Error + Send + Sync + 'static,
	) -> Self {
		MergeError::Transport {
			operation,
			source: Box::new(source),
		}
	}
}
