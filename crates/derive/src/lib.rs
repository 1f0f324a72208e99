// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! `#[derive(Record)]`: compile-time field accessors for bulk operations.
//!
//! The generated implementation reads and writes fields through a direct
//! match on the field name - field-access speed, no reflection. Attributes:
//!
//! - `#[record(table = "...")]`, `#[record(schema = "...")]` on the struct;
//! - `#[record(column = "...")]` renames the column a field maps to;
//! - `#[record(key)]` marks a field as part of the primary key;
//! - `#[record(skip)]` hides a field from the engine entirely.

use proc_macro::TokenStream;

mod record;

#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
	let input = syn::parse_macro_input!(input as syn::DeriveInput);
	record::expand(input).unwrap_or_else(|e| e.into_compile_error()).into()
}
