// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! SQL literal encoding for the batched staging inserts.

use bulkmerge_core::{Result, RowSource, Value};

pub(crate) fn insert_prefix(destination: &str, columns: &[String]) -> String {
	let columns = columns
		.iter()
		.map(|c| format!("`{}`", c.replace('`', "``")))
		.collect::<Vec<_>>()
		.join(",");
	format!("INSERT INTO `{}` ({columns})", destination.replace('`', "``"))
}

pub(crate) fn row_tuple(rows: &dyn RowSource, width: usize) -> Result<String> {
	let mut tuple = String::from("(");
	for index in 0..width {
		if index > 0 {
			tuple.push(',');
		}
		literal_into(&mut tuple, rows.value(index)?);
	}
	tuple.push(')');
	Ok(tuple)
}

fn literal_into(buffer: &mut String, value: Value) {
	match value {
		Value::Null => buffer.push_str("NULL"),
		Value::Bool(b) => buffer.push_str(if b { "1" } else { "0" }),
		Value::Int32(v) => buffer.push_str(&v.to_string()),
		Value::Int64(v) => buffer.push_str(&v.to_string()),
		Value::Float64(v) => buffer.push_str(&v.to_string()),
		Value::Decimal(v) => buffer.push_str(&v.to_string()),
		Value::Bytes(bytes) if bytes.is_empty() => buffer.push_str("''"),
		Value::Bytes(bytes) => {
			buffer.push_str("0x");
			for byte in &bytes {
				buffer.push_str(&format!("{byte:02x}"));
			}
		}
		other => {
			buffer.push('\'');
			for ch in other.to_text().chars() {
				match ch {
					'\'' => buffer.push_str("''"),
					'\\' => buffer.push_str("\\\\"),
					'\0' => buffer.push_str("\\0"),
					ch => buffer.push(ch),
				}
			}
			buffer.push('\'');
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prefix_quotes_identifiers() {
		let prefix = insert_prefix("Person_x", &["Id".into(), "Name".into()]);
		assert_eq!(prefix, "INSERT INTO `Person_x` (`Id`,`Name`)");
	}

	#[test]
	fn literals_escape_quotes_and_backslashes() {
		let mut out = String::new();
		literal_into(&mut out, Value::Text("it's a \\ test".into()));
		assert_eq!(out, "'it''s a \\\\ test'");
	}

	#[test]
	fn null_bool_and_numbers_render_bare() {
		let mut out = String::new();
		literal_into(&mut out, Value::Null);
		out.push(',');
		literal_into(&mut out, Value::Bool(true));
		out.push(',');
		literal_into(&mut out, Value::Int64(-7));
		assert_eq!(out, "NULL,1,-7");
	}

	#[test]
	fn bytes_render_as_hex() {
		let mut out = String::new();
		literal_into(&mut out, Value::Bytes(vec![0xde, 0xad]));
		assert_eq!(out, "0xdead");
	}
}
