// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, LitStr, Result};

struct RecordField {
	ident: syn::Ident,
	ty: syn::Type,
	column: String,
	key: bool,
}

pub(crate) fn expand(input: DeriveInput) -> Result<TokenStream> {
	let fields = match &input.data {
		Data::Struct(data) => match &data.fields {
			Fields::Named(named) => &named.named,
			_ => {
				return Err(Error::new_spanned(
					&input.ident,
					"#[derive(Record)] requires named fields",
				));
			}
		},
		_ => {
			return Err(Error::new_spanned(&input.ident, "#[derive(Record)] only supports structs"));
		}
	};

	let mut table = None;
	let mut schema = None;
	for attr in &input.attrs {
		if !attr.path().is_ident("record") {
			continue;
		}
		attr.parse_nested_meta(|meta| {
			if meta.path.is_ident("table") {
				table = Some(meta.value()?.parse::<LitStr>()?.value());
				Ok(())
			} else if meta.path.is_ident("schema") {
				schema = Some(meta.value()?.parse::<LitStr>()?.value());
				Ok(())
			} else {
				Err(meta.error("expected `table = \"...\"` or `schema = \"...\"`"))
			}
		})?;
	}

	let mut mapped = Vec::new();
	for field in fields {
		let ident = field.ident.clone().expect("named field");
		let mut column = None;
		let mut key = false;
		let mut skip = false;
		for attr in &field.attrs {
			if !attr.path().is_ident("record") {
				continue;
			}
			attr.parse_nested_meta(|meta| {
				if meta.path.is_ident("column") {
					column = Some(meta.value()?.parse::<LitStr>()?.value());
					Ok(())
				} else if meta.path.is_ident("key") {
					key = true;
					Ok(())
				} else if meta.path.is_ident("skip") {
					skip = true;
					Ok(())
				} else {
					Err(meta.error("expected `column = \"...\"`, `key` or `skip`"))
				}
			})?;
		}
		if skip {
			continue;
		}
		mapped.push(RecordField {
			column: column.unwrap_or_else(|| ident.to_string()),
			ty: field.ty.clone(),
			ident,
			key,
		});
	}

	let ident = &input.ident;
	let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
	let table = table.unwrap_or_else(|| ident.to_string());
	let schema = match schema {
		Some(schema) => quote! { ::core::option::Option::Some(#schema) },
		None => quote! { ::core::option::Option::None },
	};

	let field_defs = mapped.iter().map(|f| {
		let name = f.ident.to_string();
		let column = &f.column;
		let ty = &f.ty;
		let key = f.key;
		quote! {
			::bulkmerge_core::FieldDef {
				name: #name,
				column: #column,
				kind: <#ty as ::bulkmerge_core::IntoValue>::KIND,
				key: #key,
			}
		}
	});

	let get_arms = mapped.iter().map(|f| {
		let name = f.ident.to_string();
		let ident = &f.ident;
		quote! {
			#name => ::bulkmerge_core::IntoValue::into_value(::core::clone::Clone::clone(&self.#ident)),
		}
	});

	let set_arms = mapped.iter().map(|f| {
		let name = f.ident.to_string();
		let ident = &f.ident;
		let ty = &f.ty;
		quote! {
			#name => {
				if let ::core::option::Option::Some(v) = <#ty as ::bulkmerge_core::FromValue>::from_value(value) {
					self.#ident = v;
				}
			}
		}
	});

	Ok(quote! {
		#[automatically_derived]
		impl #impl_generics ::bulkmerge_core::Record for #ident #ty_generics #where_clause {
			fn table() -> &'static str {
				#table
			}

			fn schema() -> ::core::option::Option<&'static str> {
				#schema
			}

			fn fields() -> &'static [::bulkmerge_core::FieldDef] {
				const FIELDS: &[::bulkmerge_core::FieldDef] = &[#(#field_defs),*];
				FIELDS
			}

			fn get(&self, field: &str) -> ::bulkmerge_core::Value {
				match field {
					#(#get_arms)*
					_ => ::bulkmerge_core::Value::Null,
				}
			}

			fn set(&mut self, field: &str, value: ::bulkmerge_core::Value) {
				match field {
					#(#set_arms)*
					_ => {}
				}
			}
		}
	})
}
