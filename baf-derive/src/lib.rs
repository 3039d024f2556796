// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `#[derive(Block)]`: builds a [`baf_core::schema::Schema::Block`] from a
//! struct declaration instead of the builder chain in `baf_core::schema`.
//!
//! A Rust struct's fields already read like a record layout; this macro
//! just lets that declaration double as the schema instead of making the
//! caller restate it through `BlockSchema::builder(...).field(...)`. Each
//! field names its datum model with a `#[baf(schema = "...")]` attribute
//! holding a `Schema`-valued expression; an optional `#[baf(setter = "...")]`
//! names a function item used as that field's setter.
//!
//! ```ignore
//! #[derive(Block)]
//! #[baf(name = "Header")]
//! struct Header {
//!     #[baf(schema = "Schema::int(IntKind::U16)")]
//!     magic: (),
//!     #[baf(schema = "Schema::int(IntKind::U32)", setter = "compute_len")]
//!     len: (),
//! }
//! ```
//!
//! generates `impl Header { pub fn schema() -> Schema { ... } }`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Expr, Fields, LitStr};

#[proc_macro_derive(Block, attributes(baf))]
pub fn derive_block(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_ident = &input.ident;
    let block_name = container_attr(&input.attrs, "name")?
        .unwrap_or_else(|| struct_ident.to_string());
    let family = container_attr(&input.attrs, "family")?;

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "Block can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input,
            "Block requires a struct with named fields",
        ));
    };

    let mut field_calls = Vec::new();
    let mut setter_calls = Vec::new();
    for field in &fields.named {
        let name = field
            .ident
            .as_ref()
            .expect("named fields always have an ident")
            .to_string();
        let schema_src = field_attr(&field.attrs, "schema")?.ok_or_else(|| {
            syn::Error::new_spanned(field, "field is missing a #[baf(schema = \"...\")] attribute")
        })?;
        let schema_expr: Expr = schema_src.parse()?;
        field_calls.push(quote! { .field(#name, #schema_expr) });

        if let Some(setter_src) = field_attr(&field.attrs, "setter")? {
            let setter_path: Expr = setter_src.parse()?;
            setter_calls.push(quote! { .setter(#name, #setter_path) });
        }
    }

    let family_call = match family {
        Some(f) => quote! { .family(#f) },
        None => quote! {},
    };

    let expanded = quote! {
        impl #struct_ident {
            /// Builds this struct's schema from its `#[baf(...)]` field attributes.
            pub fn schema() -> ::baf_core::Schema {
                ::baf_core::BlockSchema::builder(#block_name)
                    #(#field_calls)*
                    #(#setter_calls)*
                    #family_call
                    .build()
            }
        }
    };
    Ok(expanded)
}

fn container_attr(attrs: &[syn::Attribute], key: &str) -> syn::Result<Option<String>> {
    for attr in attrs {
        if !attr.path().is_ident("baf") {
            continue;
        }
        let mut found = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) {
                let value: LitStr = meta.value()?.parse()?;
                found = Some(value.value());
            }
            Ok(())
        })?;
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

fn field_attr(attrs: &[syn::Attribute], key: &str) -> syn::Result<Option<String>> {
    container_attr(attrs, key)
}
