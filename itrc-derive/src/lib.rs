use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, LitStr, Meta};

/// Derive macro that turns a struct of same-typed fields into a named field set.
///
/// For each field, extracts:
/// - Wire name (respects `#[serde(rename = "...")]` and a container
///   `#[serde(rename_all = "camelCase")]`)
/// - Description (from doc comments)
///
/// Generates an implementation of `crate::core::fields::Fields`, giving the
/// whitelist of known names plus by-name read and write access.
#[proc_macro_derive(FieldSchema, attributes(serde))]
pub fn derive_field_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("FieldSchema only supports structs with named fields"),
        },
        _ => panic!("FieldSchema only supports structs"),
    };

    let camel_case = container_rename_all(&input.attrs).as_deref() == Some("camelCase");

    let value_ty = match fields.first() {
        Some(field) => &field.ty,
        None => panic!("FieldSchema needs at least one field"),
    };
    let value_ty_str = quote!(#value_ty).to_string();
    for field in fields.iter() {
        let ty = &field.ty;
        if quote!(#ty).to_string() != value_ty_str {
            return syn::Error::new_spanned(ty, "FieldSchema fields must all share one type")
                .to_compile_error()
                .into();
        }
    }

    let mut idents = Vec::new();
    let mut wire_names = Vec::new();
    let mut docs = Vec::new();
    for field in fields.iter() {
        let ident = field.ident.as_ref().unwrap();
        let rust_name = ident.to_string();
        let wire = field_rename(&field.attrs).unwrap_or_else(|| {
            if camel_case {
                to_camel_case(&rust_name)
            } else {
                rust_name.clone()
            }
        });
        idents.push(ident.clone());
        wire_names.push(wire);
        docs.push(get_doc_comment(&field.attrs));
    }

    let spec_entries = wire_names.iter().zip(docs.iter()).map(|(wire, doc)| {
        quote! {
            crate::core::fields::FieldSpec {
                name: #wire,
                description: #doc,
            }
        }
    });
    let read_arms = wire_names.iter().zip(idents.iter()).map(|(wire, ident)| {
        quote! { #wire => Some(&self.#ident), }
    });
    let write_arms = wire_names.iter().zip(idents.iter()).map(|(wire, ident)| {
        quote! { #wire => Some(&mut self.#ident), }
    });

    let expanded = quote! {
        impl crate::core::fields::Fields for #name {
            type Value = #value_ty;

            fn schema() -> &'static [crate::core::fields::FieldSpec] {
                static SCHEMA: &[crate::core::fields::FieldSpec] = &[
                    #(#spec_entries),*
                ];
                SCHEMA
            }

            fn field(&self, name: &str) -> Option<&Self::Value> {
                match name {
                    #(#read_arms)*
                    _ => None,
                }
            }

            fn field_mut(&mut self, name: &str) -> Option<&mut Self::Value> {
                match name {
                    #(#write_arms)*
                    _ => None,
                }
            }
        }
    };

    TokenStream::from(expanded)
}

fn container_rename_all(attrs: &[syn::Attribute]) -> Option<String> {
    serde_string_arg(attrs, "rename_all")
}

fn field_rename(attrs: &[syn::Attribute]) -> Option<String> {
    serde_string_arg(attrs, "rename")
}

/// Finds `key = "..."` inside `#[serde(...)]`, skipping every other serde argument.
fn serde_string_arg(attrs: &[syn::Attribute], key: &str) -> Option<String> {
    let mut found = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) {
                let lit: LitStr = meta.value()?.parse()?;
                found = Some(lit.value());
            } else if meta.input.peek(syn::Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                let _: proc_macro2::TokenStream = content.parse()?;
            }
            Ok(())
        });
    }
    found
}

/// Same rule serde applies for `rename_all = "camelCase"`.
fn to_camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut capitalize = false;
    for ch in snake.chars() {
        if ch == '_' {
            capitalize = true;
        } else if capitalize {
            out.extend(ch.to_uppercase());
            capitalize = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn get_doc_comment(attrs: &[syn::Attribute]) -> String {
    attrs
        .iter()
        .filter_map(|attr| {
            if !attr.path().is_ident("doc") {
                return None;
            }
            if let Meta::NameValue(meta) = &attr.meta {
                if let syn::Expr::Lit(expr_lit) = &meta.value {
                    if let Lit::Str(lit_str) = &expr_lit.lit {
                        return Some(lit_str.value().trim().to_string());
                    }
                }
            }
            None
        })
        .collect::<Vec<_>>()
        .join(" ")
}
