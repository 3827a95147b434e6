//! Entity derive macro implementation
//!
//! Generates `Entity::table` and an `Entity::describe` that registers each field
//! with the schema builder: scalars through `scalar`, nested records through
//! `nested` with holder-specific accessors.

mod attrs;

use crate::common::syn_types::{Holder, holder_of};
use attrs::{FieldAttr, field_attr, table_name};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let table = table_name(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let mut registrations = Vec::new();
    for field in fields {
        let attr = field_attr(field)?;
        if attr.skip {
            continue;
        }
        registrations.push(register(field, &attr));
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::sqlgate::mapper::Entity for #name #ty_generics #where_clause {
            fn table() -> ::core::option::Option<&'static str> {
                ::core::option::Option::Some(#table)
            }

            fn describe(schema: &mut ::sqlgate::mapper::SchemaBuilder<Self>) {
                #(#registrations)*
            }
        }
    })
}

fn column_expr(field: &syn::Field, attr: &FieldAttr) -> TokenStream {
    let column = attr.column.clone().unwrap_or_else(|| {
        field
            .ident
            .as_ref()
            .map(|i| i.to_string().trim_start_matches("r#").to_string())
            .unwrap_or_default()
    });

    let mut chain = quote! { ::sqlgate::mapper::Column::new(#column) };
    let flags = [
        (attr.primary_key, quote! { .primary_key() }),
        (attr.read_only, quote! { .read_only() }),
        (attr.immutable, quote! { .immutable() }),
        (attr.auto, quote! { .auto() }),
        (attr.inline, quote! { .inline() }),
        (attr.prefix, quote! { .prefix() }),
    ];
    for (on, call) in flags {
        if on {
            chain.extend(call);
        }
    }
    if let Some(fk) = &attr.foreign_key {
        chain.extend(quote! { .foreign_key(#fk) });
    }
    if let Some(rk) = &attr.reference_key {
        chain.extend(quote! { .reference_key(#rk) });
    }
    chain
}

fn register(field: &syn::Field, attr: &FieldAttr) -> TokenStream {
    let ident = &field.ident;
    let column = column_expr(field, attr);

    if !attr.is_nested() {
        return quote! {
            schema.scalar(#column, |r| &r.#ident, |r| &mut r.#ident);
        };
    }

    let (get, get_mut) = match holder_of(&field.ty) {
        Holder::Plain => (
            quote! { |r| ::core::option::Option::Some(&r.#ident) },
            quote! { |r| &mut r.#ident },
        ),
        Holder::Option => (
            quote! { |r| r.#ident.as_ref() },
            quote! { |r| r.#ident.get_or_insert_with(::core::default::Default::default) },
        ),
        Holder::Boxed => (
            quote! { |r| ::core::option::Option::Some(&*r.#ident) },
            quote! { |r| &mut *r.#ident },
        ),
        Holder::OptionBox => (
            quote! { |r| r.#ident.as_deref() },
            quote! { |r| &mut **r.#ident.get_or_insert_with(::core::default::Default::default) },
        ),
    };
    quote! {
        schema.nested(#column, #get, #get_mut);
    }
}
