//! Attribute parsing for the Entity derive macro.
//!
//! Handles struct-level and field-level `#[orm(...)]` attributes.

use heck::ToSnakeCase;
use syn::{DeriveInput, LitStr, Result};

/// Table name from `#[orm(table = "...")]`, or the snake_case struct name.
pub(super) fn table_name(input: &DeriveInput) -> Result<String> {
    let mut table = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                table = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("unknown struct attribute, expected `table`"))
            }
        })?;
    }
    Ok(table.unwrap_or_else(|| input.ident.to_string().to_snake_case()))
}

/// Parsed field-level options.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub column: Option<String>,
    pub primary_key: bool,
    pub foreign_key: Option<String>,
    pub reference_key: Option<String>,
    pub read_only: bool,
    pub immutable: bool,
    pub auto: bool,
    pub inline: bool,
    pub prefix: bool,
    pub nested: bool,
    pub skip: bool,
}

impl FieldAttr {
    /// Whether the field holds a nested record rather than a scalar.
    pub fn is_nested(&self) -> bool {
        self.nested || self.inline || self.foreign_key.is_some()
    }
}

pub(super) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut out = FieldAttr::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        attr.parse_nested_meta(|meta| {
            let flag = |slot: &mut bool| {
                *slot = true;
                Ok(())
            };
            let path = &meta.path;
            if path.is_ident("column") {
                out.column = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if path.is_ident("foreign_key") {
                out.foreign_key = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if path.is_ident("reference_key") {
                out.reference_key = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if path.is_ident("primary_key") {
                flag(&mut out.primary_key)
            } else if path.is_ident("read_only") {
                flag(&mut out.read_only)
            } else if path.is_ident("immutable") {
                flag(&mut out.immutable)
            } else if path.is_ident("auto") {
                flag(&mut out.auto)
            } else if path.is_ident("inline") {
                flag(&mut out.inline)
            } else if path.is_ident("prefix") {
                flag(&mut out.prefix)
            } else if path.is_ident("nested") {
                flag(&mut out.nested)
            } else if path.is_ident("skip") {
                flag(&mut out.skip)
            } else {
                Err(meta.error("unknown field attribute"))
            }
        })?;
    }

    if out.prefix && !out.inline {
        return Err(syn::Error::new_spanned(field, "`prefix` requires `inline`"));
    }
    if out.reference_key.is_some() && out.foreign_key.is_none() {
        return Err(syn::Error::new_spanned(
            field,
            "`reference_key` requires `foreign_key`",
        ));
    }
    if out.inline && out.foreign_key.is_some() {
        return Err(syn::Error::new_spanned(
            field,
            "`inline` and `foreign_key` cannot be combined",
        ));
    }
    Ok(out)
}
