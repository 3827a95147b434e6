//! Derive macros for sqlgate
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod common;
mod entity;

/// Derive the `Entity` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use sqlgate::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(primary_key)]
///     id: String,
///     name: String,
///     #[orm(foreign_key = "group_id", reference_key = "id", primary_key)]
///     group: Option<Group>,
///     #[orm(inline, prefix)]
///     address: Address,
///     #[orm(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// # Attributes
///
/// Struct level:
/// - `#[orm(table = "name")]` - Table name (defaults to the snake_case struct name)
///
/// Field level:
/// - `#[orm(column = "name")]` - Column name (defaults to the field name)
/// - `#[orm(primary_key)]`, `#[orm(read_only)]`, `#[orm(immutable)]`, `#[orm(auto)]`
/// - `#[orm(foreign_key = "col", reference_key = "field")]` - Store a related record as its key
/// - `#[orm(inline)]`, `#[orm(inline, prefix)]` - Flatten a nested record's columns
/// - `#[orm(nested)]` - A nested record reachable as `field.column`
/// - `#[orm(skip)]` - Not mapped
///
/// Nested fields may be held as `T`, `Option<T>`, `Box<T>` or `Option<Box<T>>`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
