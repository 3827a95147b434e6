//! Mapping between records and table columns.
//!
//! Types implement [`Entity`] (normally through `#[derive(Entity)]`) to describe their
//! columns once. The cached [`Schema`] then serves both directions:
//!
//! - extraction: [`values`] reads column values out of a record, skipping unknown names;
//! - scanning: [`Scanner`] writes driver rows into new or existing records and
//!   rejects columns it cannot place.

mod column;
mod scan;
mod schema;

pub use column::{Column, ColumnOptions};
pub use scan::Scanner;
pub use schema::{Entity, Field, Schema, SchemaBuilder, schema};

use crate::value::Value;

/// Ordered values of `columns` from `record` (all columns when empty).
pub fn values<T: Entity, S: AsRef<str>>(record: &T, columns: &[S]) -> Vec<Value> {
    schema::<T>().values(record, columns)
}

/// Column metadata of `T`, in declaration order.
pub fn columns<T: Entity>() -> Vec<Column> {
    schema::<T>().columns().cloned().collect()
}
