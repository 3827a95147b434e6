//! Query builders for sqlgate.
//!
//! Builders collect clauses into a dialect-agnostic [`Sql`](crate::Sql) buffer;
//! placeholders and identifier quoting are only decided by
//! [`SqlQb::compile`] for a concrete [`Dialect`](crate::Dialect).
//!
//! # Usage
//!
//! ```ignore
//! use sqlgate::qb;
//! use sqlgate::{Dialect, Expr, SqlQb};
//!
//! let compiled = qb::select("users")
//!     .columns(&["id", "name"])
//!     .eq("status", "active")
//!     .filter(Expr::or([Expr::eq("role", "admin"), Expr::gt("karma", 100)]))
//!     .order_by("name, -id")
//!     .limit(20)
//!     .compile(Dialect::MySql)?;
//!
//! // Mutations derived from a record
//! let insert = qb::insert_entity(&user)?;
//! let update = qb::update_entity(&user)?;
//! ```

mod delete;
mod expr;
mod insert;
mod order;
mod select;
mod table;
mod traits;
mod update;

pub use delete::DeleteQb;
pub use expr::{CompareOp, Expr, ExprGroup};
pub use insert::InsertQb;
pub use order::{OrderColumn, SortDir};
pub use select::SelectQb;
pub use table::{Join, JoinKind, TableView};
pub use traits::SqlQb;
pub use update::UpdateQb;

use crate::error::{OrmError, OrmResult};
use crate::mapper::{Entity, schema};

/// Create a SELECT query builder for the given table.
///
/// # Example
/// ```ignore
/// let qb = sqlgate::qb::select("users u").eq("u.id", 1);
/// ```
pub fn select(table: &str) -> SelectQb {
    SelectQb::new(table)
}

/// Create an INSERT query builder for the given table.
pub fn insert(table: &str) -> InsertQb {
    InsertQb::new(table)
}

/// Create an UPDATE query builder for the given table.
pub fn update(table: &str) -> UpdateQb {
    UpdateQb::new(table)
}

/// Create a DELETE query builder for the given table.
///
/// # Safety
/// By default, DELETE without WHERE conditions will generate `WHERE 1=0` (no-op).
/// Use `allow_delete_all(true)` to allow deleting all rows.
pub fn delete(table: &str) -> DeleteQb {
    DeleteQb::new(table)
}

fn entity_table<T: Entity>() -> OrmResult<&'static str> {
    T::table().ok_or_else(|| {
        OrmError::validation(format!(
            "entity '{}' has no table",
            schema::<T>().type_name()
        ))
    })
}

/// SELECT of every column of `T` from its table.
pub fn select_entity<T: Entity>() -> OrmResult<SelectQb> {
    Ok(SelectQb::new(entity_table::<T>()?).columns(&schema::<T>().column_names()))
}

/// INSERT of `record` into its table.
pub fn insert_entity<T: Entity>(record: &T) -> OrmResult<InsertQb> {
    Ok(InsertQb::new(entity_table::<T>()?).entity(record))
}

/// UPDATE of `record`'s writable columns, keyed by its primary key.
pub fn update_entity<T: Entity>(record: &T) -> OrmResult<UpdateQb> {
    UpdateQb::new(entity_table::<T>()?).entity(record)
}

/// DELETE of `record`, keyed by its primary key.
pub fn delete_entity<T: Entity>(record: &T) -> OrmResult<DeleteQb> {
    DeleteQb::new(entity_table::<T>()?).entity(record)
}

#[cfg(test)]
mod tests;
