//! Keyset (cursor-based) pagination.
//!
//! A [`Paginator`] turns a base [`SelectQb`](crate::qb::SelectQb) plus an opaque
//! [`Cursor`] into the query for the next page: the ORDER BY is reconciled with the
//! cursor, and a row-value predicate continues strictly after the last row seen.

mod cursor;
mod paginator;

pub use cursor::{Cursor, Position};
pub use paginator::{Page, Paginator};
