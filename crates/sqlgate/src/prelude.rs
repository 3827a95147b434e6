//! Convenient imports for typical `sqlgate` usage.
//!
//! ```ignore
//! use sqlgate::prelude::*;
//! ```

pub use crate::{
    Context, Cursor, Dialect, Driver, Entity, Expr, Gateway, OrmError, OrmResult, Page,
    SelectQb, SqlQb, Value, qb,
};

pub use crate::{Column, SchemaBuilder};
