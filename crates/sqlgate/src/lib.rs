//! # sqlgate
//!
//! Dialect-aware SQL building, record mapping and keyset pagination.
//!
//! ## Features
//!
//! - **One builder, five dialects**: statements are assembled once and rendered for
//!   mysql, postgres, sqlite, sqlserver or oracle by [`SqlQb::compile`]
//! - **Entity mapping**: `#[derive(Entity)]` describes a record's columns; mutations,
//!   projections and row scanning are derived from it
//! - **Named parameters**: `:name` and `?` markers bound from values, maps or records
//! - **Keyset pagination**: opaque cursor tokens and strict continuation predicates
//! - **Driver-agnostic execution**: a small [`Driver`] trait, with an adapter for
//!   `tokio_postgres::Client` behind the `postgres` feature
//!
//! ## Query Builder (qb)
//!
//! ```ignore
//! use sqlgate::{qb, Dialect, SqlQb};
//!
//! let compiled = qb::select("users")
//!     .eq("status", "active")
//!     .order_by("name, -id")
//!     .limit(10)
//!     .compile(Dialect::MySql)?;
//!
//! let insert = qb::insert_entity(&user)?.compile(Dialect::Postgres)?;
//! ```
//!
//! ## Pagination
//!
//! ```ignore
//! let pager = qb::select("users").order_by("name").paginate().key_asc("id").limit(20);
//! let page: Page<User> = gateway.paginate(&ctx, &pager.token(&token)?).await?;
//! let next_token = page.next_token()?;
//! ```

pub mod config;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod ident;
pub mod log;
pub mod mapper;
pub mod named;
pub mod pagination;
pub mod prelude;
pub mod qb;
pub mod routine;
pub mod sql;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use config::GatewayConfig;
pub use dialect::Dialect;
pub use driver::{Context, Driver, ExecResult, Rows};
pub use error::{ConstraintKind, OrmError, OrmResult};
pub use gateway::Gateway;
pub use ident::Ident;
pub use log::SqlLogger;
pub use mapper::{Column, ColumnOptions, Entity, Scanner, SchemaBuilder};
pub use named::{Arg, MissingParam, NamedQuery};
pub use pagination::{Cursor, Page, Paginator, Position};
pub use routine::{Routine, RoutineCatalog};
pub use sql::{Compiled, Sql, sql};
pub use value::{FromValue, Value};

pub use qb::{
    DeleteQb, Expr, ExprGroup, InsertQb, OrderColumn, SelectQb, SortDir, SqlQb, UpdateQb,
    delete, insert, select, update,
};

#[cfg(feature = "derive")]
pub use sqlgate_derive::Entity;
