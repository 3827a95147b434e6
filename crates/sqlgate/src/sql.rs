//! Dialect-agnostic SQL buffer.
//!
//! `Sql` stores SQL pieces and parameter values separately. Placeholders are only
//! produced by [`Sql::render`], in one pass, for the requested [`Dialect`]. Nothing
//! is ever search-and-replaced in rendered text, so a bound value whose text looks
//! like a placeholder cannot be substituted twice.
//!
//! # Example
//!
//! ```ignore
//! use sqlgate::{Dialect, Sql};
//!
//! let mut q = Sql::new("SELECT id, name FROM users WHERE 1=1");
//! if let Some(status) = status {
//!     q.push(" AND status = ").push_bind(status);
//! }
//! let compiled = q.render(Dialect::Postgres);
//! ```

use crate::dialect::Dialect;
use crate::ident::Ident;
use crate::value::Value;

#[derive(Debug, Clone)]
enum SqlPart {
    Raw(String),
    Ident(Ident),
    /// Parameter slot; the name is used by named-placeholder dialects.
    Param(Option<String>),
    Limit {
        limit: Option<u64>,
        offset: Option<u64>,
    },
}

/// A SQL fragment plus the values bound to its parameter slots.
#[derive(Debug, Clone, Default)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Value>,
}

/// SQL text and arguments ready for a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Start building a SQL statement.
pub fn sql(initial_sql: impl Into<String>) -> Sql {
    Sql::new(initial_sql)
}

impl Sql {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        let initial = initial_sql.into();
        let mut sql = Self::empty();
        sql.push(&initial);
        sql
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }
        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append an anonymous parameter slot and bind its value.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.parts.push(SqlPart::Param(None));
        self.params.push(value.into());
        self
    }

    /// Append a named parameter slot and bind its value.
    pub fn push_named(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.parts.push(SqlPart::Param(Some(name.into())));
        self.params.push(value.into());
        self
    }

    /// Append an identifier, quoted per dialect at render time.
    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        self.parts.push(SqlPart::Ident(ident.clone()));
        self
    }

    /// Append a column reference.
    ///
    /// Names that parse as an [`Ident`] are re-quoted for the target dialect; any
    /// other text (`lower(name)`, `COUNT(*)`) is written as given.
    pub fn push_column(&mut self, column: &str) -> &mut Self {
        match Ident::parse(column) {
            Ok(ident) => self.push_ident(&ident),
            Err(_) => self.push(column),
        }
    }

    /// Append a paging clause, rendered per dialect.
    pub fn push_limit(&mut self, limit: Option<u64>, offset: Option<u64>) -> &mut Self {
        if limit.is_some() || offset.is_some() {
            self.parts.push(SqlPart::Limit { limit, offset });
        }
        self
    }

    /// Append another fragment, keeping its parameter order.
    pub fn push_sql(&mut self, other: Sql) -> &mut Self {
        for part in other.parts {
            match part {
                SqlPart::Raw(s) => {
                    self.push(&s);
                }
                part => self.parts.push(part),
            }
        }
        self.params.extend(other.params);
        self
    }

    /// Bound values, in slot order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Render SQL text and arguments for `dialect`.
    pub fn render(&self, dialect: Dialect) -> Compiled {
        let mut out = String::with_capacity(self.estimated_len());
        let mut idx = 0usize;
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Ident(ident) => ident.write_sql(dialect, &mut out),
                SqlPart::Param(name) => {
                    idx += 1;
                    dialect.write_placeholder(&mut out, idx, name.as_deref());
                }
                SqlPart::Limit { limit, offset } => dialect.write_limit(&mut out, *limit, *offset),
            }
        }
        Compiled {
            sql: out,
            args: self.params.clone(),
        }
    }

    /// Render only the SQL text (debugging helper).
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.render(dialect).sql
    }

    fn estimated_len(&self) -> usize {
        self.parts
            .iter()
            .map(|p| match p {
                SqlPart::Raw(s) => s.len(),
                SqlPart::Ident(_) | SqlPart::Limit { .. } => 16,
                SqlPart::Param(_) => 4,
            })
            .sum()
    }
}
