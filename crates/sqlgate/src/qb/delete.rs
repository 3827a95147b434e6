//! DELETE statements.

use super::expr::{Expr, ExprGroup};
use super::traits::{SqlQb, deferred_message, push_returning};
use super::update::primary_key_filter;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::mapper::{Entity, schema};
use crate::sql::Sql;
use crate::value::Value;

/// Builder for `DELETE FROM`.
///
/// A statement without any condition is rendered as `WHERE 1=0` and deletes
/// nothing unless [`allow_delete_all`](DeleteQb::allow_delete_all) is set.
#[derive(Clone, Debug)]
pub struct DeleteQb {
    /// The parsed table, or the message explaining why it could not be parsed.
    table: Result<Ident, String>,
    conditions: ExprGroup,
    returning: Vec<String>,
    unfiltered_ok: bool,
}

impl DeleteQb {
    pub fn new(table: &str) -> Self {
        Self {
            table: Ident::parse(table).map_err(deferred_message),
            conditions: ExprGroup::new(),
            returning: Vec::new(),
            unfiltered_ok: false,
        }
    }

    /// Permit a statement with no conditions to delete every row.
    pub fn allow_delete_all(mut self, allow: bool) -> Self {
        self.unfiltered_ok = allow;
        self
    }

    /// Match the row of `record` on its primary key.
    pub fn entity<T: Entity>(self, record: &T) -> OrmResult<Self> {
        Ok(self.filter(primary_key_filter(schema::<T>(), record)?))
    }

    /// AND a predicate onto WHERE; `None` adds nothing.
    pub fn filter(mut self, expr: impl Into<Option<Expr>>) -> Self {
        self.conditions.and_expr(expr);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Expr::eq(column, value))
    }

    pub fn ne(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Expr::ne(column, value))
    }

    pub fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Expr::lt(column, value))
    }

    pub fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Expr::gt(column, value))
    }

    pub fn in_list<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filter(Expr::in_list(column, values))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(Expr::is_null(column))
    }

    pub fn raw(self, sql: &str) -> Self {
        self.filter(Expr::raw(sql))
    }

    /// `RETURNING` list, written as given.
    pub fn returning(self, cols: &str) -> Self {
        self.returning_cols(&[cols])
    }

    pub fn returning_cols<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
        self.returning = cols.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }
}

impl SqlQb for DeleteQb {
    fn build(&self) -> OrmResult<Sql> {
        let table = self.table.as_ref().map_err(|e| OrmError::Validation(e.clone()))?;

        let mut sql = Sql::new("DELETE FROM ");
        sql.push_ident(table);
        match (self.conditions.is_empty(), self.unfiltered_ok) {
            (false, _) => {
                sql.push(" WHERE ");
                self.conditions.append_to_sql(&mut sql);
            }
            (true, false) => {
                sql.push(" WHERE 1=0");
            }
            (true, true) => {}
        }
        push_returning(&mut sql, &self.returning);
        Ok(sql)
    }

    fn has_returning(&self) -> bool {
        !self.returning.is_empty()
    }
}
