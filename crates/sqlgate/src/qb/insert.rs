//! INSERT query builder.

use super::traits::{SqlQb, deferred_message, push_returning};
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::mapper::{Entity, schema};
use crate::sql::Sql;
use crate::value::Value;

/// Value expression for one VALUES cell.
#[derive(Clone, Debug)]
enum ValueExpr {
    /// Parameterized value
    Param(Value),
    /// Literal NULL
    Null,
    /// Raw SQL expression without parameter
    Raw(String),
}

impl From<Value> for ValueExpr {
    fn from(value: Value) -> Self {
        if value.is_null() {
            ValueExpr::Null
        } else {
            ValueExpr::Param(value)
        }
    }
}

/// INSERT query builder.
///
/// Single-row inserts are built with [`set`](InsertQb::set); multi-row inserts
/// declare [`columns`](InsertQb::columns) once and add [`values`](InsertQb::values)
/// per row.
#[derive(Clone, Debug)]
pub struct InsertQb {
    table: Option<Ident>,
    columns: Vec<Ident>,
    rows: Vec<Vec<ValueExpr>>,
    returning_cols: Vec<String>,
    build_error: Option<String>,
}

impl InsertQb {
    /// Create a new INSERT query builder.
    pub fn new(table: &str) -> Self {
        let mut qb = Self {
            table: None,
            columns: Vec::new(),
            rows: Vec::new(),
            returning_cols: Vec::new(),
            build_error: None,
        };
        match Ident::parse(table) {
            Ok(table) => qb.table = Some(table),
            Err(e) => qb.record(deferred_message(e)),
        }
        qb
    }

    fn record(&mut self, err: String) {
        self.build_error.get_or_insert(err);
    }

    fn push_column(&mut self, column: &str) -> bool {
        match Ident::parse(column) {
            Ok(column) => {
                self.columns.push(column);
                true
            }
            Err(e) => {
                self.record(deferred_message(e));
                false
            }
        }
    }

    fn push_cell(&mut self, column: &str, cell: ValueExpr) {
        if self.rows.len() > 1 {
            self.record("set() cannot be combined with multi-row values()".to_string());
            return;
        }
        if self.push_column(column) {
            if self.rows.is_empty() {
                self.rows.push(Vec::new());
            }
            self.rows[0].push(cell);
        }
    }

    /// Set a column value. `Value::Null` is written as a literal `NULL`.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.push_cell(column, ValueExpr::from(value.into()));
        self
    }

    /// Set an optional column value (None => skip).
    pub fn set_opt<V: Into<Value>>(self, column: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a raw SQL expression (no params).
    pub fn set_raw(mut self, column: &str, expr: &str) -> Self {
        self.push_cell(column, ValueExpr::Raw(expr.to_string()));
        self
    }

    /// Declare the column list for [`values`](InsertQb::values).
    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.columns.clear();
        for column in columns {
            self.push_column(column.as_ref());
        }
        self
    }

    /// Add one row of values, in column order.
    pub fn values<V: Into<Value>>(mut self, row: impl IntoIterator<Item = V>) -> Self {
        self.rows
            .push(row.into_iter().map(|v| ValueExpr::from(v.into())).collect());
        self
    }

    /// Set every column of `record`.
    ///
    /// `auto` columns are left out when their value is NULL so the database can
    /// generate them; any other value, zero included, is written.
    pub fn entity<T: Entity>(mut self, record: &T) -> Self {
        for (column, value) in schema::<T>().column_values(record) {
            if column.options.auto && value.is_null() {
                continue;
            }
            self.push_cell(&column.name, ValueExpr::from(value));
        }
        self
    }

    /// Set RETURNING columns (string form).
    pub fn returning(mut self, cols: &str) -> Self {
        self.returning_cols = vec![cols.to_string()];
        self
    }

    /// Set RETURNING columns (array form).
    pub fn returning_cols<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
        self.returning_cols = cols.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    fn validate(&self) -> OrmResult<&Ident> {
        if let Some(ref err) = self.build_error {
            return Err(OrmError::Validation(err.clone()));
        }
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| OrmError::validation("INSERT has no table"))?;
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(OrmError::validation(format!(
                    "INSERT row {i} has {} value(s) for {} column(s)",
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        if !self.columns.is_empty() && self.rows.is_empty() {
            return Err(OrmError::validation("INSERT has columns but no values"));
        }
        Ok(table)
    }
}

impl SqlQb for InsertQb {
    fn build(&self) -> OrmResult<Sql> {
        let table = self.validate()?;
        let mut sql = Sql::new("INSERT INTO ");
        sql.push_ident(table);

        if self.columns.is_empty() {
            sql.push(" DEFAULT VALUES");
        } else {
            sql.push(" (");
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    sql.push(", ");
                }
                sql.push_ident(column);
            }
            sql.push(") VALUES ");
            for (r, row) in self.rows.iter().enumerate() {
                sql.push(if r == 0 { "(" } else { ", (" });
                for (i, cell) in row.iter().enumerate() {
                    if i > 0 {
                        sql.push(", ");
                    }
                    match cell {
                        ValueExpr::Param(v) => sql.push_bind(v.clone()),
                        ValueExpr::Null => sql.push("NULL"),
                        ValueExpr::Raw(expr) => sql.push(expr),
                    };
                }
                sql.push(")");
            }
        }

        push_returning(&mut sql, &self.returning_cols);
        Ok(sql)
    }

    fn has_returning(&self) -> bool {
        !self.returning_cols.is_empty()
    }
}
