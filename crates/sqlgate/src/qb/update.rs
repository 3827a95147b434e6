//! UPDATE query builder using the unified expression layer.

use super::expr::{Expr, ExprGroup};
use super::traits::{SqlQb, deferred_message, push_returning};
use crate::error::{OrmError, OrmResult};
use crate::ident::{Ident, unquote};
use crate::mapper::{Entity, Schema, schema};
use crate::sql::Sql;
use crate::value::Value;

/// SET field value type.
#[derive(Clone, Debug)]
enum SetField {
    /// Parameterized value
    Value(Value),
    /// Literal NULL
    Null,
    /// Raw SQL expression
    Raw(String),
}

/// UPDATE query builder with expression-based WHERE.
#[derive(Clone, Debug)]
pub struct UpdateQb {
    table: Option<Ident>,
    set_fields: Vec<(Ident, SetField)>,
    where_group: ExprGroup,
    returning_cols: Vec<String>,
    build_error: Option<String>,
}

impl UpdateQb {
    /// Create a new UPDATE query builder.
    pub fn new(table: &str) -> Self {
        let mut qb = Self {
            table: None,
            set_fields: Vec::new(),
            where_group: ExprGroup::new(),
            returning_cols: Vec::new(),
            build_error: None,
        };
        match Ident::parse(table) {
            Ok(table) => qb.table = Some(table),
            Err(e) => qb.record(e),
        }
        qb
    }

    fn record(&mut self, err: OrmError) {
        self.build_error.get_or_insert_with(|| deferred_message(err));
    }

    fn push_set(&mut self, column: &str, field: SetField) {
        match Ident::parse(column) {
            Ok(column) => self.set_fields.push((column, field)),
            Err(e) => self.record(e),
        }
    }

    /// Set a column value. `Value::Null` is written as `column = NULL`.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        let field = match value.into() {
            Value::Null => SetField::Null,
            v => SetField::Value(v),
        };
        self.push_set(column, field);
        self
    }

    /// Set an optional column value (None => skip).
    pub fn set_opt<V: Into<Value>>(self, column: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a raw SQL expression.
    pub fn set_raw(mut self, column: &str, expr: &str) -> Self {
        self.push_set(column, SetField::Raw(expr.to_string()));
        self
    }

    /// Update every writable column of `record`, keyed by its primary key.
    pub fn entity<T: Entity>(self, record: &T) -> OrmResult<Self> {
        self.entity_columns::<T, &str>(record, &[])
    }

    /// Update the given writable columns of `record` (all when empty), keyed by its
    /// primary key.
    ///
    /// Primary-key columns always go to WHERE. Primary-key, `read_only` and
    /// `immutable` columns never go to SET, even when listed.
    pub fn entity_columns<T: Entity, S: AsRef<str>>(
        mut self,
        record: &T,
        columns: &[S],
    ) -> OrmResult<Self> {
        let schema = schema::<T>();
        self.where_group.and_expr(primary_key_filter(schema, record)?);

        for field in schema.fields() {
            let column = field.column();
            if !column.is_updatable() {
                continue;
            }
            if !columns.is_empty() && !columns.iter().any(|c| column.is(&unquote(c.as_ref()))) {
                continue;
            }
            self = self.set(&column.name, field.get(record));
        }
        Ok(self)
    }

    // ==================== WHERE conditions ====================

    /// AND a predicate onto WHERE; `None` adds nothing.
    pub fn filter(mut self, expr: impl Into<Option<Expr>>) -> Self {
        self.where_group.and_expr(expr);
        self
    }

    /// Add WHERE: column = value
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_group.eq(column, value);
        self
    }

    /// Add WHERE: column <> value
    pub fn ne(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_group.ne(column, value);
        self
    }

    /// Add WHERE: column > value
    pub fn gt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_group.gt(column, value);
        self
    }

    /// Add WHERE: column < value
    pub fn lt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_group.lt(column, value);
        self
    }

    /// Add WHERE: column IN (values...)
    pub fn in_list<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.where_group.in_list(column, values);
        self
    }

    /// Add WHERE: column IS NULL
    pub fn is_null(mut self, column: &str) -> Self {
        self.where_group.is_null(column);
        self
    }

    /// Add a raw WHERE condition.
    pub fn raw(mut self, sql: &str) -> Self {
        self.where_group.raw(sql);
        self
    }

    // ==================== RETURNING ====================

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
            .ok_or_else(|| OrmError::validation("UPDATE has no table"))?;
        if self.set_fields.is_empty() {
            return Err(OrmError::validation("UPDATE requires at least one SET field"));
        }
        Ok(table)
    }
}

/// `pk = value AND ...` over the primary-key columns of `record`.
pub(crate) fn primary_key_filter<T: Entity>(schema: &Schema<T>, record: &T) -> OrmResult<Expr> {
    let keys: Vec<Expr> = schema
        .primary_keys()
        .map(|f| Expr::eq(f.name(), f.get(record)))
        .collect();
    Expr::and(keys).ok_or_else(|| OrmError::MissingPrimaryKey(schema.type_name().to_string()))
}

impl SqlQb for UpdateQb {
    fn build(&self) -> OrmResult<Sql> {
        let table = self.validate()?;
        let mut sql = Sql::new("UPDATE ");
        sql.push_ident(table).push(" SET ");

        for (i, (column, field)) in self.set_fields.iter().enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            sql.push_ident(column).push(" = ");
            match field {
                SetField::Value(v) => sql.push_bind(v.clone()),
                SetField::Null => sql.push("NULL"),
                SetField::Raw(expr) => sql.push(expr),
            };
        }

        if !self.where_group.is_empty() {
            sql.push(" WHERE ");
            self.where_group.append_to_sql(&mut sql);
        }

        push_returning(&mut sql, &self.returning_cols);
        Ok(sql)
    }

    fn has_returning(&self) -> bool {
        !self.returning_cols.is_empty()
    }
}
