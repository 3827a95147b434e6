//! SELECT query builder using the unified expression layer.

use super::expr::{Expr, ExprGroup};
use super::order::OrderColumn;
use super::table::{Join, JoinKind, TableView};
use super::traits::{SqlQb, deferred_message};
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::mapper::{Entity, schema};
use crate::sql::Sql;
use crate::value::Value;

#[derive(Clone, Debug)]
enum Projection {
    Raw(String),
    Aliased { expr: String, alias: Ident },
}

/// SELECT query builder with expression-based WHERE/HAVING.
///
/// Consuming and `Clone`: clone a base query before deriving variants from it.
#[derive(Clone, Debug)]
pub struct SelectQb {
    /// WITH clauses
    ctes: Vec<(Ident, SelectQb)>,
    from: Option<TableView>,
    /// SELECT list (empty means `*`)
    projection: Vec<Projection>,
    distinct: bool,
    joins: Vec<Join>,
    where_group: ExprGroup,
    group_by: Vec<String>,
    having_group: ExprGroup,
    order: Vec<OrderColumn>,
    limit: Option<u64>,
    offset: Option<u64>,
    /// First error recorded while building; reported by `build()`.
    build_error: Option<String>,
}

impl SelectQb {
    /// Select from a table: `"users"`, `"users u"` or `"users AS u"`.
    pub fn new(table: &str) -> Self {
        let mut qb = Self::empty();
        match TableView::table(table) {
            Ok(view) => qb.from = Some(view),
            Err(e) => qb.record(e),
        }
        qb
    }

    /// Select from an arbitrary table view.
    pub fn from_view(view: TableView) -> Self {
        let mut qb = Self::empty();
        qb.from = Some(view);
        qb
    }

    /// Select from an aliased sub-select.
    pub fn from_select(query: SelectQb, alias: &str) -> Self {
        let mut qb = Self::empty();
        match TableView::select(query, alias) {
            Ok(view) => qb.from = Some(view),
            Err(e) => qb.record(e),
        }
        qb
    }

    /// Select from a CTE; declare it with [`SelectQb::with`].
    pub fn from_cte(name: &str) -> Self {
        let mut qb = Self::empty();
        match TableView::cte(name) {
            Ok(view) => qb.from = Some(view),
            Err(e) => qb.record(e),
        }
        qb
    }

    fn empty() -> Self {
        Self {
            ctes: Vec::new(),
            from: None,
            projection: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            where_group: ExprGroup::new(),
            group_by: Vec::new(),
            having_group: ExprGroup::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            build_error: None,
        }
    }

    fn record(&mut self, err: OrmError) {
        if self.build_error.is_none() {
            self.build_error = Some(deferred_message(err));
        }
    }

    // ==================== WITH ====================

    /// Add `WITH name AS (query)`.
    pub fn with(mut self, name: &str, query: SelectQb) -> Self {
        match Ident::parse(name) {
            Ok(name) => self.ctes.push((name, query)),
            Err(e) => self.record(e),
        }
        self
    }

    // ==================== SELECT columns ====================

    /// Set the SELECT list (string form, supports complex expressions).
    pub fn select(mut self, cols: &str) -> Self {
        self.projection = vec![Projection::Raw(cols.to_string())];
        self
    }

    /// Set the SELECT list (array form).
    pub fn columns<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
        self.projection = cols
            .iter()
            .map(|c| Projection::Raw(c.as_ref().to_string()))
            .collect();
        self
    }

    /// Append one SELECT column.
    pub fn add_column(mut self, col: &str) -> Self {
        self.projection.push(Projection::Raw(col.to_string()));
        self
    }

    /// Append `expr AS alias`.
    pub fn column_as(mut self, expr: &str, alias: &str) -> Self {
        match Ident::parse(alias) {
            Ok(alias) => self.projection.push(Projection::Aliased {
                expr: expr.to_string(),
                alias,
            }),
            Err(e) => self.record(e),
        }
        self
    }

    /// Append every column of `T`, read from `table_alias`, as `table_alias.col AS "prefix.col"`.
    ///
    /// The aliases are the dotted paths the mapper resolves through relations, so
    /// joined rows scan straight into nested records.
    pub fn project<T: Entity>(mut self, table_alias: &str, prefix: &str) -> Self {
        for name in schema::<T>().column_names() {
            let alias = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}.{name}")
            };
            match Ident::quoted(&alias) {
                Ok(alias) => self.projection.push(Projection::Aliased {
                    expr: format!("{table_alias}.{name}"),
                    alias,
                }),
                Err(e) => self.record(e),
            }
        }
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // ==================== JOIN ====================

    fn join(mut self, kind: JoinKind, table: &str, on: &str) -> Self {
        match TableView::table(table) {
            Ok(view) => self.joins.push(Join {
                kind,
                view,
                on: on.to_string(),
            }),
            Err(e) => self.record(e),
        }
        self
    }

    /// Add INNER JOIN.
    pub fn inner_join(self, table: &str, on: &str) -> Self {
        self.join(JoinKind::Inner, table, on)
    }

    /// Add LEFT JOIN.
    pub fn left_join(self, table: &str, on: &str) -> Self {
        self.join(JoinKind::Left, table, on)
    }

    /// Add RIGHT JOIN.
    pub fn right_join(self, table: &str, on: &str) -> Self {
        self.join(JoinKind::Right, table, on)
    }

    /// Add FULL OUTER JOIN.
    pub fn full_join(self, table: &str, on: &str) -> Self {
        self.join(JoinKind::Full, table, on)
    }

    /// Join against any table view (sub-select, CTE).
    pub fn join_view(mut self, kind: JoinKind, view: TableView, on: &str) -> Self {
        self.joins.push(Join {
            kind,
            view,
            on: on.to_string(),
        });
        self
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

    /// Add WHERE: column >= value
    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_group.gte(column, value);
        self
    }

    /// Add WHERE: column < value
    pub fn lt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_group.lt(column, value);
        self
    }

    /// Add WHERE: column <= value
    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_group.lte(column, value);
        self
    }

    /// Add WHERE: column LIKE pattern
    pub fn like(mut self, column: &str, pattern: impl Into<Value>) -> Self {
        self.where_group.like(column, pattern);
        self
    }

    /// Add WHERE: column NOT LIKE pattern
    pub fn not_like(mut self, column: &str, pattern: impl Into<Value>) -> Self {
        self.where_group.and_expr(Expr::not_like(column, pattern));
        self
    }

    /// Add WHERE: column IS NULL
    pub fn is_null(mut self, column: &str) -> Self {
        self.where_group.is_null(column);
        self
    }

    /// Add WHERE: column IS NOT NULL
    pub fn is_not_null(mut self, column: &str) -> Self {
        self.where_group.is_not_null(column);
        self
    }

    /// Add WHERE: column IN (values...)
    pub fn in_list<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.where_group.in_list(column, values);
        self
    }

    /// Add WHERE: column NOT IN (values...)
    pub fn not_in<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.where_group.and_expr(Expr::not_in(column, values));
        self
    }

    /// Add WHERE: column BETWEEN from AND to
    pub fn between(mut self, column: &str, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        self.where_group.and_expr(Expr::between(column, from, to));
        self
    }

    /// Add a raw WHERE condition without params.
    pub fn raw(mut self, sql: &str) -> Self {
        self.where_group.raw(sql);
        self
    }

    /// Add WHERE if value is Some: column = value
    pub fn eq_opt<V: Into<Value>>(mut self, column: &str, value: Option<V>) -> Self {
        self.where_group.eq_opt(column, value);
        self
    }

    /// Add WHERE if pattern is Some: column LIKE pattern
    pub fn like_opt<V: Into<Value>>(mut self, column: &str, pattern: Option<V>) -> Self {
        self.where_group.like_opt(column, pattern);
        self
    }

    /// Add WHERE if values is Some and non-empty: column IN (values...)
    pub fn in_opt<V: Into<Value>>(mut self, column: &str, values: Option<Vec<V>>) -> Self {
        self.where_group.in_opt(column, values);
        self
    }

    // ==================== Ordering & Grouping ====================

    /// Append ORDER BY entries parsed from `"name, -created_at"`.
    ///
    /// A malformed entry is reported by `build()`.
    pub fn order_by(mut self, list: &str) -> Self {
        match OrderColumn::parse_list(list) {
            Ok(columns) => self.order.extend(columns),
            Err(e) => self.record(e),
        }
        self
    }

    /// Add ORDER BY column ASC.
    pub fn order_by_asc(mut self, column: &str) -> Self {
        self.order.push(OrderColumn::asc(column));
        self
    }

    /// Add ORDER BY column DESC.
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order.push(OrderColumn::desc(column));
        self
    }

    /// Replace the ORDER BY list.
    pub(crate) fn with_order(mut self, order: Vec<OrderColumn>) -> Self {
        self.order = order;
        self
    }

    /// Add a GROUP BY expression.
    pub fn group_by(mut self, clause: &str) -> Self {
        self.group_by.push(clause.to_string());
        self
    }

    /// AND a predicate onto HAVING.
    pub fn having(mut self, expr: impl Into<Option<Expr>>) -> Self {
        self.having_group.and_expr(expr);
        self
    }

    // ==================== Limits ====================

    /// Set LIMIT.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Set OFFSET.
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    // ==================== Accessors ====================

    pub fn order_columns(&self) -> &[OrderColumn] {
        &self.order
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    pub fn where_exprs(&self) -> &[Expr] {
        self.where_group.exprs()
    }

    // ==================== Build helpers ====================

    fn validate(&self) -> OrmResult<&TableView> {
        if let Some(ref err) = self.build_error {
            return Err(OrmError::Validation(err.clone()));
        }
        self.from
            .as_ref()
            .ok_or_else(|| OrmError::validation("SELECT has no FROM table"))
    }

    fn push_ctes(&self, sql: &mut Sql) -> OrmResult<()> {
        for (i, (name, query)) in self.ctes.iter().enumerate() {
            sql.push(if i == 0 { "WITH " } else { ", " });
            sql.push_ident(name).push(" AS (").push_sql(query.build()?).push(")");
        }
        if !self.ctes.is_empty() {
            sql.push(" ");
        }
        Ok(())
    }

    fn push_projection(&self, sql: &mut Sql) {
        if self.projection.is_empty() {
            sql.push("*");
            return;
        }
        for (i, item) in self.projection.iter().enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            match item {
                Projection::Raw(expr) => {
                    sql.push(expr);
                }
                Projection::Aliased { expr, alias } => {
                    sql.push(expr).push(" AS ").push_ident(alias);
                }
            }
        }
    }

    /// FROM through HAVING.
    fn push_body(&self, sql: &mut Sql, from: &TableView) -> OrmResult<()> {
        sql.push(" FROM ");
        from.append_to_sql(sql)?;

        for join in &self.joins {
            join.append_to_sql(sql)?;
        }

        if !self.where_group.is_empty() {
            sql.push(" WHERE ");
            self.where_group.append_to_sql(sql);
        }

        if !self.group_by.is_empty() {
            sql.push(" GROUP BY ").push(&self.group_by.join(", "));
        }

        if !self.having_group.is_empty() {
            sql.push(" HAVING ");
            self.having_group.append_to_sql(sql);
        }
        Ok(())
    }

    /// `SELECT COUNT(*)` over the same rows, ignoring order and limits.
    ///
    /// Grouped queries are wrapped in a sub-select so groups are counted.
    pub fn build_count(&self) -> OrmResult<Sql> {
        let from = self.validate()?;
        let mut sql = Sql::empty();
        self.push_ctes(&mut sql)?;

        if self.group_by.is_empty() && self.having_group.is_empty() && !self.distinct {
            sql.push("SELECT COUNT(*)");
            self.push_body(&mut sql, from)?;
            return Ok(sql);
        }

        sql.push("SELECT COUNT(*) FROM (SELECT ");
        if self.distinct {
            sql.push("DISTINCT ");
            self.push_projection(&mut sql);
        } else {
            sql.push("1");
        }
        self.push_body(&mut sql, from)?;
        sql.push(") AS t");
        Ok(sql)
    }
}

impl SqlQb for SelectQb {
    fn build(&self) -> OrmResult<Sql> {
        let from = self.validate()?;
        let mut sql = Sql::empty();
        self.push_ctes(&mut sql)?;

        sql.push("SELECT ");
        if self.distinct {
            sql.push("DISTINCT ");
        }
        self.push_projection(&mut sql);
        self.push_body(&mut sql, from)?;

        if !self.order.is_empty() {
            sql.push(" ORDER BY ");
            for (i, column) in self.order.iter().enumerate() {
                if i > 0 {
                    sql.push(", ");
                }
                column.append_to_sql(&mut sql);
            }
        }

        sql.push_limit(self.limit, self.offset);
        Ok(sql)
    }
}
