//! Predicate trees for WHERE/HAVING clauses.
//!
//! [`Expr`] nodes hold their values, not placeholders. Rendering appends the node to
//! a [`Sql`] buffer as parameter slots, so a single tree can be compiled for any
//! dialect without being rebuilt.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::sql::Sql;
use crate::value::Value;

/// Comparison operator of an [`Expr::Compare`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
        }
    }
}

/// Predicate node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// All children must hold.
    And(Vec<Expr>),
    /// At least one child must hold.
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// `column op ?`; comparing to `Value::Null` renders `IS [NOT] NULL`.
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    NullCheck {
        column: String,
        is_null: bool,
    },
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    Between {
        column: String,
        from: Value,
        to: Value,
        negated: bool,
    },
    /// SQL with `?` markers, one per value.
    Template {
        sql: String,
        params: Vec<Value>,
    },
    Raw(String),
    True,
    False,
}

fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Expr {
    Expr::Compare {
        column: column.into(),
        op,
        value: value.into(),
    }
}

impl Expr {
    /// AND of the present children.
    ///
    /// `None` children are skipped and nested ANDs are flattened. Returns `None` when
    /// nothing is left, so callers never emit an empty `()` group.
    pub fn and<I, E>(children: I) -> Option<Expr>
    where
        I: IntoIterator<Item = E>,
        E: Into<Option<Expr>>,
    {
        Self::group(children, true)
    }

    /// OR of the present children, with the same nil-safety as [`Expr::and`].
    pub fn or<I, E>(children: I) -> Option<Expr>
    where
        I: IntoIterator<Item = E>,
        E: Into<Option<Expr>>,
    {
        Self::group(children, false)
    }

    fn group<I, E>(children: I, is_and: bool) -> Option<Expr>
    where
        I: IntoIterator<Item = E>,
        E: Into<Option<Expr>>,
    {
        let mut flat = Vec::new();
        for child in children.into_iter().filter_map(Into::into) {
            match (child, is_and) {
                (Expr::And(inner), true) | (Expr::Or(inner), false) => flat.extend(inner),
                (other, _) => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ if is_and => Some(Expr::And(flat)),
            _ => Some(Expr::Or(flat)),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(column, CompareOp::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(column, CompareOp::Ne, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(column, CompareOp::Gt, value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(column, CompareOp::Gte, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(column, CompareOp::Lt, value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(column, CompareOp::Lte, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        compare(column, CompareOp::Like, pattern)
    }

    pub fn not_like(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        compare(column, CompareOp::NotLike, pattern)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: true,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: false,
        }
    }

    /// `column IN (...)`; an empty list never matches.
    pub fn in_list<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Expr::False;
        }
        Expr::InList {
            column: column.into(),
            values,
            negated: false,
        }
    }

    /// `column NOT IN (...)`; an empty list always matches.
    pub fn not_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Expr::True;
        }
        Expr::InList {
            column: column.into(),
            values,
            negated: true,
        }
    }

    pub fn between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Expr::Between {
            column: column.into(),
            from: from.into(),
            to: to.into(),
            negated: false,
        }
    }

    pub fn not_between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Expr::Between {
            column: column.into(),
            from: from.into(),
            to: to.into(),
            negated: true,
        }
    }

    /// SQL fragment with `?` markers.
    ///
    /// ```ignore
    /// Expr::template("lower(email) = lower(?)", [email])?
    /// ```
    pub fn template<V: Into<Value>>(
        sql: impl Into<String>,
        params: impl IntoIterator<Item = V>,
    ) -> OrmResult<Self> {
        let sql = sql.into();
        let params: Vec<Value> = params.into_iter().map(Into::into).collect();
        let markers = sql.matches('?').count();
        if markers != params.len() {
            return Err(OrmError::validation(format!(
                "template has {markers} placeholder(s) but {} value(s): {sql}",
                params.len()
            )));
        }
        Ok(Expr::Template { sql, params })
    }

    /// Raw SQL fragment without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    /// Append this node to `sql`. Compound nodes are parenthesized.
    pub fn append_to_sql(&self, sql: &mut Sql) {
        match self {
            Expr::And(children) | Expr::Or(children) => {
                let (sep, empty) = if matches!(self, Expr::And(_)) {
                    (" AND ", "1=1")
                } else {
                    (" OR ", "1=0")
                };
                match children.as_slice() {
                    [] => {
                        sql.push(empty);
                    }
                    [only] => only.append_to_sql(sql),
                    _ => {
                        sql.push("(");
                        for (i, child) in children.iter().enumerate() {
                            if i > 0 {
                                sql.push(sep);
                            }
                            child.append_to_sql(sql);
                        }
                        sql.push(")");
                    }
                }
            }
            Expr::Not(inner) => {
                sql.push("NOT (");
                inner.append_to_sql(sql);
                sql.push(")");
            }
            Expr::Compare { column, op, value } => {
                sql.push_column(column);
                match (op, value) {
                    (CompareOp::Eq, Value::Null) => {
                        sql.push(" IS NULL");
                    }
                    (CompareOp::Ne, Value::Null) => {
                        sql.push(" IS NOT NULL");
                    }
                    _ => {
                        sql.push(" ").push(op.as_str()).push(" ").push_bind(value.clone());
                    }
                }
            }
            Expr::NullCheck { column, is_null } => {
                sql.push_column(column);
                sql.push(if *is_null { " IS NULL" } else { " IS NOT NULL" });
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                sql.push_column(column);
                sql.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        sql.push(", ");
                    }
                    sql.push_bind(v.clone());
                }
                sql.push(")");
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                sql.push_column(column);
                sql.push(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                sql.push_bind(from.clone()).push(" AND ").push_bind(to.clone());
            }
            Expr::Template { sql: text, params } => {
                let mut params = params.iter();
                let mut rest = text.as_str();
                while let Some(pos) = rest.find('?') {
                    sql.push(&rest[..pos]);
                    match params.next() {
                        Some(v) => sql.push_bind(v.clone()),
                        None => sql.push("?"),
                    };
                    rest = &rest[pos + 1..];
                }
                sql.push(rest);
            }
            Expr::Raw(text) => {
                sql.push(text);
            }
            Expr::True => {
                sql.push("1=1");
            }
            Expr::False => {
                sql.push("1=0");
            }
        }
    }

    /// Render this node alone into a fresh buffer.
    pub fn build(&self) -> Sql {
        let mut sql = Sql::empty();
        self.append_to_sql(&mut sql);
        sql
    }

    /// Render SQL text for a dialect (debugging helper).
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.build().to_sql(dialect)
    }
}

/// AND-accumulator used by the statement builders.
///
/// Members render joined by ` AND ` without an outer group.
#[derive(Clone, Debug, Default)]
pub struct ExprGroup {
    exprs: Vec<Expr>,
}

impl ExprGroup {
    pub fn new() -> Self {
        Self { exprs: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Add an expression; `None` is ignored. Nested ANDs are flattened.
    pub fn and_expr(&mut self, expr: impl Into<Option<Expr>>) {
        match expr.into() {
            Some(Expr::And(inner)) => self.exprs.extend(inner),
            Some(expr) => self.exprs.push(expr),
            None => {}
        }
    }

    pub fn eq(&mut self, column: &str, value: impl Into<Value>) {
        self.exprs.push(Expr::eq(column, value));
    }

    pub fn ne(&mut self, column: &str, value: impl Into<Value>) {
        self.exprs.push(Expr::ne(column, value));
    }

    pub fn gt(&mut self, column: &str, value: impl Into<Value>) {
        self.exprs.push(Expr::gt(column, value));
    }

    pub fn gte(&mut self, column: &str, value: impl Into<Value>) {
        self.exprs.push(Expr::gte(column, value));
    }

    pub fn lt(&mut self, column: &str, value: impl Into<Value>) {
        self.exprs.push(Expr::lt(column, value));
    }

    pub fn lte(&mut self, column: &str, value: impl Into<Value>) {
        self.exprs.push(Expr::lte(column, value));
    }

    pub fn like(&mut self, column: &str, pattern: impl Into<Value>) {
        self.exprs.push(Expr::like(column, pattern));
    }

    pub fn is_null(&mut self, column: &str) {
        self.exprs.push(Expr::is_null(column));
    }

    pub fn is_not_null(&mut self, column: &str) {
        self.exprs.push(Expr::is_not_null(column));
    }

    pub fn in_list<V: Into<Value>>(&mut self, column: &str, values: impl IntoIterator<Item = V>) {
        self.exprs.push(Expr::in_list(column, values));
    }

    pub fn raw(&mut self, sql: &str) {
        self.exprs.push(Expr::raw(sql));
    }

    /// Add `column = value` when the value is present.
    pub fn eq_opt<V: Into<Value>>(&mut self, column: &str, value: Option<V>) {
        if let Some(v) = value {
            self.eq(column, v);
        }
    }

    /// Add `column LIKE pattern` when the pattern is present.
    pub fn like_opt<V: Into<Value>>(&mut self, column: &str, pattern: Option<V>) {
        if let Some(v) = pattern {
            self.like(column, v);
        }
    }

    /// Add `column IN (...)` when the list is present and non-empty.
    pub fn in_opt<V: Into<Value>>(&mut self, column: &str, values: Option<Vec<V>>) {
        if let Some(v) = values.filter(|v| !v.is_empty()) {
            self.in_list(column, v);
        }
    }

    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    /// Append the members (without the WHERE keyword).
    pub fn append_to_sql(&self, sql: &mut Sql) {
        for (i, expr) in self.exprs.iter().enumerate() {
            if i > 0 {
                sql.push(" AND ");
            }
            expr.append_to_sql(sql);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(expr: &Expr) -> (String, usize) {
        let c = expr.build().render(Dialect::Postgres);
        (c.sql, c.args.len())
    }

    #[test]
    fn test_simple_eq() {
        assert_eq!(render(&Expr::eq("name", "alice")), ("name = $1".into(), 1));
    }

    #[test]
    fn test_and_group_is_parenthesized() {
        let expr = Expr::and([Expr::eq("status", "active"), Expr::gt("age", 18)]).unwrap();
        assert_eq!(render(&expr), ("(status = $1 AND age > $2)".into(), 2));
    }

    #[test]
    fn test_nested_and_or() {
        let expr = Expr::and([
            Some(Expr::eq("status", "active")),
            Expr::or([Expr::eq("role", "admin"), Expr::eq("role", "root")]),
        ])
        .unwrap();
        assert_eq!(
            render(&expr).0,
            "(status = $1 AND (role = $2 OR role = $3))"
        );
    }

    #[test]
    fn test_nil_safe_groups() {
        assert_eq!(Expr::and(Vec::<Option<Expr>>::new()), None);
        assert_eq!(Expr::or([None::<Expr>, None]), None);
        let single = Expr::and([None, Some(Expr::eq("a", 1)), None]).unwrap();
        assert_eq!(single, Expr::eq("a", 1));
    }

    #[test]
    fn test_flattens_same_kind() {
        let inner = Expr::and([Expr::eq("a", 1), Expr::eq("b", 2)]);
        let expr = Expr::and([inner, Some(Expr::eq("c", 3))]).unwrap();
        assert_eq!(render(&expr).0, "(a = $1 AND b = $2 AND c = $3)");
    }

    #[test]
    fn test_in_list() {
        assert_eq!(
            render(&Expr::in_list("id", [1, 2, 3])),
            ("id IN ($1, $2, $3)".into(), 3)
        );
        assert_eq!(render(&Expr::in_list("id", Vec::<i32>::new())).0, "1=0");
        assert_eq!(render(&Expr::not_in("id", Vec::<i32>::new())).0, "1=1");
    }

    #[test]
    fn test_null_comparisons() {
        assert_eq!(render(&Expr::eq("deleted_at", Value::Null)), ("deleted_at IS NULL".into(), 0));
        assert_eq!(render(&Expr::ne("deleted_at", None::<i32>)).0, "deleted_at IS NOT NULL");
    }

    #[test]
    fn test_template() {
        let expr = Expr::template("a = ? OR b = ?", [1, 2]).unwrap();
        assert_eq!(render(&expr), ("a = $1 OR b = $2".into(), 2));
        assert!(Expr::template("a = ?", [1, 2]).is_err());
    }

    #[test]
    fn test_not_and_between() {
        assert_eq!(render(&Expr::not(Expr::eq("banned", true))).0, "NOT (banned = $1)");
        assert_eq!(
            render(&Expr::between("age", 18, 65)).0,
            "age BETWEEN $1 AND $2"
        );
    }

    #[test]
    fn test_same_tree_many_dialects() {
        let expr = Expr::and([Expr::eq("a", 1), Expr::like("b", "x%")]).unwrap();
        let sql = expr.build();
        assert_eq!(sql.to_sql(Dialect::MySql), "(a = ? AND b LIKE ?)");
        assert_eq!(sql.to_sql(Dialect::Postgres), "(a = $1 AND b LIKE $2)");
        assert_eq!(sql.to_sql(Dialect::SqlServer), "(a = @p1 AND b LIKE @p2)");
    }

    #[test]
    fn test_group_renders_flat() {
        let mut group = ExprGroup::new();
        group.eq("id", 1);
        group.eq_opt("name", None::<&str>);
        group.and_expr(Expr::or([Expr::eq("x", 1), Expr::eq("y", 2)]));
        let mut sql = Sql::empty();
        group.append_to_sql(&mut sql);
        assert_eq!(sql.to_sql(Dialect::MySql), "id = ? AND (x = ? OR y = ?)");
    }
}
