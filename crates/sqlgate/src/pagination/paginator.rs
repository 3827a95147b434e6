//! Keyset paginator over a [`SelectQb`].

use super::cursor::{Cursor, Position};
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::mapper::{Entity, schema};
use crate::qb::{Expr, OrderColumn, SelectQb, SortDir, SqlQb};
use crate::sql::Sql;

impl SelectQb {
    /// Start keyset pagination over a copy of this query.
    pub fn paginate(&self) -> Paginator {
        Paginator {
            limit: self.limit_value(),
            query: self.clone(),
            key: None,
            cursor: Cursor::empty(),
            overfetch: true,
        }
    }
}

/// Builds continuation queries from a base SELECT and a [`Cursor`].
///
/// The base query is never modified; [`seek`](Paginator::seek) returns a new one with
/// the reconciled ORDER BY, the continuation predicate and the page limit.
///
/// ```ignore
/// let pager = qb::select("users")
///     .order_by("name")
///     .paginate()
///     .key_asc("id")
///     .token(&request.page_token)?
///     .limit(20);
/// let rows = gateway.fetch_all::<User>(&ctx, &pager).await?;
/// let page = pager.page(rows)?;
/// ```
#[derive(Debug, Clone)]
pub struct Paginator {
    query: SelectQb,
    key: Option<OrderColumn>,
    cursor: Cursor,
    limit: Option<u64>,
    overfetch: bool,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the following page; empty on the last page.
    pub next: Cursor,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Token for the following page (`""` on the last page).
    pub fn next_token(&self) -> OrmResult<String> {
        self.next.encode()
    }
}

impl Paginator {
    /// Set the unique paging key, which must end the ORDER BY.
    pub fn key(mut self, column: &str, dir: SortDir) -> Self {
        self.key = Some(OrderColumn::new(column, dir));
        self
    }

    pub fn key_asc(self, column: &str) -> Self {
        self.key(column, SortDir::Asc)
    }

    pub fn key_desc(self, column: &str) -> Self {
        self.key(column, SortDir::Desc)
    }

    /// Continue after `cursor`.
    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = cursor;
        self
    }

    /// Continue after the cursor encoded in `token`; `""` starts from the first page.
    pub fn token(self, token: &str) -> OrmResult<Self> {
        let cursor = Cursor::decode(token)?;
        check_columns(&cursor)?;
        Ok(self.cursor(cursor))
    }

    /// Page size. Defaults to the base query's LIMIT; a zero limit is rejected
    /// by [`seek`](Paginator::seek).
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Fetch one extra row to tell whether another page exists (default on).
    pub fn overfetch(mut self, enabled: bool) -> Self {
        self.overfetch = enabled;
        self
    }

    pub fn current_cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// The ORDER BY of the continuation query.
    ///
    /// Existing entries must agree with the cursor at every shared index; cursor
    /// entries past the end extend the list. The paging key must come last, in its
    /// declared direction, and is appended when absent. A non-empty cursor must
    /// end at the paging key.
    pub fn order(&self) -> OrmResult<Vec<OrderColumn>> {
        let key = self.key.as_ref().ok_or(OrmError::PagingKeyMissing)?;
        check_columns(&self.cursor)?;
        let mut order = self.query.order_columns().to_vec();

        for (i, position) in self.cursor.positions().iter().enumerate() {
            let wanted = position.order_column();
            match order.get(i) {
                Some(existing) if existing.matches(&wanted) => {}
                Some(_) => return Err(OrmError::CursorMismatch),
                None => order.push(wanted),
            }
        }
        let ends_at_key = match self.cursor.positions().last() {
            Some(last) => last.order_column().matches(key),
            None => true,
        };
        if !ends_at_key {
            return Err(OrmError::PagingKeyPosition);
        }

        match order.iter().position(|c| c.same_column(&key.column)) {
            Some(i) if i + 1 != order.len() => return Err(OrmError::PagingKeyPosition),
            Some(i) if order[i].dir != key.dir => {
                return Err(OrmError::validation(format!(
                    "paging key '{}' is ordered {} but declared {}",
                    key.column,
                    order[i].dir.as_sql(),
                    key.dir.as_sql()
                )));
            }
            Some(_) => {}
            None => order.push(key.clone()),
        }
        Ok(order)
    }

    /// `c1 > v1 OR (c1 = v1 AND (c2 > v2 OR (c2 = v2 AND ...)))`, with `<` for
    /// descending columns. `None` for the first page.
    pub fn predicate(&self) -> Option<Expr> {
        self.cursor
            .positions()
            .iter()
            .rev()
            .fold(None, |rest, position| {
                let column = position.column.as_str();
                let value = position.value.clone();
                let step = match position.order {
                    SortDir::Asc => Expr::gt(column, value.clone()),
                    SortDir::Desc => Expr::lt(column, value.clone()),
                };
                match rest {
                    None => Some(step),
                    Some(rest) => Expr::or([
                        Some(step),
                        Expr::and([Expr::eq(column, value), rest]),
                    ]),
                }
            })
    }

    /// The continuation query.
    pub fn seek(&self) -> OrmResult<SelectQb> {
        if self.limit == Some(0) {
            return Err(OrmError::validation("page limit must be positive"));
        }
        let order = self.order()?;
        let mut query = self
            .query
            .clone()
            .with_order(order)
            .filter(self.predicate());
        if let Some(limit) = self.limit {
            query = query.limit(if self.overfetch { limit + 1 } else { limit });
        }
        Ok(query)
    }

    /// Cursor pointing after the last record of a page.
    ///
    /// An empty page, or one shorter than the limit, is the last page and yields
    /// the empty cursor.
    pub fn next_cursor<T: Entity>(&self, items: &[T]) -> OrmResult<Cursor> {
        let Some(last) = items.last() else {
            return Ok(Cursor::empty());
        };
        match self.limit {
            Some(limit) if (items.len() as u64) >= limit => self.cursor_for(last),
            _ => Ok(Cursor::empty()),
        }
    }

    /// Trim the over-fetched row from `rows` and compute the next cursor.
    pub fn page<T: Entity>(&self, mut rows: Vec<T>) -> OrmResult<Page<T>> {
        let has_more = match self.limit {
            Some(0) | None => false,
            Some(limit) if self.overfetch => (rows.len() as u64) > limit,
            Some(limit) => (rows.len() as u64) >= limit,
        };
        if let Some(limit) = self.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        let next = match rows.last() {
            Some(last) if has_more => self.cursor_for(last)?,
            _ => Cursor::empty(),
        };
        Ok(Page {
            items: rows,
            next,
            has_more,
        })
    }

    fn cursor_for<T: Entity>(&self, record: &T) -> OrmResult<Cursor> {
        let schema = schema::<T>();
        self.order()?
            .into_iter()
            .map(|column| {
                let field = schema
                    .field(&column.column)
                    .ok_or_else(|| OrmError::UnknownColumn(column.column.clone()))?;
                Ok(Position {
                    value: field.get(record),
                    order: column.dir,
                    column: column.column,
                })
            })
            .collect()
    }
}

/// Cursor columns come from client-supplied tokens; only plain identifiers may
/// reach the SQL text.
fn check_columns(cursor: &Cursor) -> OrmResult<()> {
    for position in cursor.positions() {
        Ident::parse(&position.column).map_err(|_| {
            OrmError::Cursor(format!("invalid cursor column '{}'", position.column))
        })?;
    }
    Ok(())
}

impl SqlQb for Paginator {
    fn build(&self) -> OrmResult<Sql> {
        self.seek()?.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::qb;
    use crate::value::Value;

    fn by_name() -> SelectQb {
        qb::select("users").order_by("name")
    }

    #[test]
    fn key_is_required() {
        assert!(matches!(
            by_name().paginate().order(),
            Err(OrmError::PagingKeyMissing)
        ));
    }

    #[test]
    fn key_is_appended() {
        let order = by_name().paginate().key_asc("id").order().unwrap();
        assert_eq!(order, vec![OrderColumn::asc("name"), OrderColumn::asc("id")]);
    }

    #[test]
    fn key_must_be_last() {
        let err = qb::select("users")
            .order_by("id, name")
            .paginate()
            .key_asc("id")
            .order()
            .unwrap_err();
        assert!(matches!(err, OrmError::PagingKeyPosition));
        assert_eq!(err.to_string(), "pagination column should be placed at the end");
    }

    #[test]
    fn key_direction_must_match_order() {
        let err = qb::select("users")
            .order_by("name, -id")
            .paginate()
            .key_asc("id")
            .order()
            .unwrap_err();
        assert!(matches!(err, OrmError::Validation(_)));
    }

    #[test]
    fn cursor_must_end_at_key() {
        let short = Cursor::new(vec![Position::new("name", SortDir::Asc, "John")]);
        let err = by_name()
            .paginate()
            .key_asc("id")
            .cursor(short)
            .seek()
            .unwrap_err();
        assert!(matches!(err, OrmError::PagingKeyPosition));

        let flipped_key = Cursor::new(vec![
            Position::new("name", SortDir::Asc, "John"),
            Position::new("id", SortDir::Desc, 3),
        ]);
        let err = by_name()
            .paginate()
            .key_asc("id")
            .cursor(flipped_key)
            .seek()
            .unwrap_err();
        assert!(matches!(err, OrmError::PagingKeyPosition));
    }

    #[test]
    fn cursor_columns_must_be_identifiers() {
        let hostile = "1=1) OR (SELECT pg_sleep(10)) IS NULL OR (id";
        let cursor = Cursor::new(vec![
            Position::new(hostile, SortDir::Asc, 1),
            Position::new("id", SortDir::Asc, 1),
        ]);
        let token = cursor.encode().unwrap();
        let pager = qb::select("users").paginate().key_asc("id");

        assert!(matches!(pager.clone().token(&token), Err(OrmError::Cursor(_))));
        assert!(matches!(
            pager.cursor(cursor).compile(Dialect::Postgres),
            Err(OrmError::Cursor(_))
        ));
    }

    #[test]
    fn quoted_cursor_columns_are_requoted() {
        let cursor = Cursor::new(vec![
            Position::new(r#""Display Name""#, SortDir::Asc, "ann"),
            Position::new("id", SortDir::Asc, 2),
        ]);
        let token = cursor.encode().unwrap();
        let sql = qb::select("users")
            .paginate()
            .key_asc("id")
            .token(&token)
            .unwrap()
            .to_sql(Dialect::MySql)
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE (`Display Name` > ? OR (`Display Name` = ? AND id > ?)) ORDER BY `Display Name` ASC, id ASC"
        );
    }

    #[test]
    fn zero_limit_is_rejected() {
        let pager = by_name().paginate().key_asc("id").limit(0);
        assert!(matches!(pager.seek(), Err(OrmError::Validation(_))));
    }

    #[test]
    fn first_page_has_no_predicate() {
        let pager = by_name().paginate().key_asc("id").limit(10);
        assert_eq!(pager.predicate(), None);
        assert_eq!(
            pager.to_sql(Dialect::Postgres).unwrap(),
            "SELECT * FROM users ORDER BY name ASC, id ASC LIMIT 11"
        );
    }

    #[test]
    fn continuation_query() {
        let cursor = Cursor::new(vec![
            Position::new("name", SortDir::Asc, "bob"),
            Position::new("id", SortDir::Asc, 4),
        ]);
        let pager = by_name()
            .eq("active", true)
            .paginate()
            .key_asc("id")
            .cursor(cursor)
            .limit(2)
            .overfetch(false);
        let c = pager.compile(Dialect::MySql).unwrap();
        assert_eq!(
            c.sql,
            "SELECT * FROM users WHERE active = ? AND (name > ? OR (name = ? AND id > ?)) ORDER BY name ASC, id ASC LIMIT 2"
        );
        assert_eq!(
            c.args,
            vec![
                Value::Bool(true),
                Value::from("bob"),
                Value::from("bob"),
                Value::Int(4)
            ]
        );
    }

    #[test]
    fn descending_uses_less_than() {
        let cursor = Cursor::new(vec![Position::new("created_at", SortDir::Desc, 9)]);
        let pager = qb::select("events").paginate().key_desc("created_at").cursor(cursor);
        assert_eq!(
            pager.predicate().unwrap().to_sql(Dialect::Postgres),
            "created_at < $1"
        );
    }

    #[test]
    fn base_query_is_untouched() {
        let base = by_name().limit(5);
        let _ = base.paginate().key_asc("id").seek().unwrap();
        assert_eq!(
            base.to_sql(Dialect::Postgres).unwrap(),
            "SELECT * FROM users ORDER BY name ASC LIMIT 5"
        );
    }
}
