//! Table views a SELECT can read from or join against.

use super::select::SelectQb;
use super::traits::SqlQb;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::sql::Sql;

/// A table, an aliased sub-select, or a CTE declared with [`SelectQb::with`].
#[derive(Debug, Clone)]
pub enum TableView {
    Table { name: Ident, alias: Option<Ident> },
    Select { query: Box<SelectQb>, alias: Ident },
    Cte(Ident),
}

impl TableView {
    /// Parse `name`, `name alias` or `name AS alias`.
    pub fn table(reference: &str) -> OrmResult<Self> {
        let words: Vec<&str> = reference.split_whitespace().collect();
        let (name, alias) = match words.as_slice() {
            [name] => (*name, None),
            [name, alias] => (*name, Some(*alias)),
            [name, kw, alias] if kw.eq_ignore_ascii_case("as") => (*name, Some(*alias)),
            _ => {
                return Err(OrmError::validation(format!(
                    "invalid table reference: '{reference}'"
                )));
            }
        };
        Ok(TableView::Table {
            name: Ident::parse(name)?,
            alias: alias.map(Ident::parse).transpose()?,
        })
    }

    pub fn select(query: SelectQb, alias: &str) -> OrmResult<Self> {
        Ok(TableView::Select {
            query: Box::new(query),
            alias: Ident::parse(alias)?,
        })
    }

    pub fn cte(name: &str) -> OrmResult<Self> {
        Ok(TableView::Cte(Ident::parse(name)?))
    }

    /// Name other clauses use to qualify this view's columns.
    pub fn qualifier(&self) -> &str {
        match self {
            TableView::Table {
                alias: Some(alias), ..
            } => alias.name(),
            TableView::Table { name, .. } => name.name(),
            TableView::Select { alias, .. } => alias.name(),
            TableView::Cte(name) => name.name(),
        }
    }

    pub(crate) fn append_to_sql(&self, sql: &mut Sql) -> OrmResult<()> {
        match self {
            TableView::Table { name, alias } => {
                sql.push_ident(name);
                if let Some(alias) = alias {
                    sql.push(" ").push_ident(alias);
                }
            }
            TableView::Select { query, alias } => {
                sql.push("(").push_sql(query.build()?).push(") AS ").push_ident(alias);
            }
            TableView::Cte(name) => {
                sql.push_ident(name);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

/// `<kind> <view> ON <condition>`
#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub view: TableView,
    pub on: String,
}

impl Join {
    pub(crate) fn append_to_sql(&self, sql: &mut Sql) -> OrmResult<()> {
        sql.push(" ").push(self.kind.as_sql()).push(" ");
        self.view.append_to_sql(sql)?;
        sql.push(" ON ").push(&self.on);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn render(view: &TableView) -> String {
        let mut sql = Sql::empty();
        view.append_to_sql(&mut sql).unwrap();
        sql.to_sql(Dialect::Postgres)
    }

    #[test]
    fn parses_aliases() {
        assert_eq!(render(&TableView::table("users").unwrap()), "users");
        assert_eq!(render(&TableView::table("users u").unwrap()), "users u");
        assert_eq!(render(&TableView::table("users AS u").unwrap()), "users u");
        assert_eq!(TableView::table("users AS u").unwrap().qualifier(), "u");
        assert!(TableView::table("users; drop").is_err());
        assert!(TableView::table("a b c d").is_err());
    }

    #[test]
    fn renders_subselect() {
        let inner = SelectQb::new("users").columns(&["id"]).eq("active", true);
        let view = TableView::select(inner, "t").unwrap();
        assert_eq!(
            render(&view),
            "(SELECT id FROM users WHERE active = $1) AS t"
        );
    }
}
