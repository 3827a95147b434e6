//! ORDER BY items.

use crate::error::{OrmError, OrmResult};
use crate::ident::unquote;
use crate::sql::Sql;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl SortDir {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

/// One `(column, direction)` entry of an ORDER BY list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderColumn {
    pub column: String,
    pub dir: SortDir,
}

impl OrderColumn {
    pub fn new(column: impl Into<String>, dir: SortDir) -> Self {
        Self {
            column: column.into(),
            dir,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortDir::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortDir::Desc)
    }

    /// Parse one order expression.
    ///
    /// Accepted forms: `name`, `+name`, `-name`, `name asc`, `name DESC`.
    pub fn parse(expr: &str) -> OrmResult<Self> {
        let malformed = || OrmError::validation(format!("malformed order expression: '{expr}'"));
        let trimmed = expr.trim();
        let (body, prefixed) = match trimmed.as_bytes().first() {
            Some(b'-') => (&trimmed[1..], Some(SortDir::Desc)),
            Some(b'+') => (&trimmed[1..], Some(SortDir::Asc)),
            _ => (trimmed, None),
        };

        let mut words = body.split_whitespace();
        let column = words.next().ok_or_else(malformed)?;
        let suffix = words.next();
        if words.next().is_some() {
            return Err(malformed());
        }

        let dir = match (prefixed, suffix) {
            (Some(dir), None) => dir,
            (None, None) => SortDir::Asc,
            (None, Some(s)) if s.eq_ignore_ascii_case("asc") => SortDir::Asc,
            (None, Some(s)) if s.eq_ignore_ascii_case("desc") => SortDir::Desc,
            _ => return Err(malformed()),
        };
        Ok(Self::new(column, dir))
    }

    /// Parse a comma-separated list: `"name, -created_at"`.
    pub fn parse_list(list: &str) -> OrmResult<Vec<Self>> {
        list.split(',').map(Self::parse).collect()
    }

    /// Whether both refer to the same column (quotes stripped, case-insensitive).
    pub fn same_column(&self, column: &str) -> bool {
        unquote(&self.column).eq_ignore_ascii_case(&unquote(column))
    }

    /// Same column and same direction.
    pub fn matches(&self, other: &OrderColumn) -> bool {
        self.dir == other.dir && self.same_column(&other.column)
    }

    pub(crate) fn append_to_sql(&self, sql: &mut Sql) {
        sql.push_column(&self.column).push(" ").push(self.dir.as_sql());
    }
}

impl fmt::Display for OrderColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.dir.as_sql())
    }
}

impl FromStr for OrderColumn {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
