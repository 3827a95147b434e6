//! SQL dialects and their placeholder, quoting and paging syntax.

use crate::error::OrmError;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// A database family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    MySql,
    #[default]
    Postgres,
    Sqlite,
    SqlServer,
    Oracle,
}

impl Dialect {
    /// Canonical driver name.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::SqlServer => "sqlserver",
            Dialect::Oracle => "oracle",
        }
    }

    /// Whether `INSERT/UPDATE/DELETE ... RETURNING` is available.
    pub fn supports_returning(self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::Sqlite)
    }

    /// Write the placeholder for the `index`-th (1-based) parameter.
    ///
    /// Named dialects use `name` when the slot carries one.
    pub fn write_placeholder(self, out: &mut String, index: usize, name: Option<&str>) {
        use std::fmt::Write;
        match self {
            Dialect::MySql | Dialect::Sqlite => out.push('?'),
            Dialect::Postgres => {
                let _ = write!(out, "${index}");
            }
            Dialect::SqlServer => match name {
                Some(name) => {
                    out.push('@');
                    out.push_str(name);
                }
                None => {
                    let _ = write!(out, "@p{index}");
                }
            },
            Dialect::Oracle => match name {
                Some(name) => {
                    out.push(':');
                    out.push_str(name);
                }
                None => {
                    let _ = write!(out, ":{index}");
                }
            },
        }
    }

    /// Write a quoted identifier part, escaping embedded closing quotes.
    pub fn write_quoted(self, out: &mut String, name: &str) {
        let (open, close) = match self {
            Dialect::MySql => ('`', '`'),
            Dialect::SqlServer => ('[', ']'),
            Dialect::Postgres | Dialect::Sqlite | Dialect::Oracle => ('"', '"'),
        };
        out.push(open);
        for ch in name.chars() {
            if ch == close {
                out.push(close);
            }
            out.push(ch);
        }
        out.push(close);
    }

    /// Write the paging clause for this dialect (with a leading space).
    pub fn write_limit(self, out: &mut String, limit: Option<u64>, offset: Option<u64>) {
        use std::fmt::Write;
        match self {
            Dialect::MySql | Dialect::Postgres | Dialect::Sqlite => {
                match (limit, offset) {
                    (Some(limit), _) => {
                        let _ = write!(out, " LIMIT {limit}");
                    }
                    // mysql and sqlite reject OFFSET without LIMIT
                    (None, Some(_)) if self == Dialect::MySql => {
                        out.push_str(" LIMIT 18446744073709551615");
                    }
                    (None, Some(_)) if self == Dialect::Sqlite => out.push_str(" LIMIT -1"),
                    (None, _) => {}
                }
                if let Some(offset) = offset {
                    let _ = write!(out, " OFFSET {offset}");
                }
            }
            Dialect::SqlServer | Dialect::Oracle => {
                if limit.is_none() && offset.is_none() {
                    return;
                }
                let _ = write!(out, " OFFSET {} ROWS", offset.unwrap_or(0));
                if let Some(limit) = limit {
                    let _ = write!(out, " FETCH NEXT {limit} ROWS ONLY");
                }
            }
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = OrmError;

    /// Accepts canonical names and common driver aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySql),
            "postgres" | "postgresql" | "pgx" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            "oracle" | "oci8" | "ora" | "goracle" | "godror" => Ok(Dialect::Oracle),
            other => Err(OrmError::Config(format!("unsupported dialect: {other}"))),
        }
    }
}

impl<'de> Deserialize<'de> for Dialect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
