//! Named-parameter statements.
//!
//! [`NamedQuery`] accepts SQL written with `:name` markers (and bare `?` markers,
//! which become `:arg0`, `:arg1`, ... left to right) and compiles it for any
//! [`Dialect`](crate::Dialect) through the same single-pass renderer as the
//! builders.
//!
//! ```ignore
//! let compiled = NamedQuery::new("SELECT * FROM users WHERE id = :id AND name = :name")
//!     .bind(("id", Value::from(1)))
//!     .bind(("name", Value::from("root")))
//!     .compile(Dialect::SqlServer)?;
//! assert_eq!(compiled.sql, "SELECT * FROM users WHERE id = @id AND name = @name");
//! ```

use crate::error::{OrmError, OrmResult};
use crate::ident::unquote;
use crate::mapper::{Entity, schema};
use crate::qb::SqlQb;
use crate::sql::Sql;
use crate::value::Value;
use serde::Deserialize;
use std::collections::HashMap;

/// What to do with a marker no argument resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingParam {
    /// Fail with [`OrmError::Bind`].
    #[default]
    Error,
    /// Leave the marker out of the emitted statement.
    Drop,
}

/// An argument source for [`NamedQuery::bind`].
#[derive(Debug, Clone)]
pub enum Arg {
    /// Consumed by the next marker no named source resolves.
    Value(Value),
    /// Several positional values, in order.
    Values(Vec<Value>),
    /// A single named value.
    Named(String, Value),
    /// Named values.
    Map(HashMap<String, Value>),
}

impl Arg {
    /// Every column of `record`, by column name.
    pub fn entity<T: Entity>(record: &T) -> Self {
        Arg::Map(
            schema::<T>()
                .column_values(record)
                .into_iter()
                .map(|(column, value)| (column.name.clone(), value))
                .collect(),
        )
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<Vec<Value>> for Arg {
    fn from(values: Vec<Value>) -> Self {
        Arg::Values(values)
    }
}

impl<K: Into<String>> From<(K, Value)> for Arg {
    fn from((name, value): (K, Value)) -> Self {
        Arg::Named(name.into(), value)
    }
}

impl From<HashMap<String, Value>> for Arg {
    fn from(map: HashMap<String, Value>) -> Self {
        Arg::Map(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Marker(String),
}

/// A statement with named markers plus its bound arguments.
///
/// A marker that no argument resolves fails compilation by default, unlike the
/// drop-silently behaviour some callers may expect. Pass [`MissingParam::Drop`]
/// to [`on_missing`](NamedQuery::on_missing) to leave such markers out instead.
#[derive(Debug, Clone)]
pub struct NamedQuery {
    segments: Vec<Segment>,
    /// Normalized (unquoted, lower-case) name to value; the first binding wins.
    named: HashMap<String, Value>,
    positional: Vec<Value>,
    missing: MissingParam,
}

impl NamedQuery {
    pub fn new(sql: &str) -> Self {
        Self {
            segments: parse(&rewrite_positional(sql)),
            named: HashMap::new(),
            positional: Vec::new(),
            missing: MissingParam::default(),
        }
    }

    /// Marker names in source order, duplicates kept.
    pub fn names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Marker(name) => Some(name.as_str()),
                Segment::Text(_) => None,
            })
            .collect()
    }

    /// Set the policy for markers no argument resolves.
    pub fn on_missing(mut self, policy: MissingParam) -> Self {
        self.missing = policy;
        self
    }

    /// Add an argument source.
    pub fn bind(mut self, arg: impl Into<Arg>) -> Self {
        match arg.into() {
            Arg::Value(v) => self.positional.push(v),
            Arg::Values(vs) => self.positional.extend(vs),
            Arg::Named(name, v) => self.add_named(&name, v),
            Arg::Map(map) => {
                for (name, v) in map {
                    self.add_named(&name, v);
                }
            }
        }
        self
    }

    /// Add a positional value.
    pub fn bind_value(self, value: impl Into<Value>) -> Self {
        self.bind(Arg::Value(value.into()))
    }

    /// Add a named value.
    pub fn bind_named(self, name: &str, value: impl Into<Value>) -> Self {
        self.bind(Arg::Named(name.to_string(), value.into()))
    }

    /// Add every column of `record` as a named value.
    pub fn bind_entity<T: Entity>(self, record: &T) -> Self {
        self.bind(Arg::entity(record))
    }

    fn add_named(&mut self, name: &str, value: Value) {
        self.named
            .entry(normalize(name))
            .or_insert(value);
    }
}

fn normalize(name: &str) -> String {
    unquote(name).to_ascii_lowercase()
}

impl SqlQb for NamedQuery {
    fn build(&self) -> OrmResult<Sql> {
        let mut sql = Sql::empty();
        let mut positional = self.positional.iter();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => {
                    sql.push(text);
                }
                Segment::Marker(name) => {
                    let value = self
                        .named
                        .get(&normalize(name))
                        .or_else(|| positional.next());
                    match (value, self.missing) {
                        (Some(v), _) => {
                            sql.push_named(name.as_str(), v.clone());
                        }
                        (None, MissingParam::Drop) => {}
                        (None, MissingParam::Error) => {
                            return Err(OrmError::bind(format!(
                                "no value bound for parameter ':{name}'"
                            )));
                        }
                    }
                }
            }
        }
        Ok(sql)
    }
}

/// Replace `?` markers outside string literals with `:argN` (0-based).
fn rewrite_positional(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut in_literal = false;
    let mut next = 0usize;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => {
                out.push_str(":arg");
                out.push_str(&next.to_string());
                next += 1;
            }
            _ => out.push(ch),
        }
    }
    out
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Split SQL into text and `:name` markers.
///
/// `::` casts and `:=` assignments are text, as is everything inside single quotes.
fn parse(sql: &str) -> Vec<Segment> {
    let bytes = sql.as_bytes();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                let end = sql[i + 1..]
                    .find('\'')
                    .map_or(bytes.len(), |p| i + 1 + p + 1);
                text.push_str(&sql[i..end]);
                i = end;
            }
            b':' if matches!(bytes.get(i + 1), Some(b':') | Some(b'=')) => {
                text.push_str(&sql[i..i + 2]);
                i += 2;
            }
            b':' if bytes.get(i + 1).copied().is_some_and(is_name_char) => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_name_char(bytes[end]) {
                    end += 1;
                }
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Marker(sql[start..end].to_string()));
                i = end;
            }
            _ => {
                // Advance by a whole character so multi-byte text is copied intact.
                let ch_len = sql[i..].chars().next().map_or(1, char::len_utf8);
                text.push_str(&sql[i..i + ch_len]);
                i += ch_len;
            }
        }
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}
