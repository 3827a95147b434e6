//! Named SQL routines.
//!
//! A catalog holds SQL text by name, usually parsed from a script whose statements
//! are introduced by `-- name: <routine>` header lines:
//!
//! ```sql
//! -- name: find-user
//! SELECT * FROM users WHERE id = :id
//!
//! -- name: touch-user
//! UPDATE users SET seen_at = now() WHERE id = ?
//! ```
//!
//! Reading the script from disk is left to the caller.

use crate::error::{OrmError, OrmResult};
use crate::named::{Arg, MissingParam, NamedQuery};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static HEADER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*--\s*name:\s*(?P<name>\S+)\s*$").ok());

/// SQL text by routine name.
#[derive(Debug, Clone, Default)]
pub struct RoutineCatalog {
    routines: HashMap<String, String>,
}

impl RoutineCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a script on `-- name:` headers.
    ///
    /// Text before the first header is ignored. A name defined twice is an error.
    pub fn parse(script: &str) -> OrmResult<Self> {
        let header = HEADER
            .as_ref()
            .ok_or_else(|| OrmError::Other("routine header pattern failed to compile".into()))?;
        let mut catalog = Self::new();
        let mut current: Option<(String, Vec<&str>)> = None;

        for line in script.lines() {
            if let Some(caps) = header.captures(line) {
                if let Some((name, body)) = current.take() {
                    catalog.define(name, &body)?;
                }
                current = Some((caps["name"].to_string(), Vec::new()));
            } else if let Some((_, body)) = current.as_mut() {
                body.push(line);
            }
        }
        if let Some((name, body)) = current {
            catalog.define(name, &body)?;
        }
        Ok(catalog)
    }

    fn define(&mut self, name: String, body: &[&str]) -> OrmResult<()> {
        if self.routines.contains_key(&name) {
            return Err(OrmError::Config(format!("routine '{name}' defined twice")));
        }
        self.routines.insert(name, body.join("\n").trim().to_string());
        Ok(())
    }

    /// Add or replace a routine.
    pub fn insert(&mut self, name: impl Into<String>, sql: impl Into<String>) {
        self.routines.insert(name.into(), sql.into());
    }

    /// Merge another catalog; its routines replace same-named ones.
    pub fn extend(&mut self, other: RoutineCatalog) {
        self.routines.extend(other.routines);
    }

    pub fn get(&self, name: &str) -> OrmResult<&str> {
        self.routines
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| OrmError::RoutineNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routines.contains_key(name)
    }

    /// Routine names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    /// Look up `routine` and bind its arguments.
    pub fn resolve(&self, routine: &Routine, missing: MissingParam) -> OrmResult<NamedQuery> {
        let sql = self.get(&routine.name)?;
        Ok(routine
            .args
            .iter()
            .cloned()
            .fold(NamedQuery::new(sql).on_missing(missing), |q, arg| q.bind(arg)))
    }
}

/// A call to a catalog routine: its name plus argument sources.
#[derive(Debug, Clone)]
pub struct Routine {
    name: String,
    args: Vec<Arg>,
}

impl Routine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an argument source, as for [`NamedQuery::bind`].
    pub fn bind(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::qb::SqlQb;
    use crate::value::Value;

    const SCRIPT: &str = "\
-- leading comment
-- name: find-user
SELECT *
FROM users
WHERE id = :id

--name: touch-user
UPDATE users SET seen = true WHERE id = ?
";

    #[test]
    fn splits_on_headers() {
        let catalog = RoutineCatalog::parse(SCRIPT).unwrap();
        assert_eq!(catalog.names(), vec!["find-user", "touch-user"]);
        assert_eq!(catalog.get("find-user").unwrap(), "SELECT *\nFROM users\nWHERE id = :id");
        assert_eq!(
            catalog.get("touch-user").unwrap(),
            "UPDATE users SET seen = true WHERE id = ?"
        );
    }

    #[test]
    fn unknown_routine() {
        let catalog = RoutineCatalog::parse(SCRIPT).unwrap();
        let err = catalog
            .resolve(&Routine::new("nope"), MissingParam::Error)
            .unwrap_err();
        assert!(matches!(err, OrmError::RoutineNotFound(ref n) if n == "nope"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let script = "-- name: a\nSELECT 1\n-- name: a\nSELECT 2\n";
        assert!(matches!(RoutineCatalog::parse(script), Err(OrmError::Config(_))));
    }

    #[test]
    fn resolves_with_arguments() {
        let catalog = RoutineCatalog::parse(SCRIPT).unwrap();
        let query = catalog
            .resolve(
                &Routine::new("touch-user").bind(Value::Int(3)),
                MissingParam::Error,
            )
            .unwrap();
        let c = query.compile(Dialect::SqlServer).unwrap();
        assert_eq!(c.sql, "UPDATE users SET seen = true WHERE id = @arg0");
        assert_eq!(c.args, vec![Value::Int(3)]);
    }
}
