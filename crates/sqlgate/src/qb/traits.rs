//! Trait shared by all statement builders.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::sql::{Compiled, Sql};

/// A statement that can be validated, assembled and compiled for a dialect.
pub trait SqlQb {
    /// Validate builder state and assemble the dialect-agnostic statement.
    fn build(&self) -> OrmResult<Sql>;

    /// Whether the statement carries a RETURNING clause.
    fn has_returning(&self) -> bool {
        false
    }

    /// Compile to SQL text and arguments for `dialect`.
    fn compile(&self, dialect: Dialect) -> OrmResult<Compiled> {
        if self.has_returning() && !dialect.supports_returning() {
            return Err(OrmError::validation(format!(
                "RETURNING is not supported by {dialect}"
            )));
        }
        Ok(self.build()?.render(dialect))
    }

    /// Debug helper to get the SQL string.
    fn to_sql(&self, dialect: Dialect) -> OrmResult<String> {
        self.compile(dialect).map(|c| c.sql)
    }
}

impl SqlQb for Sql {
    fn build(&self) -> OrmResult<Sql> {
        Ok(self.clone())
    }
}

impl<Q: SqlQb + ?Sized> SqlQb for &Q {
    fn build(&self) -> OrmResult<Sql> {
        (**self).build()
    }

    fn has_returning(&self) -> bool {
        (**self).has_returning()
    }

    fn compile(&self, dialect: Dialect) -> OrmResult<Compiled> {
        (**self).compile(dialect)
    }
}

/// Append ` RETURNING a, b` when columns are present.
pub(crate) fn push_returning(sql: &mut Sql, columns: &[String]) {
    if columns.is_empty() {
        return;
    }
    sql.push(" RETURNING ").push(&columns.join(", "));
}

/// Message to keep in a builder's deferred `build_error`.
pub(crate) fn deferred_message(err: OrmError) -> String {
    match err {
        OrmError::Validation(msg) => msg,
        other => other.to_string(),
    }
}
