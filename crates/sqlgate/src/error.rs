//! Error types for sqlgate

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for sqlgate operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Boxed driver error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Kind of integrity constraint reported by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    Check,
    ForeignKey,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unique => "unique",
            Self::Check => "check",
            Self::ForeignKey => "foreign key",
        })
    }
}

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Error returned by the driver, passed through unchanged
    #[error("Driver error: {0}")]
    Driver(#[source] BoxError),

    /// Query execution error
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Integrity constraint violation recognised in a driver error
    #[error("{kind} constraint violation{}: {source}", .name.as_deref().map(|n| format!(" ({n})")).unwrap_or_default())]
    Constraint {
        kind: ConstraintKind,
        name: Option<String>,
        #[source]
        source: BoxError,
    },

    /// Expected exactly one row, got none
    #[error("Not found: {0}")]
    NotFound(String),

    /// Expected exactly one row, got several
    #[error("Expected exactly one row, got {0}")]
    NotSingular(usize),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// A result column has no field to receive it
    #[error("Missing struct field for column: {0}")]
    UnknownColumn(String),

    /// Argument binding error
    #[error("Bind error: {0}")]
    Bind(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Mutation built from a record without primary key columns
    #[error("Entity '{0}' has no primary key column")]
    MissingPrimaryKey(String),

    /// Cursor does not agree with the query's ORDER BY
    #[error("pagination cursor position mismatch")]
    CursorMismatch,

    /// Paging key found before the end of the ORDER BY
    #[error("pagination column should be placed at the end")]
    PagingKeyPosition,

    /// No paging key configured
    #[error("pagination column not provided")]
    PagingKeyMissing,

    /// Malformed cursor token
    #[error("Invalid cursor: {0}")]
    Cursor(String),

    /// Named routine not present in the catalog
    #[error("Routine not found: {0}")]
    RoutineNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(Duration),

    /// Query cancelled through its context
    #[error("Query cancelled")]
    Cancelled,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Wrap an arbitrary driver error
    pub fn driver(err: impl Into<BoxError>) -> Self {
        Self::Driver(err.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a bind error
    pub fn bind(message: impl Into<String>) -> Self {
        Self::Bind(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a not singular error
    pub fn is_not_singular(&self) -> bool {
        matches!(self, Self::NotSingular(_))
    }

    /// Check if this is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::Constraint { .. })
    }

    /// Check if this is a unique constraint violation
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Constraint {
                kind: ConstraintKind::Unique,
                ..
            }
        )
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Name of the violated constraint, when the driver reported one.
    pub fn constraint_name(&self) -> Option<&str> {
        match self {
            Self::Constraint { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    /// Re-wrap a driver error as [`OrmError::Constraint`] when its message matches a
    /// known uniqueness/check constraint pattern. Any other error is returned unchanged.
    pub fn classify(self) -> Self {
        match self {
            Self::Driver(source) => match classify_message(&source.to_string()) {
                Some((kind, name)) => Self::Constraint { kind, name, source },
                None => Self::Driver(source),
            },
            other => other,
        }
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    #[cfg(feature = "postgres")]
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let kind = match db_err.code().code() {
                "23505" => Some(ConstraintKind::Unique),
                "23503" => Some(ConstraintKind::ForeignKey),
                "23514" => Some(ConstraintKind::Check),
                _ => None,
            };
            if let Some(kind) = kind {
                let name = db_err.constraint().map(str::to_string);
                return Self::Constraint {
                    kind,
                    name,
                    source: Box::new(err),
                };
            }
        }
        Self::Query(err)
    }
}

struct ConstraintPattern {
    kind: ConstraintKind,
    regex: Regex,
}

fn pattern(kind: ConstraintKind, re: &str) -> Option<ConstraintPattern> {
    Regex::new(re).ok().map(|regex| ConstraintPattern { kind, regex })
}

// The `name` group, when present, captures the constraint name.
static CONSTRAINT_PATTERNS: LazyLock<Vec<ConstraintPattern>> = LazyLock::new(|| {
    use ConstraintKind::*;
    [
        // mysql
        pattern(Unique, r"Duplicate entry .* for key '(?P<name>[^']+)'"),
        pattern(Unique, r"Error 1062"),
        pattern(Check, r"Error 3819: Check constraint '(?P<name>[^']+)'"),
        // sqlite
        pattern(Unique, r"UNIQUE constraint failed: (?P<name>[^\s,]+(?:, [^\s,]+)*)"),
        pattern(Check, r"CHECK constraint failed: (?P<name>\S+)"),
        pattern(ForeignKey, r"FOREIGN KEY constraint failed"),
        // postgres
        pattern(Unique, r#"duplicate key value violates unique constraint "(?P<name>[^"]+)""#),
        pattern(
            Check,
            r#"new row for relation "[^"]+" violates check constraint "(?P<name>[^"]+)""#,
        ),
        pattern(Check, r#"violates check constraint "(?P<name>[^"]+)""#),
        pattern(ForeignKey, r#"violates foreign key constraint "(?P<name>[^"]+)""#),
        // sqlserver
        pattern(
            Unique,
            r"Violation of (?:UNIQUE KEY|PRIMARY KEY) constraint '(?P<name>[^']+)'",
        ),
        pattern(Unique, r"Cannot insert duplicate key row"),
        pattern(Check, r#"conflicted with the CHECK constraint "(?P<name>[^"]+)""#),
        // oracle
        pattern(Unique, r"ORA-00001: unique constraint \((?P<name>[^)]+)\) violated"),
        pattern(Check, r"ORA-02290: check constraint \((?P<name>[^)]+)\) violated"),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// Recognise a constraint violation in a driver error message.
pub fn classify_message(message: &str) -> Option<(ConstraintKind, Option<String>)> {
    CONSTRAINT_PATTERNS.iter().find_map(|p| {
        p.regex.captures(message).map(|caps| {
            let name = caps.name("name").map(|m| m.as_str().to_string());
            (p.kind, name)
        })
    })
}
