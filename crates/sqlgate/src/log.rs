//! `tracing` output for executed statements.

use crate::dialect::Dialect;
use crate::error::OrmError;
use std::time::Duration;
use tracing::Level;

/// Kind of statement, detected from its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl StatementKind {
    /// `WITH ... SELECT` counts as a select.
    pub fn from_sql(sql: &str) -> Self {
        let head = sql
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default();
        match head.to_ascii_uppercase().as_str() {
            "SELECT" | "WITH" => Self::Select,
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Other,
        }
    }
}

/// Emits every statement before it reaches the driver, and failures after.
///
/// Events use the `sqlgate.sql` target.
#[derive(Debug, Clone)]
pub struct SqlLogger {
    pub enabled: bool,
    pub level: Level,
    /// Truncate long SQL (in bytes, on a char boundary). `None` disables truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogger {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

impl SqlLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A logger that emits nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub fn truncate_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => {
                let mut end = max;
                while end > 0 && !sql.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &sql[..end]).into()
            }
            _ => sql.into(),
        }
    }

    pub fn before(&self, dialect: Dialect, sql: &str, param_count: usize) {
        if !self.enabled {
            return;
        }
        let kind = StatementKind::from_sql(sql);
        let sql = self.truncate_sql(sql);
        emit_at_level!(
            self.level,
            target: "sqlgate.sql",
            kind = ?kind,
            dialect = %dialect,
            param_count,
            sql = %sql,
            "executing statement"
        );
    }

    pub fn failed(&self, sql: &str, elapsed: Duration, err: &OrmError) {
        if !self.enabled {
            return;
        }
        let sql = self.truncate_sql(sql);
        tracing::warn!(
            target: "sqlgate.sql",
            elapsed_ms = elapsed.as_millis() as u64,
            error = %err,
            sql = %sql,
            "statement failed"
        );
    }
}
