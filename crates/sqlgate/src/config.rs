//! Gateway configuration.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::log::SqlLogger;
use crate::named::MissingParam;
use serde::Deserialize;
use std::time::Duration;
use tracing::Level;
use url::Url;

/// Configuration for [`Gateway`](crate::Gateway).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Dialect statements are compiled for.
    pub dialect: Dialect,
    /// Connection string for the driver, as derived by [`GatewayConfig::from_url`].
    pub source: Option<String>,
    /// Applied to every call whose context carries no earlier deadline.
    pub query_timeout: Option<Duration>,
    pub log_sql: bool,
    pub log_level: Level,
    /// `None` logs SQL untruncated.
    pub max_log_sql_length: Option<usize>,
    /// Policy for unresolved markers in routines.
    pub missing_param: MissingParam,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            source: None,
            query_timeout: None,
            log_sql: true,
            log_level: Level::DEBUG,
            max_log_sql_length: Some(200),
            missing_param: MissingParam::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Derive the dialect and driver source from a connection URL.
    ///
    /// `mysql://` and `sqlite3://` URLs hand the driver everything after the scheme;
    /// other schemes keep the full URL.
    ///
    /// ```ignore
    /// let cfg = GatewayConfig::from_url("sqlite3://./app.db")?;
    /// assert_eq!(cfg.dialect, Dialect::Sqlite);
    /// assert_eq!(cfg.source.as_deref(), Some("./app.db"));
    /// ```
    pub fn from_url(conn: &str) -> OrmResult<Self> {
        let (dialect, source) = parse_url(conn)?;
        Ok(Self {
            source: Some(source),
            ..Self::new(dialect)
        })
    }

    /// Read the `[database]` table of a TOML document.
    ///
    /// ```toml
    /// [database]
    /// url = "postgres://localhost/app"   # or: dialect = "mysql"
    /// query_timeout_ms = 5000
    /// log_sql = true
    /// log_level = "info"
    /// max_log_sql_length = 500
    /// missing_param = "drop"
    /// ```
    pub fn from_toml_str(raw: &str) -> OrmResult<Self> {
        let file: ConfigFile =
            toml::from_str(raw).map_err(|e| OrmError::Config(format!("invalid config: {e}")))?;
        file.database.into_config()
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.query_timeout = Some(duration);
        self
    }

    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn max_log_sql_length(mut self, len: usize) -> Self {
        self.max_log_sql_length = Some(len);
        self
    }

    pub fn no_log_truncate(mut self) -> Self {
        self.max_log_sql_length = None;
        self
    }

    pub fn missing_param(mut self, policy: MissingParam) -> Self {
        self.missing_param = policy;
        self
    }

    pub(crate) fn logger(&self) -> SqlLogger {
        SqlLogger {
            enabled: self.log_sql,
            level: self.log_level,
            max_sql_length: self.max_log_sql_length,
        }
    }
}

/// Split a connection URL into its dialect and the driver's source string.
pub fn parse_url(conn: &str) -> OrmResult<(Dialect, String)> {
    let uri = Url::parse(conn).map_err(|e| OrmError::Config(format!("parse {conn}: {e}")))?;
    let scheme = uri.scheme().to_ascii_lowercase();
    let dialect: Dialect = scheme.parse()?;
    let source = match scheme.as_str() {
        "mysql" | "sqlite3" => conn
            .split_once("://")
            .map_or(conn, |(_, rest)| rest)
            .to_string(),
        _ => conn.to_string(),
    };
    Ok((dialect, source))
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    database: DatabaseSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DatabaseSection {
    url: Option<String>,
    dialect: Option<Dialect>,
    query_timeout_ms: Option<u64>,
    log_sql: Option<bool>,
    log_level: Option<String>,
    max_log_sql_length: Option<usize>,
    missing_param: Option<MissingParam>,
}

impl DatabaseSection {
    fn into_config(self) -> OrmResult<GatewayConfig> {
        let mut cfg = match self.url.as_deref() {
            Some(url) => GatewayConfig::from_url(url)?,
            None => GatewayConfig::default(),
        };
        if let Some(dialect) = self.dialect {
            cfg.dialect = dialect;
        }
        cfg.query_timeout = self.query_timeout_ms.map(Duration::from_millis);
        if let Some(enabled) = self.log_sql {
            cfg.log_sql = enabled;
        }
        if let Some(level) = self.log_level {
            cfg.log_level = level
                .parse()
                .map_err(|_| OrmError::Config(format!("invalid log_level: {level}")))?;
        }
        if let Some(len) = self.max_log_sql_length {
            cfg.max_log_sql_length = (len > 0).then_some(len);
        }
        if let Some(policy) = self.missing_param {
            cfg.missing_param = policy;
        }
        Ok(cfg)
    }
}
