//! Execution front door: compile, log, run through a [`Driver`], map results.
//!
//! ```ignore
//! let gateway = Gateway::new(client).routines(RoutineCatalog::parse(SCRIPT)?);
//! let ctx = Context::with_timeout(Duration::from_secs(2));
//!
//! let active: Vec<User> = gateway
//!     .fetch_all(&ctx, qb::select("users").eq("status", "active"))
//!     .await?;
//! gateway.exec(&ctx, qb::update_entity(&user)?).await?;
//! ```

use crate::config::GatewayConfig;
use crate::dialect::Dialect;
use crate::driver::{Context, Driver, ExecResult, Rows};
use crate::error::{OrmError, OrmResult};
use crate::log::SqlLogger;
use crate::mapper::{Entity, Scanner};
use crate::named::NamedQuery;
use crate::pagination::{Page, Paginator};
use crate::qb::{SelectQb, SqlQb};
use crate::routine::{Routine, RoutineCatalog};
use crate::sql::Compiled;
use crate::value::{FromValue, Value};
use std::future::Future;
use std::time::Instant;

/// Runs statements through a driver.
///
/// Driver errors are classified into [`OrmError::Constraint`] when their message is
/// recognised, and nothing is retried.
#[derive(Debug)]
pub struct Gateway<D> {
    driver: D,
    config: GatewayConfig,
    logger: SqlLogger,
    routines: RoutineCatalog,
}

impl<D: Driver> Gateway<D> {
    pub fn new(driver: D) -> Self {
        let config = GatewayConfig::new(driver.dialect());
        Self {
            logger: config.logger(),
            driver,
            config,
            routines: RoutineCatalog::new(),
        }
    }

    /// Fails when the configured dialect is not the driver's.
    pub fn with_config(driver: D, config: GatewayConfig) -> OrmResult<Self> {
        if config.dialect != driver.dialect() {
            return Err(OrmError::Config(format!(
                "configured dialect {} does not match driver dialect {}",
                config.dialect,
                driver.dialect()
            )));
        }
        Ok(Self {
            logger: config.logger(),
            driver,
            config,
            routines: RoutineCatalog::new(),
        })
    }

    pub fn routines(mut self, catalog: RoutineCatalog) -> Self {
        self.routines = catalog;
        self
    }

    /// Parse `script` and add its routines to the catalog.
    pub fn load_routines(&mut self, script: &str) -> OrmResult<()> {
        self.routines.extend(RoutineCatalog::parse(script)?);
        Ok(())
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Resolve a catalog routine into a statement, using the configured
    /// missing-parameter policy.
    pub fn routine(&self, routine: &Routine) -> OrmResult<NamedQuery> {
        self.routines.resolve(routine, self.config.missing_param)
    }

    pub fn compile(&self, query: impl SqlQb) -> OrmResult<Compiled> {
        query.compile(self.dialect())
    }

    fn scoped(&self, ctx: &Context) -> Context {
        match self.config.query_timeout {
            Some(timeout) => ctx.clone().timeout(timeout),
            None => ctx.clone(),
        }
    }

    async fn run<T, F, Fut>(&self, ctx: &Context, compiled: &Compiled, call: F) -> OrmResult<T>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = OrmResult<T>>,
    {
        self.logger
            .before(self.dialect(), &compiled.sql, compiled.args.len());
        let ctx = self.scoped(ctx);
        let started = Instant::now();
        let result = ctx.run(call(ctx.clone())).await.map_err(OrmError::classify);
        if let Err(err) = &result {
            self.logger.failed(&compiled.sql, started.elapsed(), err);
        }
        result
    }

    /// Run a query and return the raw rows.
    pub async fn query(&self, ctx: &Context, query: impl SqlQb) -> OrmResult<Rows> {
        let compiled = self.compile(query)?;
        let (sql, args) = (compiled.sql.as_str(), compiled.args.as_slice());
        self.run(ctx, &compiled, |ctx| async move {
            self.driver.query(&ctx, sql, args).await
        })
        .await
    }

    /// Run a statement that returns no rows.
    pub async fn exec(&self, ctx: &Context, query: impl SqlQb) -> OrmResult<ExecResult> {
        let compiled = self.compile(query)?;
        let (sql, args) = (compiled.sql.as_str(), compiled.args.as_slice());
        self.run(ctx, &compiled, |ctx| async move {
            self.driver.exec(&ctx, sql, args).await
        })
        .await
    }

    /// Every row, scanned into `T` by result column name.
    pub async fn fetch_all<T: Entity>(&self, ctx: &Context, query: impl SqlQb) -> OrmResult<Vec<T>> {
        scan_rows(self.query(ctx, query).await?)
    }

    /// Exactly one row: none is [`OrmError::NotFound`], several is
    /// [`OrmError::NotSingular`].
    pub async fn fetch_one<T: Entity>(&self, ctx: &Context, query: impl SqlQb) -> OrmResult<T> {
        self.fetch_opt(ctx, query)
            .await?
            .ok_or_else(|| OrmError::not_found("Expected 1 row, got 0"))
    }

    /// At most one row.
    pub async fn fetch_opt<T: Entity>(
        &self,
        ctx: &Context,
        query: impl SqlQb,
    ) -> OrmResult<Option<T>> {
        let rows = self.query(ctx, query).await?;
        match rows.len() {
            0 => Ok(None),
            1 => scan_rows(rows).map(|mut v| v.pop()),
            n => Err(OrmError::NotSingular(n)),
        }
    }

    /// First column of the single row.
    pub async fn fetch_scalar<V: FromValue>(&self, ctx: &Context, query: impl SqlQb) -> OrmResult<V> {
        let rows = self.query(ctx, query).await?;
        let column = rows.columns.first().cloned().unwrap_or_default();
        let row = single(rows.rows)?;
        let value = row.into_iter().next().unwrap_or(Value::Null);
        V::from_value(value).map_err(|e| OrmError::decode(column, e.to_string()))
    }

    /// Number of rows `query` would return, ignoring its ORDER BY, LIMIT and OFFSET.
    pub async fn count(&self, ctx: &Context, query: &SelectQb) -> OrmResult<u64> {
        self.fetch_scalar(ctx, query.build_count()?).await
    }

    /// Fetch one page of `T` and compute the next cursor.
    pub async fn paginate<T: Entity>(&self, ctx: &Context, pager: &Paginator) -> OrmResult<Page<T>> {
        let rows = self.fetch_all(ctx, pager.seek()?).await?;
        pager.page(rows)
    }
}

fn single(rows: Vec<Vec<Value>>) -> OrmResult<Vec<Value>> {
    let n = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), n) {
        (None, _) => Err(OrmError::not_found("Expected 1 row, got 0")),
        (Some(row), 1) => Ok(row),
        (Some(_), n) => Err(OrmError::NotSingular(n)),
    }
}

fn scan_rows<T: Entity>(rows: Rows) -> OrmResult<Vec<T>> {
    Scanner::<T>::new(&rows.columns)?.scan_all(rows.rows)
}
