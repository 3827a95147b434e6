//! The contract between sqlgate and a database driver.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Rows returned by a query, with the result column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; builder-style for fixtures.
    pub fn row(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.rows.push(values.into_iter().collect());
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// A database connection (or transaction) that executes compiled SQL.
///
/// `sql` is already rendered for [`Driver::dialect`]; `args` follow the placeholder
/// order. Implementations should honour the [`Context`] deadline and cancellation.
pub trait Driver: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Run a statement that returns rows.
    fn query(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<Rows>> + Send;

    /// Run a statement that returns no rows.
    fn exec(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<ExecResult>> + Send;
}

impl<D: Driver + ?Sized> Driver for &D {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<Rows>> + Send {
        (**self).query(ctx, sql, args)
    }

    fn exec(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<ExecResult>> + Send {
        (**self).exec(ctx, sql, args)
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Per-call deadline and cancellation, passed through to the driver.
///
/// Clones share the same cancellation state.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Arc<CancelState>,
}

impl Context {
    /// A context with no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    /// Tighten the deadline to `timeout` from now; an earlier deadline is kept.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Cancel every call running under this context (or a clone of it).
    pub fn cancel(&self) {
        self.cancel.cancelled.store(true, Ordering::SeqCst);
        self.cancel.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Context::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.cancel.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Fail fast when the context is already cancelled or expired.
    pub fn check(&self) -> OrmResult<()> {
        if self.is_cancelled() {
            return Err(OrmError::Cancelled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Err(OrmError::Timeout(Duration::ZERO)),
            _ => Ok(()),
        }
    }

    /// Run `fut` under this context: it loses against cancellation and the deadline.
    pub async fn run<T, F>(&self, fut: F) -> OrmResult<T>
    where
        F: Future<Output = OrmResult<T>>,
    {
        self.check()?;
        match self.remaining() {
            Some(left) => tokio::select! {
                res = fut => res,
                _ = self.cancelled() => Err(OrmError::Cancelled),
                _ = tokio::time::sleep(left) => Err(OrmError::Timeout(left)),
            },
            None => tokio::select! {
                res = fut => res,
                _ = self.cancelled() => Err(OrmError::Cancelled),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_builder() {
        let rows = Rows::new(["id", "name"])
            .row([Value::Int(1), Value::from("a")])
            .row([Value::Int(2), Value::from("b")]);
        assert_eq!(rows.columns, vec!["id", "name"]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn timeout_keeps_earliest_deadline() {
        let ctx = Context::with_timeout(Duration::from_millis(10));
        let first = ctx.deadline().unwrap();
        let ctx = ctx.timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(first));
    }

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let ctx = Context::background();
        let clone = ctx.clone();
        let waiter = tokio::spawn(async move { clone.cancelled().await });
        ctx.cancel();
        waiter.await.unwrap();
        assert!(matches!(ctx.check(), Err(OrmError::Cancelled)));
    }

    #[tokio::test]
    async fn run_times_out() {
        let ctx = Context::with_timeout(Duration::from_millis(5));
        let res: OrmResult<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(res.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn run_passes_result_through() {
        let ctx = Context::background();
        assert_eq!(ctx.run(async { Ok(7) }).await.unwrap(), 7);
    }
}
