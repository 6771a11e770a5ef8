//! Driver contract consumed by the connection layer.
//!
//! A [`Driver`] opens [`Database`] handles (pools) from configuration; a
//! database hands out [`Session`]s, each pinned to one physical connection
//! for as long as it lives. Transactions run on the session that began them.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_core::Stream;

use crate::config::DatabaseConfig;
use crate::error::OrmResult;
use crate::value::Value;

#[cfg(feature = "mysql")]
pub mod mysql;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    #[default]
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: i64,
}

type RowStream = Pin<Box<dyn Stream<Item = OrmResult<Vec<Value>>> + Send>>;

/// Column names plus a forward-only stream of rows.
pub struct RowCursor {
    columns: Vec<String>,
    rows: RowStream,
}

impl RowCursor {
    /// Create a cursor from any compatible stream.
    pub fn new<S>(columns: Vec<String>, rows: S) -> Self
    where
        S: Stream<Item = OrmResult<Vec<Value>>> + Send + 'static,
    {
        Self {
            columns,
            rows: Box::pin(rows),
        }
    }

    /// Create a cursor over rows already in memory.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self::new(columns, futures_util::stream::iter(rows.into_iter().map(Ok)))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Stream for RowCursor {
    type Item = OrmResult<Vec<Value>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rows.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for RowCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCursor")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// Opens database handles for one driver identifier (e.g. `"mysql"`).
pub trait Driver: Send + Sync {
    /// Create a handle for `config`, applying its pool settings.
    fn open(&self, config: &DatabaseConfig) -> OrmResult<Arc<dyn Database>>;
}

/// A physical database handle, usually a pool.
#[async_trait]
pub trait Database: Send + Sync {
    /// Check out a session pinned to one connection.
    async fn acquire(&self) -> OrmResult<Box<dyn Session>>;

    /// Close the handle; later acquires fail.
    async fn close(&self);
}

/// One checked-out connection.
#[async_trait]
pub trait Session: Send {
    /// Execute a statement with positional `?` parameters.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<ExecResult>;

    /// Run a query with positional `?` parameters.
    async fn query(&mut self, sql: &str, params: &[Value]) -> OrmResult<RowCursor>;

    async fn begin(&mut self, isolation: IsolationLevel) -> OrmResult<()>;

    async fn commit(&mut self) -> OrmResult<()>;

    async fn rollback(&mut self) -> OrmResult<()>;

    /// Execute one prepared statement once per parameter row.
    ///
    /// The default implementation runs [`Session::execute`] in a loop.
    async fn execute_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> OrmResult<Vec<ExecResult>> {
        let mut results = Vec::with_capacity(rows.len());
        for params in rows {
            results.push(self.execute(sql, params).await?);
        }
        Ok(results)
    }
}
