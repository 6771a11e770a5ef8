//! A single execution context bound to one database address.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::DEFAULT_GROUP;
use crate::driver::{IsolationLevel, Session};
use crate::error::{OrmError, OrmResult};
use crate::manager::Manager;
use crate::monitor::SqlKind;
use crate::qb::Builder;
use crate::result::Rows;
use crate::value::Value;

/// Run `fut`, failing with [`OrmError::Timeout`] once `deadline` passes.
async fn bounded<T, F>(deadline: Option<Instant>, fut: F) -> OrmResult<T>
where
    F: Future<Output = OrmResult<T>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| OrmError::Timeout)?,
        None => fut.await,
    }
}

/// Binds an address (default master unless [`with_db`](Self::with_db) is
/// used) to one lazily acquired session.
///
/// The session is acquired on first use and reused for every later
/// operation. While a transaction is open every statement runs inside it.
/// A `Connection` is not shared between tasks; hand each task its own.
pub struct Connection {
    manager: Arc<Manager>,
    name: Option<String>,
    session: Option<Box<dyn Session>>,
    in_transaction: bool,
    /// `with_db` was called while a transaction held the session.
    rebound: bool,
    deadline: Option<Instant>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address())
            .field("connected", &self.session.is_some())
            .field("in_transaction", &self.in_transaction)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl Connection {
    pub fn new(manager: Arc<Manager>) -> Self {
        Self {
            manager,
            name: None,
            session: None,
            in_transaction: false,
            rebound: false,
            deadline: None,
        }
    }

    /// Route this connection to `group[::role]`.
    ///
    /// An open transaction keeps its session; the new address takes effect
    /// once it commits or rolls back.
    pub fn with_db(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        if self.in_transaction {
            self.rebound = true;
        } else {
            self.session = None;
        }
        self
    }

    /// Bound every following driver call by `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Bound every following driver call by `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    /// The address this connection resolves, e.g. `mysql` or `reports::slave`.
    pub fn address(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_GROUP)
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// A builder for `table` bound to the registry's grammar.
    pub fn table(&self, table: &str) -> Builder {
        self.query().table(table)
    }

    /// An empty builder bound to the registry's grammar.
    pub fn query(&self) -> Builder {
        Builder::with_grammar(self.manager.grammar().clone())
    }

    async fn session(&mut self) -> OrmResult<&mut (dyn Session + 'static)> {
        if self.session.is_none() {
            let db = match &self.name {
                Some(name) => self.manager.resolve(name)?,
                None => self.manager.resolve_default()?,
            };
            let session = bounded(self.deadline, db.acquire()).await?;
            self.session = Some(session);
        }
        self.session
            .as_deref_mut()
            .ok_or_else(|| OrmError::Other("session not acquired".into()))
    }

    /// Run a query and return its rows.
    pub async fn select(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<Rows> {
        self.manager
            .logger()
            .statement(SqlKind::Query, self.address(), sql, bindings);
        let deadline = self.deadline;
        let session = self.session().await?;
        let cursor = bounded(deadline, session.query(sql, bindings)).await?;
        Ok(Rows::new(cursor))
    }

    /// Execute an insert and return the generated id.
    pub async fn insert(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<i64> {
        Ok(self.exec(sql, bindings).await?.last_insert_id)
    }

    /// Execute one prepared insert per parameter row, returning each
    /// generated id in row order.
    pub async fn multi_insert(&mut self, sql: &str, rows: &[Vec<Value>]) -> OrmResult<Vec<i64>> {
        self.manager.logger().batch(self.address(), sql, rows);
        let deadline = self.deadline;
        let session = self.session().await?;
        let results = bounded(deadline, session.execute_batch(sql, rows)).await?;
        Ok(results.into_iter().map(|r| r.last_insert_id).collect())
    }

    /// Execute an update and return the affected row count.
    pub async fn update(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<u64> {
        Ok(self.exec(sql, bindings).await?.rows_affected)
    }

    /// Execute a delete and return the affected row count.
    pub async fn delete(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<u64> {
        Ok(self.exec(sql, bindings).await?.rows_affected)
    }

    async fn exec(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<crate::driver::ExecResult> {
        self.manager
            .logger()
            .statement(SqlKind::Exec, self.address(), sql, bindings);
        let deadline = self.deadline;
        let session = self.session().await?;
        bounded(deadline, session.execute(sql, bindings)).await
    }

    /// Open a SERIALIZABLE transaction on this connection's session.
    ///
    /// Does nothing when a transaction is already open.
    pub async fn begin_transaction(&mut self) -> OrmResult<()> {
        if self.in_transaction {
            return Ok(());
        }
        self.manager
            .logger()
            .transaction(SqlKind::Begin, self.address());
        let deadline = self.deadline;
        let session = self.session().await?;
        bounded(deadline, session.begin(IsolationLevel::Serializable)).await?;
        self.in_transaction = true;
        Ok(())
    }

    /// Commit the open transaction.
    pub async fn commit(&mut self) -> OrmResult<()> {
        self.finish(SqlKind::Commit).await
    }

    /// Roll back the open transaction.
    pub async fn rollback(&mut self) -> OrmResult<()> {
        self.finish(SqlKind::Rollback).await
    }

    async fn finish(&mut self, kind: SqlKind) -> OrmResult<()> {
        if !self.in_transaction {
            return Err(OrmError::NoActiveTransaction);
        }
        self.manager.logger().transaction(kind, self.address());
        self.in_transaction = false;
        let rebound = std::mem::take(&mut self.rebound);
        let deadline = self.deadline;
        let session = self.session().await?;
        let result = match kind {
            SqlKind::Commit => bounded(deadline, session.commit()).await,
            _ => bounded(deadline, session.rollback()).await,
        };
        // After a failed finish the server may still hold the transaction:
        // discard the session so the driver closes it instead of reusing it.
        if result.is_err() || rebound {
            self.session = None;
        }
        result
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.in_transaction {
            tracing::warn!(
                target: "fluentdb.sql",
                address = %self.address(),
                "connection dropped with an open transaction; the driver discards it"
            );
        }
    }
}
