//! Scripted in-memory driver for integration tests.
//!
//! Every database handle shares a [`Script`]: it records each call (tagged
//! with the handle name and session number) and replays queued replies.
//! Executes without a queued reply succeed with an auto-incrementing id.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fluentdb::{
    Database, DatabaseConfig, Driver, ExecResult, IsolationLevel, Manager, OrmError, OrmResult,
    Role, RowCursor, Session, Value,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Acquire,
    Query(String, Vec<Value>),
    Execute(String, Vec<Value>),
    Begin(IsolationLevel),
    Commit,
    Rollback,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub db: String,
    pub session: usize,
    pub call: Call,
}

pub enum Reply {
    Rows(Vec<String>, Vec<Vec<Value>>),
    Exec(ExecResult),
    Fail(OrmError),
}

#[derive(Default)]
pub struct Script {
    events: Mutex<Vec<Event>>,
    replies: Mutex<VecDeque<Reply>>,
    sessions: AtomicUsize,
    next_id: AtomicI64,
    delay: Mutex<Option<Duration>>,
    commit_error: Mutex<Option<String>>,
}

impl Script {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        self.reply(Reply::Rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows,
        ));
    }

    /// Make every query and execute sleep first.
    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Make the next commit fail with `message`.
    pub fn fail_next_commit(&self, message: &str) {
        *self.commit_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.events().into_iter().map(|e| e.call).collect()
    }

    /// Statements (query or execute) in the order they ran.
    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Query(sql, params) | Call::Execute(sql, params) => Some((sql, params)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, db: &str, session: usize, call: Call) {
        self.events.lock().unwrap().push(Event {
            db: db.to_string(),
            session,
            call,
        });
    }

    fn next_reply(&self) -> Option<Reply> {
        self.replies.lock().unwrap().pop_front()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

pub struct ScriptDatabase {
    name: String,
    script: Arc<Script>,
}

impl ScriptDatabase {
    pub fn handle(name: &str, script: &Arc<Script>) -> Arc<dyn Database> {
        Arc::new(Self {
            name: name.to_string(),
            script: Arc::clone(script),
        })
    }
}

#[async_trait]
impl Database for ScriptDatabase {
    async fn acquire(&self) -> OrmResult<Box<dyn Session>> {
        let id = self.script.sessions.fetch_add(1, Ordering::SeqCst);
        self.script.record(&self.name, id, Call::Acquire);
        Ok(Box::new(ScriptSession {
            db: self.name.clone(),
            id,
            script: Arc::clone(&self.script),
        }))
    }

    async fn close(&self) {}
}

struct ScriptSession {
    db: String,
    id: usize,
    script: Arc<Script>,
}

#[async_trait]
impl Session for ScriptSession {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        self.script.pause().await;
        self.script
            .record(&self.db, self.id, Call::Execute(sql.to_string(), params.to_vec()));
        match self.script.next_reply() {
            Some(Reply::Exec(result)) => Ok(result),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Rows(..)) => Err(OrmError::Other("rows queued for an execute".into())),
            None => Ok(ExecResult {
                rows_affected: 1,
                last_insert_id: self.script.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            }),
        }
    }

    async fn query(&mut self, sql: &str, params: &[Value]) -> OrmResult<RowCursor> {
        self.script.pause().await;
        self.script
            .record(&self.db, self.id, Call::Query(sql.to_string(), params.to_vec()));
        match self.script.next_reply() {
            Some(Reply::Rows(columns, rows)) => Ok(RowCursor::from_rows(columns, rows)),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Exec(_)) => Err(OrmError::Other("exec queued for a query".into())),
            None => Ok(RowCursor::from_rows(Vec::new(), Vec::new())),
        }
    }

    async fn begin(&mut self, isolation: IsolationLevel) -> OrmResult<()> {
        self.script.record(&self.db, self.id, Call::Begin(isolation));
        Ok(())
    }

    async fn commit(&mut self) -> OrmResult<()> {
        self.script.record(&self.db, self.id, Call::Commit);
        match self.script.commit_error.lock().unwrap().take() {
            Some(message) => Err(OrmError::Other(message)),
            None => Ok(()),
        }
    }

    async fn rollback(&mut self) -> OrmResult<()> {
        self.script.record(&self.db, self.id, Call::Rollback);
        Ok(())
    }
}

/// Opens [`ScriptDatabase`]s named after the configured DSN.
pub struct ScriptDriver(pub Arc<Script>);

impl Driver for ScriptDriver {
    fn open(&self, config: &DatabaseConfig) -> OrmResult<Arc<dyn Database>> {
        Ok(ScriptDatabase::handle(&config.dsn, &self.0))
    }
}

/// A manager with one default master named `master`.
pub fn manager(script: &Arc<Script>) -> Arc<Manager> {
    Manager::builder()
        .add("mysql", Role::Master, ScriptDatabase::handle("master", script))
        .build()
}
