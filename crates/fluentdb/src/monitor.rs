//! Statement logging through `tracing`.
//!
//! Every statement handed to a driver is emitted on target `fluentdb.sql` at
//! DEBUG, before it runs.

use std::fmt;

use crate::value::Value;

/// The kind of driver call being logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlKind {
    Query,
    Exec,
    Batch,
    Begin,
    Commit,
    Rollback,
}

impl fmt::Display for SqlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SqlKind::Query => "query",
            SqlKind::Exec => "exec",
            SqlKind::Batch => "batch",
            SqlKind::Begin => "begin",
            SqlKind::Commit => "commit",
            SqlKind::Rollback => "rollback",
        })
    }
}

/// Logs SQL with optional truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlLogger {
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogger {
    fn default() -> Self {
        Self {
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }

    pub(crate) fn statement(&self, kind: SqlKind, address: &str, sql: &str, params: &[Value]) {
        tracing::debug!(
            target: "fluentdb.sql",
            kind = %kind,
            address,
            param_count = params.len(),
            sql = %self.truncate_sql(sql),
            params = ?params,
        );
    }

    pub(crate) fn batch(&self, address: &str, sql: &str, rows: &[Vec<Value>]) {
        tracing::debug!(
            target: "fluentdb.sql",
            kind = %SqlKind::Batch,
            address,
            rows = rows.len(),
            sql = %self.truncate_sql(sql),
        );
    }

    pub(crate) fn transaction(&self, kind: SqlKind, address: &str) {
        tracing::debug!(target: "fluentdb.sql", kind = %kind, address);
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_sql_is_truncated() {
        let logger = SqlLogger::new().max_sql_length(10);
        assert_eq!(logger.truncate_sql("select * from users"), "select * f...");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("héllo", 2), "h");
    }

    #[test]
    fn no_truncate_keeps_sql() {
        let logger = SqlLogger::new().no_truncate();
        let sql = "x".repeat(500);
        assert_eq!(logger.truncate_sql(&sql), sql);
    }
}
