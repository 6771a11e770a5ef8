//! MySQL driver backed by `sqlx`.
//!
//! ```ignore
//! let manager = Manager::builder()
//!     .driver("mysql", Arc::new(MySqlDriver))
//!     .register(&config)?
//!     .build();
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::{MySql, MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::config::DatabaseConfig;
use crate::driver::{Database, Driver, ExecResult, IsolationLevel, RowCursor, Session};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Opens lazily connecting `sqlx` MySQL pools.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl Driver for MySqlDriver {
    fn open(&self, config: &DatabaseConfig) -> OrmResult<Arc<dyn Database>> {
        let mut options = MySqlPoolOptions::new();
        if let Some(max) = config.max_open_conns {
            options = options.max_connections(max);
        }
        if let Some(idle) = config.max_idle_conns {
            // sqlx has no idle cap; keep that many connections warm instead.
            let idle = config.max_open_conns.map_or(idle, |max| idle.min(max));
            options = options.min_connections(idle);
        }
        if let Some(lifetime) = config.max_lifetime {
            options = options.max_lifetime(lifetime);
        }
        let pool = options.connect_lazy(&config.dsn)?;
        Ok(Arc::new(MySqlDatabase { pool }))
    }
}

/// A MySQL pool.
#[derive(Debug, Clone)]
pub struct MySqlDatabase {
    pool: MySqlPool,
}

impl MySqlDatabase {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Database for MySqlDatabase {
    async fn acquire(&self) -> OrmResult<Box<dyn Session>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(MySqlSession {
            conn,
            in_transaction: false,
        }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// One pooled MySQL connection.
pub struct MySqlSession {
    conn: PoolConnection<MySql>,
    in_transaction: bool,
}

fn bind_values<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [Value],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            Value::Timestamp(ts) => query.bind(*ts),
        };
    }
    query
}

fn decode_column(row: &MySqlRow, index: usize) -> OrmResult<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOLEAN" => Value::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::Int(row.try_get_unchecked::<i64, _>(index)?)
        }
        name if name.ends_with("UNSIGNED") => Value::from(row.try_get_unchecked::<u64, _>(index)?),
        "FLOAT" | "DOUBLE" => Value::Float(row.try_get_unchecked::<f64, _>(index)?),
        "DATETIME" | "TIMESTAMP" => {
            Value::Timestamp(row.try_get_unchecked::<chrono::NaiveDateTime, _>(index)?)
        }
        "DATE" => Value::from(row.try_get_unchecked::<chrono::NaiveDate, _>(index)?),
        "TIME" => Value::Text(row.try_get_unchecked::<chrono::NaiveTime, _>(index)?.to_string()),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            Value::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?)
        }
        // CHAR, VARCHAR, TEXT, DECIMAL, JSON, ENUM, SET: textual on the wire.
        _ => Value::Text(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

impl MySqlSession {
    async fn raw(&mut self, sql: &str) -> OrmResult<()> {
        sqlx::raw_sql(sql).execute(&mut *self.conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Session for MySqlSession {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        let result = bind_values(sqlx::query(sql), params)
            .execute(&mut *self.conn)
            .await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: i64::try_from(result.last_insert_id())
                .map_err(|_| OrmError::decode("last_insert_id", "id exceeds i64"))?,
        })
    }

    /// Rows are fetched and decoded before the cursor is returned, so the
    /// cursor holds the whole result in memory.
    async fn query(&mut self, sql: &str, params: &[Value]) -> OrmResult<RowCursor> {
        let rows = bind_values(sqlx::query(sql), params)
            .fetch_all(&mut *self.conn)
            .await?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let values = rows
            .iter()
            .map(|row| (0..row.len()).map(|i| decode_column(row, i)).collect())
            .collect::<OrmResult<Vec<Vec<Value>>>>()?;

        Ok(RowCursor::from_rows(columns, values))
    }

    async fn begin(&mut self, isolation: IsolationLevel) -> OrmResult<()> {
        self.raw(&format!("SET TRANSACTION ISOLATION LEVEL {}", isolation.as_sql()))
            .await?;
        self.raw("START TRANSACTION").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> OrmResult<()> {
        self.raw("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> OrmResult<()> {
        self.raw("ROLLBACK").await?;
        self.in_transaction = false;
        Ok(())
    }
}

impl Drop for MySqlSession {
    fn drop(&mut self) {
        // Never hand a connection with an open transaction back to the pool.
        if self.in_transaction {
            self.conn.close_on_drop();
        }
    }
}
