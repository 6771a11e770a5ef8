//! # fluentdb
//!
//! A fluent SQL query builder for MySQL-flavored databases with typed result
//! mapping and master/slave routing.
//!
//! ## Features
//!
//! - **Fluent builder**: chain clauses, then call a terminal (`get`, `first`,
//!   `count`, `insert`, `update`, `delete`, ...)
//! - **Deterministic binding order**: parameters flatten per clause category,
//!   matching the placeholders the grammar emits
//! - **Typed mapping**: rows into structs via `#[derive(Record)]`, including
//!   flattened embedded records
//! - **Routing**: `group::role` addresses resolve to a random replica of the
//!   registered master or slave handles
//!
//! ## Example
//!
//! ```ignore
//! use fluentdb::{Manager, Record};
//!
//! #[derive(Debug, Default, Record)]
//! struct User {
//!     #[orm(column = "id", auto)]
//!     id: i64,
//!     #[orm(column = "name")]
//!     name: String,
//! }
//!
//! let manager = Manager::builder()
//!     .driver("mysql", Arc::new(fluentdb::driver::mysql::MySqlDriver))
//!     .register(&config)?
//!     .build();
//!
//! let mut conn = manager.connection();
//! let id = conn.table("user").insert(&User { name: "ann".into(), ..Default::default() }, &mut conn).await?;
//!
//! let users: Vec<User> = conn
//!     .table("user")
//!     .where_eq("name", "ann")
//!     .limit(10)
//!     .get(&mut conn)
//!     .await?
//!     .to_records()
//!     .await?;
//! ```

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod manager;
pub mod monitor;
pub mod qb;
pub mod result;
pub mod schema;
pub mod value;

pub use config::{DEFAULT_GROUP, DatabaseConfig, RegistryConfig};
pub use connection::Connection;
pub use driver::{Database, Driver, ExecResult, IsolationLevel, RowCursor, Session};
pub use error::{OrmError, OrmResult};
pub use manager::{Address, Manager, ManagerBuilder, Role};
pub use monitor::SqlLogger;
pub use qb::{Builder, Grammar, InsertRow, InsertSource, Statement, raw};
pub use result::{FirstRow, Rows};
pub use schema::{Record, Schema, SchemaBuilder, schema_of};
pub use value::{FromValue, Value};

#[cfg(feature = "derive")]
pub use fluentdb_derive::Record;
