//! Registration configuration.
//!
//! Both types deserialize with serde so the host application can load them
//! from whatever format it already uses:
//!
//! ```json
//! {
//!   "table_prefix": "app_",
//!   "databases": [
//!     { "name": "mysql", "driver": "mysql", "dsn": "mysql://root@127.0.0.1/app", "max_open_conns": 20 },
//!     { "name": "mysql", "master": false, "driver": "mysql", "dsn": "mysql://root@10.0.0.2/app" }
//!   ]
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Group used when a database entry or address names none.
pub const DEFAULT_GROUP: &str = "mysql";

/// One physical database to register.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Logical group name. `None` registers under [`DEFAULT_GROUP`].
    #[serde(default)]
    pub name: Option<String>,
    /// Master or slave role.
    #[serde(default = "default_master")]
    pub master: bool,
    /// Driver identifier, looked up among the drivers known to the manager.
    pub driver: String,
    /// Driver-specific connection string.
    pub dsn: String,
    /// Maximum lifetime of a pooled connection, in seconds when deserialized.
    #[serde(default, deserialize_with = "deserialize_secs")]
    pub max_lifetime: Option<Duration>,
    /// Maximum idle connections kept in the pool.
    #[serde(default)]
    pub max_idle_conns: Option<u32>,
    /// Maximum open connections.
    #[serde(default)]
    pub max_open_conns: Option<u32>,
}

fn default_master() -> bool {
    true
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}

impl DatabaseConfig {
    /// A master entry in the default group.
    pub fn new(driver: impl Into<String>, dsn: impl Into<String>) -> Self {
        Self {
            name: None,
            master: true,
            driver: driver.into(),
            dsn: dsn.into(),
            max_lifetime: None,
            max_idle_conns: None,
            max_open_conns: None,
        }
    }

    /// Set the logical group name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Register as a slave (read replica).
    pub fn slave(mut self) -> Self {
        self.master = false;
        self
    }

    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = Some(lifetime);
        self
    }

    pub fn max_idle_conns(mut self, n: u32) -> Self {
        self.max_idle_conns = Some(n);
        self
    }

    pub fn max_open_conns(mut self, n: u32) -> Self {
        self.max_open_conns = Some(n);
        self
    }

    /// Group this entry registers under.
    pub fn group(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_GROUP,
        }
    }
}

/// Every database registered at startup plus shared settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistryConfig {
    /// Prefix applied to every table reference.
    #[serde(default)]
    pub table_prefix: String,
    #[serde(default)]
    pub databases: Vec<DatabaseConfig>,
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn database(mut self, db: DatabaseConfig) -> Self {
        self.databases.push(db);
        self
    }
}
