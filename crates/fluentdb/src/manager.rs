//! Database registry and `group::role` routing.
//!
//! The registry is built once at startup through [`ManagerBuilder`] and is
//! read-only afterwards, so a shared `Arc<Manager>` needs no locking.
//!
//! ```ignore
//! let manager = Manager::builder()
//!     .driver("mysql", Arc::new(MySqlDriver))
//!     .register(&config)?
//!     .build();
//!
//! let mut conn = manager.with_db("reports::slave");
//! let total = conn.table("orders").count(&mut conn).await?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::Rng;

use crate::config::{DEFAULT_GROUP, DatabaseConfig, RegistryConfig};
use crate::connection::Connection;
use crate::driver::{Database, Driver};
use crate::error::{OrmError, OrmResult};
use crate::monitor::SqlLogger;
use crate::qb::{Builder, Grammar};
use crate::result::Rows;
use crate::value::Value;

/// Replica role within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    Master,
    Slave,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Slave => "slave",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(Role::Master),
            "slave" => Ok(Role::Slave),
            other => Err(OrmError::Other(format!("unknown role `{}`", other))),
        }
    }
}

/// A parsed `group[::role]` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub group: String,
    pub role: Role,
}

impl Address {
    pub fn new(group: impl Into<String>, role: Role) -> Self {
        Self {
            group: group.into(),
            role,
        }
    }

    /// Parse `group[::role]`. The role defaults to master and an empty group
    /// means [`DEFAULT_GROUP`]. An unknown role is reported as an
    /// unregistered address.
    pub fn parse(address: &str) -> OrmResult<Self> {
        let (group, role) = match address.split_once("::") {
            Some((group, role)) => (group, role),
            None => (address, Role::Master.as_str()),
        };
        let group = if group.is_empty() { DEFAULT_GROUP } else { group };
        let role = role
            .parse()
            .map_err(|_| OrmError::UnregisteredAddress(format!("{}::{}", group, role)))?;
        Ok(Self::new(group, role))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.group, self.role)
    }
}

type Registry = HashMap<String, HashMap<Role, Vec<Arc<dyn Database>>>>;

/// Process-wide registry of database handles.
pub struct Manager {
    registry: Registry,
    grammar: Grammar,
    logger: SqlLogger,
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut groups = f.debug_map();
        for (group, roles) in &self.registry {
            let counts: HashMap<_, _> = roles.iter().map(|(r, h)| (r.as_str(), h.len())).collect();
            groups.entry(group, &counts);
        }
        groups.finish()
    }
}

impl Manager {
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    /// Grammar (with table prefix) handed to every builder.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub(crate) fn logger(&self) -> &SqlLogger {
        &self.logger
    }

    /// Handles registered for `group`/`role`.
    pub fn handles(&self, group: &str, role: Role) -> &[Arc<dyn Database>] {
        self.registry
            .get(group)
            .and_then(|roles| roles.get(&role))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolve `group[::role]` to one handle, chosen uniformly at random
    /// among the replicas registered for that pair.
    pub fn resolve(&self, address: &str) -> OrmResult<Arc<dyn Database>> {
        self.resolve_address(&Address::parse(address)?)
    }

    pub fn resolve_address(&self, address: &Address) -> OrmResult<Arc<dyn Database>> {
        let handles = self.handles(&address.group, address.role);
        if handles.is_empty() {
            return Err(OrmError::UnregisteredAddress(address.to_string()));
        }
        let i = rand::rng().random_range(0..handles.len());
        tracing::trace!(
            target: "fluentdb.manager",
            address = %address,
            index = i,
            replicas = handles.len(),
            "selected handle"
        );
        Ok(Arc::clone(&handles[i]))
    }

    /// Master of the default group.
    pub fn resolve_default(&self) -> OrmResult<Arc<dyn Database>> {
        self.resolve_address(&Address::new(DEFAULT_GROUP, Role::Master))
    }

    /// A slave of `group`.
    pub fn resolve_slave(&self, group: &str) -> OrmResult<Arc<dyn Database>> {
        let group = if group.is_empty() { DEFAULT_GROUP } else { group };
        self.resolve_address(&Address::new(group, Role::Slave))
    }

    /// A connection to the default master.
    pub fn connection(self: &Arc<Self>) -> Connection {
        Connection::new(Arc::clone(self))
    }

    /// A connection bound to `group[::role]`.
    pub fn with_db(self: &Arc<Self>, name: &str) -> Connection {
        self.connection().with_db(name)
    }

    /// A connection on the default master with a transaction already open.
    pub async fn begin_transaction(self: &Arc<Self>) -> OrmResult<Connection> {
        let mut conn = self.connection();
        conn.begin_transaction().await?;
        Ok(conn)
    }

    /// A builder for `table` carrying this registry's grammar.
    pub fn table(&self, table: &str) -> Builder {
        Builder::with_grammar(self.grammar.clone()).table(table)
    }

    /// One-shot raw select on the default master.
    pub async fn select(self: &Arc<Self>, sql: &str, bindings: &[Value]) -> OrmResult<Rows> {
        self.connection().select(sql, bindings).await
    }

    /// One-shot raw insert; returns the last insert id.
    pub async fn insert(self: &Arc<Self>, sql: &str, bindings: &[Value]) -> OrmResult<i64> {
        self.connection().insert(sql, bindings).await
    }

    /// One-shot prepared batch insert; returns one id per row.
    pub async fn multi_insert(self: &Arc<Self>, sql: &str, rows: &[Vec<Value>]) -> OrmResult<Vec<i64>> {
        self.connection().multi_insert(sql, rows).await
    }

    /// One-shot raw update; returns affected rows.
    pub async fn update(self: &Arc<Self>, sql: &str, bindings: &[Value]) -> OrmResult<u64> {
        self.connection().update(sql, bindings).await
    }

    /// One-shot raw delete; returns affected rows.
    pub async fn delete(self: &Arc<Self>, sql: &str, bindings: &[Value]) -> OrmResult<u64> {
        self.connection().delete(sql, bindings).await
    }

    /// Close every registered handle.
    pub async fn close(&self) {
        for (group, roles) in &self.registry {
            for (role, handles) in roles {
                for handle in handles {
                    handle.close().await;
                }
                tracing::info!(target: "fluentdb.manager", group = %group, role = %role, "closed");
            }
        }
    }
}

/// Startup-time registration of drivers and database handles.
#[derive(Default)]
pub struct ManagerBuilder {
    drivers: HashMap<String, Arc<dyn Driver>>,
    registry: Registry,
    table_prefix: String,
    logger: SqlLogger,
}

impl fmt::Debug for ManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerBuilder")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .field("groups", &self.registry.keys().collect::<Vec<_>>())
            .field("table_prefix", &self.table_prefix)
            .finish_non_exhaustive()
    }
}

impl ManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `driver` available under identifier `id`.
    pub fn driver(mut self, id: impl Into<String>, driver: Arc<dyn Driver>) -> Self {
        self.drivers.insert(id.into(), driver);
        self
    }

    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Override statement logging settings.
    pub fn sql_logger(mut self, logger: SqlLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Register an already opened handle.
    pub fn add(mut self, group: impl Into<String>, role: Role, handle: Arc<dyn Database>) -> Self {
        self.registry
            .entry(group.into())
            .or_default()
            .entry(role)
            .or_default()
            .push(handle);
        self
    }

    /// Open and register one configured database.
    pub fn register_database(self, config: &DatabaseConfig) -> OrmResult<Self> {
        let group = config.group().to_string();
        let role = if config.master { Role::Master } else { Role::Slave };

        let driver = self.drivers.get(&config.driver).ok_or_else(|| {
            OrmError::config(format!(
                "no driver `{}` for database `{}::{}`",
                config.driver, group, role
            ))
        })?;
        let handle = driver.open(config).map_err(|e| {
            OrmError::config(format!("failed to open database `{}::{}`: {}", group, role, e))
        })?;

        tracing::info!(
            target: "fluentdb.manager",
            group = %group,
            role = %role,
            driver = %config.driver,
            "registered database"
        );
        Ok(self.add(group, role, handle))
    }

    /// Open and register every configured database; the config's table
    /// prefix replaces the current one when set.
    pub fn register(mut self, config: &RegistryConfig) -> OrmResult<Self> {
        if !config.table_prefix.is_empty() {
            self.table_prefix = config.table_prefix.clone();
        }
        for db in &config.databases {
            self = self.register_database(db)?;
        }
        Ok(self)
    }

    pub fn build(self) -> Arc<Manager> {
        Arc::new(Manager {
            registry: self.registry,
            grammar: Grammar::with_prefix(self.table_prefix),
            logger: self.logger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Session;
    use async_trait::async_trait;

    struct NoopDatabase;

    #[async_trait]
    impl Database for NoopDatabase {
        async fn acquire(&self) -> OrmResult<Box<dyn Session>> {
            Err(OrmError::Other("not connectable".into()))
        }

        async fn close(&self) {}
    }

    struct NoopDriver;

    impl Driver for NoopDriver {
        fn open(&self, config: &DatabaseConfig) -> OrmResult<Arc<dyn Database>> {
            if config.dsn.is_empty() {
                return Err(OrmError::Other("empty dsn".into()));
            }
            Ok(Arc::new(NoopDatabase))
        }
    }

    fn handle() -> Arc<dyn Database> {
        Arc::new(NoopDatabase)
    }

    #[test]
    fn address_parsing() {
        assert_eq!(Address::parse("orders").unwrap(), Address::new("orders", Role::Master));
        assert_eq!(Address::parse("orders::slave").unwrap(), Address::new("orders", Role::Slave));
        assert_eq!(Address::parse("::slave").unwrap(), Address::new(DEFAULT_GROUP, Role::Slave));
        assert_eq!(Address::new("a", Role::Slave).to_string(), "a::slave");
    }

    #[test]
    fn unknown_role_is_unregistered() {
        let err = Address::parse("orders::replica").unwrap_err();
        assert_eq!(err.to_string(), "database `orders::replica` not found");
    }

    #[test]
    fn missing_slave_names_the_pair() {
        let manager = Manager::builder().add("reports", Role::Master, handle()).build();
        let Err(err) = manager.resolve("reports::slave") else {
            panic!("slave pair should be unregistered");
        };
        assert!(matches!(err, OrmError::UnregisteredAddress(ref a) if a == "reports::slave"));

        let Err(err) = manager.resolve_slave("reports") else {
            panic!("slave pair should be unregistered");
        };
        assert!(err.to_string().contains("reports::slave"));
    }

    #[test]
    fn resolve_defaults_to_master_of_default_group() {
        let master = handle();
        let manager = Manager::builder()
            .add(DEFAULT_GROUP, Role::Master, Arc::clone(&master))
            .build();
        let got = manager.resolve_default().unwrap();
        assert!(Arc::ptr_eq(&got, &master));
        assert!(manager.resolve("").is_ok());
    }

    #[test]
    fn selection_stays_within_the_pair() {
        let slaves: Vec<_> = (0..3).map(|_| handle()).collect();
        let mut builder = Manager::builder().add("g", Role::Master, handle());
        for s in &slaves {
            builder = builder.add("g", Role::Slave, Arc::clone(s));
        }
        let manager = builder.build();

        let mut seen = [false; 3];
        for _ in 0..200 {
            let got = manager.resolve("g::slave").unwrap();
            let i = slaves.iter().position(|s| Arc::ptr_eq(s, &got)).unwrap();
            seen[i] = true;
        }
        assert!(seen.iter().all(|&s| s), "every replica should be picked eventually");
    }

    #[test]
    fn register_groups_by_name_and_role() {
        let config = RegistryConfig::new()
            .table_prefix("app_")
            .database(DatabaseConfig::new("noop", "dsn://m"))
            .database(DatabaseConfig::new("noop", "dsn://s1").slave())
            .database(DatabaseConfig::new("noop", "dsn://s2").slave())
            .database(DatabaseConfig::new("noop", "dsn://r").name("reports"));

        let manager = Manager::builder()
            .driver("noop", Arc::new(NoopDriver))
            .register(&config)
            .unwrap()
            .build();

        assert_eq!(manager.grammar().table_prefix(), "app_");
        assert_eq!(manager.handles(DEFAULT_GROUP, Role::Master).len(), 1);
        assert_eq!(manager.handles(DEFAULT_GROUP, Role::Slave).len(), 2);
        assert_eq!(manager.handles("reports", Role::Master).len(), 1);
        assert!(manager.handles("reports", Role::Slave).is_empty());
    }

    #[test]
    fn register_with_unknown_driver_fails() {
        let config = RegistryConfig::new().database(DatabaseConfig::new("pg", "dsn://x"));
        let err = Manager::builder().register(&config).unwrap_err();
        assert!(matches!(err, OrmError::Config(ref m) if m.contains("no driver `pg`")));
    }

    #[test]
    fn register_surfaces_open_failure() {
        let config = RegistryConfig::new().database(DatabaseConfig::new("noop", ""));
        let err = Manager::builder()
            .driver("noop", Arc::new(NoopDriver))
            .register(&config)
            .unwrap_err();
        assert!(matches!(err, OrmError::Config(ref m) if m.contains("mysql::master")));
    }

    #[test]
    fn table_builder_uses_prefix() {
        let manager = Manager::builder().table_prefix("t_").build();
        assert_eq!(manager.table("user").to_sql(), "select * from t_user");
    }
}
