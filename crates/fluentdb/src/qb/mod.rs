//! Query builder (QB) and SQL grammar.
//!
//! A [`Builder`] accumulates clauses; the [`Grammar`] renders them into SQL
//! with `?` placeholders; [`Bindings`] keeps parameters per clause category so
//! they flatten in the same order the grammar emits placeholders, no matter
//! in which order the clauses were added.
//!
//! # Usage
//!
//! ```ignore
//! use fluentdb::qb;
//!
//! let stmt = qb::table("user")
//!     .where_eq("name", "nopsky")
//!     .limit(10)
//!     .to_select();
//! assert_eq!(stmt.sql, "select * from user where `name` = ? limit 10");
//!
//! // Executed through a connection
//! let users: Vec<User> = conn
//!     .table("user")
//!     .where_in("id", [1, 2, 3])
//!     .order_by_desc("id")
//!     .get(&mut conn)
//!     .await?
//!     .to_records()
//!     .await?;
//! ```

mod binding;
mod builder;
mod clause;
mod grammar;
mod insert;
mod statement;

pub use binding::{Bindings, Category};
pub use builder::Builder;
pub use clause::{
    AggregateFn, ColumnRef, Direction, Glue, JoinClause, JoinKind, Predicate, PredicateKind, raw,
};
pub use grammar::Grammar;
pub use insert::{InsertRow, InsertSource};
pub use statement::{BatchStatement, Statement, StatementKind};

/// Create a builder for `table` without table prefix.
///
/// # Example
/// ```ignore
/// let qb = fluentdb::qb::table("users").where_eq("id", 1);
/// ```
pub fn table(table: &str) -> Builder {
    Builder::new().table(table)
}

#[cfg(test)]
mod tests;
