//! The fluent query builder.

use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};
use crate::qb::binding::{Bindings, Category};
use crate::qb::clause::{
    Aggregate, AggregateFn, ColumnRef, Direction, Glue, JoinClause, JoinKind, Order, Predicate,
    Union,
};
use crate::qb::grammar::Grammar;
use crate::qb::insert::{InsertData, InsertSource};
use crate::qb::statement::{BatchStatement, Statement, StatementKind};
use crate::result::{FirstRow, Rows};
use crate::value::Value;

/// Accumulates clauses for one statement.
///
/// Every clause method consumes and returns the builder. Terminal methods
/// consume it too: one builder compiles exactly one statement.
#[derive(Clone, Debug, Default)]
pub struct Builder {
    pub(crate) grammar: Grammar,
    pub(crate) table: String,
    pub(crate) columns: Vec<ColumnRef>,
    pub(crate) distinct: bool,
    pub(crate) aggregate: Option<Aggregate>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) wheres: Vec<Predicate>,
    pub(crate) groups: Vec<ColumnRef>,
    pub(crate) havings: Vec<Predicate>,
    pub(crate) orders: Vec<Order>,
    pub(crate) offset: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) unions: Vec<Union>,
    pub(crate) bindings: Bindings,
}

impl Builder {
    /// A builder without table prefix.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grammar(grammar: Grammar) -> Self {
        Self {
            grammar,
            ..Self::default()
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    // ==================== Columns / table ====================

    pub fn table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    /// Output columns. An empty list selects `*`.
    pub fn select<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // ==================== JOIN ====================

    /// `left join <table> on <first> <op> <second>`
    pub fn left_join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_with(JoinKind::Left, table, |j| j.on(first, operator, second))
    }

    /// `right join <table> on <first> <op> <second>`
    pub fn right_join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_with(JoinKind::Right, table, |j| j.on(first, operator, second))
    }

    /// `inner join <table> on <first> <op> <second>`
    pub fn inner_join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_with(JoinKind::Inner, table, |j| j.on(first, operator, second))
    }

    /// Join with conditions built by `build`.
    ///
    /// ```ignore
    /// qb::table("user").join_with(JoinKind::Left, "orders", |j| {
    ///     j.on("user.id", "=", "orders.user_id").on_value("orders.state", "=", 1)
    /// });
    /// ```
    pub fn join_with<F>(mut self, kind: JoinKind, table: &str, build: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        let join = build(JoinClause::new(kind, table));
        self.bindings.extend(Category::Join, join.bound_values());
        self.joins.push(join);
        self
    }

    // ==================== WHERE ====================

    /// Add a fully specified predicate (operator, value, glue and kind).
    pub fn where_pred(mut self, predicate: Predicate) -> Self {
        self.bindings
            .extend(Category::Where, predicate.bound_values());
        self.wheres.push(predicate);
        self
    }

    /// `<col> is null`
    pub fn where_null(self, column: impl Into<ColumnRef>) -> Self {
        self.where_pred(Predicate::is_null(column))
    }

    /// `<col> is not null`
    pub fn where_not_null(self, column: impl Into<ColumnRef>) -> Self {
        self.where_pred(Predicate::is_not_null(column))
    }

    /// `<col> = ?`
    pub fn where_eq(self, column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        self.where_op(column, "=", value)
    }

    /// `<col> <op> ?`
    pub fn where_op(self, column: impl Into<ColumnRef>, operator: &str, value: impl Into<Value>) -> Self {
        self.where_pred(Predicate::new(column, operator, value))
    }

    /// `<col> in (?, ...)`, one placeholder per value.
    pub fn where_in<I, V>(self, column: impl Into<ColumnRef>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_pred(Predicate::in_list(column, values))
    }

    /// `<col> not in (?, ...)`
    pub fn where_not_in<I, V>(self, column: impl Into<ColumnRef>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_pred(Predicate::not_in_list(column, values))
    }

    pub fn or_where_null(self, column: impl Into<ColumnRef>) -> Self {
        self.where_pred(Predicate::is_null(column).glue(Glue::Or))
    }

    pub fn or_where_not_null(self, column: impl Into<ColumnRef>) -> Self {
        self.where_pred(Predicate::is_not_null(column).glue(Glue::Or))
    }

    pub fn or_where_eq(self, column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        self.or_where_op(column, "=", value)
    }

    pub fn or_where_op(self, column: impl Into<ColumnRef>, operator: &str, value: impl Into<Value>) -> Self {
        self.where_pred(Predicate::new(column, operator, value).glue(Glue::Or))
    }

    pub fn or_where_in<I, V>(self, column: impl Into<ColumnRef>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_pred(Predicate::in_list(column, values).glue(Glue::Or))
    }

    pub fn or_where_not_in<I, V>(self, column: impl Into<ColumnRef>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_pred(Predicate::not_in_list(column, values).glue(Glue::Or))
    }

    // ==================== GROUP BY / HAVING ====================

    pub fn group_by<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.groups.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn having_pred(mut self, predicate: Predicate) -> Self {
        self.bindings
            .extend(Category::Having, predicate.bound_values());
        self.havings.push(predicate);
        self
    }

    pub fn having_eq(self, column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        self.having_op(column, "=", value)
    }

    pub fn having_op(self, column: impl Into<ColumnRef>, operator: &str, value: impl Into<Value>) -> Self {
        self.having_pred(Predicate::new(column, operator, value))
    }

    pub fn having_null(self, column: impl Into<ColumnRef>) -> Self {
        self.having_pred(Predicate::is_null(column))
    }

    pub fn having_in<I, V>(self, column: impl Into<ColumnRef>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.having_pred(Predicate::in_list(column, values))
    }

    pub fn or_having_eq(self, column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        self.or_having_op(column, "=", value)
    }

    pub fn or_having_op(self, column: impl Into<ColumnRef>, operator: &str, value: impl Into<Value>) -> Self {
        self.having_pred(Predicate::new(column, operator, value).glue(Glue::Or))
    }

    // ==================== ORDER / OFFSET / LIMIT ====================

    /// Ascending order on `column`. Repeated calls add further order terms.
    pub fn order_by(self, column: impl Into<ColumnRef>) -> Self {
        self.order_by_dir(column, Direction::Asc)
    }

    pub fn order_by_desc(self, column: impl Into<ColumnRef>) -> Self {
        self.order_by_dir(column, Direction::Desc)
    }

    pub fn order_by_dir(mut self, column: impl Into<ColumnRef>, direction: Direction) -> Self {
        self.orders.push(Order {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Row limit. Values `<= 0` are ignored.
    pub fn limit(mut self, limit: i64) -> Self {
        if limit > 0 {
            self.limit = Some(limit as u64);
        }
        self
    }

    // ==================== UNION ====================

    /// `union <query>`. The query's bindings are captured now.
    pub fn union(self, query: Builder) -> Self {
        self.push_union(query, false)
    }

    /// `union all <query>`
    pub fn union_all(self, query: Builder) -> Self {
        self.push_union(query, true)
    }

    fn push_union(mut self, query: Builder, all: bool) -> Self {
        self.bindings
            .extend(Category::Union, query.bindings.flatten_for(StatementKind::Select));
        self.unions.push(Union {
            query: Box::new(query),
            all,
        });
        self
    }

    // ==================== Aggregate ====================

    /// Replace the output with `<fn>(<column>) as aggregate`.
    ///
    /// Clears the column list. Without a group-by the order terms are dropped
    /// as well.
    pub fn aggregate(mut self, function: AggregateFn, column: impl Into<ColumnRef>) -> Self {
        self.columns.clear();
        self.aggregate = Some(Aggregate {
            function,
            column: column.into(),
        });
        if self.groups.is_empty() {
            self.orders.clear();
        }
        self
    }

    // ==================== Compilation ====================

    /// Select SQL text.
    pub fn to_sql(&self) -> String {
        self.grammar.compile_select(self)
    }

    pub fn to_select(&self) -> Statement {
        Statement::new(self.to_sql(), self.bindings.flatten_for(StatementKind::Select))
    }

    /// Insert of the first row of `data`.
    pub fn to_insert<S: InsertSource + ?Sized>(&self, data: &S) -> OrmResult<Statement> {
        let InsertData { columns, mut rows } = InsertData::single(data)?;
        let mut bindings = self.bindings.clone();
        bindings.extend(Category::Insert, rows.pop().unwrap_or_default());
        Ok(Statement::new(
            self.grammar.compile_insert(self, &columns),
            bindings.flatten_for(StatementKind::Insert),
        ))
    }

    /// One insert statement plus a parameter row per element of `data`.
    pub fn to_multi_insert<S: InsertSource + ?Sized>(&self, data: &S) -> OrmResult<BatchStatement> {
        let InsertData { columns, rows } = InsertData::multi(data)?;
        Ok(BatchStatement {
            sql: self.grammar.compile_insert(self, &columns),
            rows,
        })
    }

    /// Update setting each `(column, value)` in iteration order.
    pub fn to_update<I, K, V>(&self, data: I) -> OrmResult<Statement>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut bindings = self.bindings.clone();
        let mut columns = Vec::new();
        for (column, value) in data {
            columns.push(column.into());
            bindings.push(Category::Update, value.into());
        }
        if columns.is_empty() {
            return Err(OrmError::EmptyUpdate);
        }
        Ok(Statement::new(
            self.grammar.compile_update(self, &columns),
            bindings.flatten_for(StatementKind::Update),
        ))
    }

    pub fn to_delete(&self) -> Statement {
        Statement::new(
            self.grammar.compile_delete(self),
            self.bindings.flatten_for(StatementKind::Delete),
        )
    }

    // ==================== Terminals ====================

    /// Run the select and return every row.
    pub async fn get(self, conn: &mut Connection) -> OrmResult<Rows> {
        let stmt = self.to_select();
        conn.select(&stmt.sql, &stmt.bindings).await
    }

    /// Run the select and keep only the first row. Adds `limit 1` unless a
    /// limit is already set.
    pub async fn first(mut self, conn: &mut Connection) -> OrmResult<FirstRow> {
        self.limit.get_or_insert(1);
        FirstRow::from_rows(self.get(conn).await?).await
    }

    /// `count(*)`. An empty result counts as zero.
    pub async fn count(self, conn: &mut Connection) -> OrmResult<i64> {
        self.count_of("*", conn).await
    }

    /// `count(<column>)`, honoring `distinct`.
    pub async fn count_of(self, column: impl Into<ColumnRef>, conn: &mut Connection) -> OrmResult<i64> {
        let text = match self.run_aggregate(AggregateFn::Count, column.into(), conn).await {
            Ok(text) => text,
            Err(OrmError::NoRows) => return Ok(0),
            Err(e) => return Err(e),
        };
        text.trim()
            .parse()
            .map_err(|_| OrmError::decode("aggregate", format!("`{}` is not an integer", text)))
    }

    /// `min(<column>)` rendered as text. An empty result is [`OrmError::NoRows`].
    pub async fn min(self, column: impl Into<ColumnRef>, conn: &mut Connection) -> OrmResult<String> {
        self.run_aggregate(AggregateFn::Min, column.into(), conn).await
    }

    pub async fn max(self, column: impl Into<ColumnRef>, conn: &mut Connection) -> OrmResult<String> {
        self.run_aggregate(AggregateFn::Max, column.into(), conn).await
    }

    pub async fn sum(self, column: impl Into<ColumnRef>, conn: &mut Connection) -> OrmResult<String> {
        self.run_aggregate(AggregateFn::Sum, column.into(), conn).await
    }

    pub async fn avg(self, column: impl Into<ColumnRef>, conn: &mut Connection) -> OrmResult<String> {
        self.run_aggregate(AggregateFn::Avg, column.into(), conn).await
    }

    async fn run_aggregate(
        self,
        function: AggregateFn,
        column: ColumnRef,
        conn: &mut Connection,
    ) -> OrmResult<String> {
        let rows = self.aggregate(function, column).get(conn).await?;
        let first = FirstRow::from_rows(rows).await?;
        first
            .to_map()
            .and_then(|mut row| row.remove("aggregate"))
            .ok_or(OrmError::NoRows)
    }

    /// Insert the first row of `data` and return the generated id.
    ///
    /// `data` is a record, a map, or a sequence of either. Auto columns are
    /// left out.
    pub async fn insert<S: InsertSource + ?Sized>(self, data: &S, conn: &mut Connection) -> OrmResult<i64> {
        let stmt = self.to_insert(data)?;
        conn.insert(&stmt.sql, &stmt.bindings).await
    }

    /// Insert every element of the sequence `data` through one prepared
    /// statement, returning the generated ids in order.
    pub async fn multi_insert<S: InsertSource + ?Sized>(
        self,
        data: &S,
        conn: &mut Connection,
    ) -> OrmResult<Vec<i64>> {
        let batch = self.to_multi_insert(data)?;
        conn.multi_insert(&batch.sql, &batch.rows).await
    }

    /// Update and return the affected row count.
    pub async fn update<I, K, V>(self, data: I, conn: &mut Connection) -> OrmResult<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let stmt = self.to_update(data)?;
        conn.update(&stmt.sql, &stmt.bindings).await
    }

    /// Delete the rows matched by the where clause.
    pub async fn delete(self, conn: &mut Connection) -> OrmResult<u64> {
        let stmt = self.to_delete();
        conn.delete(&stmt.sql, &stmt.bindings).await
    }
}
