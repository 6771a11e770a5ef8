//! Clause value objects held by the builder.

use crate::qb::builder::Builder;
use crate::value::Value;

/// A column reference: an identifier subject to prefixing and quoting, or a
/// raw SQL fragment rendered verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Name(String),
    Raw(String),
}

impl From<&str> for ColumnRef {
    fn from(s: &str) -> Self {
        ColumnRef::Name(s.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(s: String) -> Self {
        ColumnRef::Name(s)
    }
}

impl From<&String> for ColumnRef {
    fn from(s: &String) -> Self {
        ColumnRef::Name(s.clone())
    }
}

/// Raw SQL fragment used in a column position.
///
/// ```ignore
/// qb::table("orders").having_op(raw("count(*)"), ">", 3);
/// ```
pub fn raw(expr: impl Into<String>) -> ColumnRef {
    ColumnRef::Raw(expr.into())
}

/// Logical connective placed before a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Glue {
    #[default]
    And,
    Or,
}

impl Glue {
    pub fn as_str(self) -> &'static str {
        match self {
            Glue::And => "and",
            Glue::Or => "or",
        }
    }
}

/// Rendering shape of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredicateKind {
    /// `<col> <op> ?`
    #[default]
    Basic,
    /// `<col> <op> null`, nothing bound
    Null,
    /// `<col> <op> (?,?,...)`
    In,
}

/// A where/having predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub(crate) column: ColumnRef,
    pub(crate) operator: String,
    pub(crate) values: Vec<Value>,
    pub(crate) glue: Glue,
    pub(crate) kind: PredicateKind,
}

impl Predicate {
    /// `<col> <op> ?` bound to `value`.
    pub fn new(column: impl Into<ColumnRef>, operator: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator: operator.to_string(),
            values: vec![value.into()],
            glue: Glue::And,
            kind: PredicateKind::Basic,
        }
    }

    /// `<col> is null`
    pub fn is_null(column: impl Into<ColumnRef>) -> Self {
        Self::null_with(column, "is")
    }

    /// `<col> is not null`
    pub fn is_not_null(column: impl Into<ColumnRef>) -> Self {
        Self::null_with(column, "is not")
    }

    fn null_with(column: impl Into<ColumnRef>, operator: &str) -> Self {
        Self {
            column: column.into(),
            operator: operator.to_string(),
            values: Vec::new(),
            glue: Glue::And,
            kind: PredicateKind::Null,
        }
    }

    /// `<col> in (...)`, one placeholder per value.
    pub fn in_list<I, V>(column: impl Into<ColumnRef>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::list_with(column, "in", values)
    }

    /// `<col> not in (...)`
    pub fn not_in_list<I, V>(column: impl Into<ColumnRef>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::list_with(column, "not in", values)
    }

    fn list_with<I, V>(column: impl Into<ColumnRef>, operator: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            column: column.into(),
            operator: operator.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            glue: Glue::And,
            kind: PredicateKind::In,
        }
    }

    /// Override the connective.
    pub fn glue(mut self, glue: Glue) -> Self {
        self.glue = glue;
        self
    }

    /// Override the rendering kind.
    pub fn kind(mut self, kind: PredicateKind) -> Self {
        self.kind = kind;
        self
    }

    /// Values bound for this predicate, matching the placeholders it renders.
    pub fn bound_values(&self) -> Vec<Value> {
        match self.kind {
            PredicateKind::Basic => vec![self.values.first().cloned().unwrap_or_default()],
            PredicateKind::Null => Vec::new(),
            PredicateKind::In => self.values.clone(),
        }
    }
}

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
        }
    }
}

/// Right-hand side of a join condition.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOperand {
    Column(ColumnRef),
    Value(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    pub(crate) glue: Glue,
    pub(crate) first: ColumnRef,
    pub(crate) operator: String,
    pub(crate) second: JoinOperand,
}

/// A join with one or more `on` conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub(crate) kind: JoinKind,
    pub(crate) table: String,
    pub(crate) conditions: Vec<JoinCondition>,
}

impl JoinClause {
    pub fn new(kind: JoinKind, table: &str) -> Self {
        Self {
            kind,
            table: table.to_string(),
            conditions: Vec::new(),
        }
    }

    /// `and <first> <op> <second>` comparing two columns.
    pub fn on(self, first: impl Into<ColumnRef>, operator: &str, second: impl Into<ColumnRef>) -> Self {
        self.condition(Glue::And, first.into(), operator, JoinOperand::Column(second.into()))
    }

    pub fn or_on(self, first: impl Into<ColumnRef>, operator: &str, second: impl Into<ColumnRef>) -> Self {
        self.condition(Glue::Or, first.into(), operator, JoinOperand::Column(second.into()))
    }

    /// `and <first> <op> ?` with the value bound in the join category.
    pub fn on_value(self, first: impl Into<ColumnRef>, operator: &str, value: impl Into<Value>) -> Self {
        self.condition(Glue::And, first.into(), operator, JoinOperand::Value(value.into()))
    }

    pub fn or_on_value(self, first: impl Into<ColumnRef>, operator: &str, value: impl Into<Value>) -> Self {
        self.condition(Glue::Or, first.into(), operator, JoinOperand::Value(value.into()))
    }

    fn condition(mut self, glue: Glue, first: ColumnRef, operator: &str, second: JoinOperand) -> Self {
        self.conditions.push(JoinCondition {
            glue,
            first,
            operator: operator.to_string(),
            second,
        });
        self
    }

    pub(crate) fn bound_values(&self) -> impl Iterator<Item = Value> + '_ {
        self.conditions.iter().filter_map(|c| match &c.second {
            JoinOperand::Value(v) => Some(v.clone()),
            JoinOperand::Column(_) => None,
        })
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub(crate) column: ColumnRef,
    pub(crate) direction: Direction,
}

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Min,
    Max,
    Sum,
    Avg,
}

impl AggregateFn {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub(crate) function: AggregateFn,
    pub(crate) column: ColumnRef,
}

/// A nested select appended with `union` / `union all`.
#[derive(Debug, Clone)]
pub struct Union {
    pub(crate) query: Box<Builder>,
    pub(crate) all: bool,
}
