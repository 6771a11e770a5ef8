//! SQL rendering.
//!
//! The grammar never touches bindings: it emits one `?` per bound value in
//! the same category order [`Bindings::flatten_for`] produces.
//!
//! [`Bindings::flatten_for`]: crate::qb::Bindings::flatten_for

use crate::qb::builder::Builder;
use crate::qb::clause::{ColumnRef, JoinClause, JoinOperand, Predicate, PredicateKind};

const JSON_ARROW: &str = "->";

/// Renders builders into MySQL-flavored SQL (`?` placeholders, backtick
/// quoted columns) with a table prefix applied to every table reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    table_prefix: String,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: prefix.into(),
        }
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// `<prefix><table>`
    pub fn wrap_table(&self, table: &str) -> String {
        format!("{}{}", self.table_prefix, table)
    }

    /// Quote a column identifier.
    ///
    /// A `table.column` reference gets the table prefix on its table segment.
    /// The column segment is backtick quoted unless it is `*` or a JSON path
    /// (`->`), which pass through unquoted.
    pub fn wrap_column(&self, column: &str) -> String {
        let head = match column.find(JSON_ARROW) {
            Some(arrow) => &column[..arrow],
            None => column,
        };

        let (table, name) = match head.find('.') {
            Some(dot) => (Some(&column[..dot]), &column[dot + 1..]),
            None => (None, column),
        };

        let name = if name == "*" || name.contains(JSON_ARROW) {
            name.to_string()
        } else {
            format!("`{}`", name)
        };

        match table {
            Some(table) => format!("{}.{}", self.wrap_table(table), name),
            None => name,
        }
    }

    pub fn wrap_ref(&self, column: &ColumnRef) -> String {
        match column {
            ColumnRef::Name(name) => self.wrap_column(name),
            ColumnRef::Raw(expr) => expr.clone(),
        }
    }

    fn wrap_refs(&self, columns: &[ColumnRef]) -> String {
        columns
            .iter()
            .map(|c| self.wrap_ref(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render a select in fixed clause order; empty clauses are omitted.
    pub fn compile_select(&self, b: &Builder) -> String {
        let mut parts: Vec<String> = Vec::new();

        match &b.aggregate {
            Some(agg) => {
                let target = match &agg.column {
                    ColumnRef::Name(name) if b.distinct && name != "*" => {
                        format!("distinct {}", self.wrap_column(name))
                    }
                    other => self.wrap_ref(other),
                };
                parts.push(format!("{}({}) as aggregate", agg.function.as_str(), target));
            }
            None => {
                let columns = if b.columns.is_empty() {
                    "*".to_string()
                } else {
                    self.wrap_refs(&b.columns)
                };
                if b.distinct {
                    parts.push(format!("distinct {}", columns));
                } else {
                    parts.push(columns);
                }
            }
        }

        if !b.table.is_empty() {
            parts.push(format!("from {}", self.wrap_table(&b.table)));
        }

        if !b.joins.is_empty() {
            parts.push(self.compile_joins(&b.joins));
        }

        if !b.wheres.is_empty() {
            parts.push(format!("where {}", self.compile_predicates(&b.wheres)));
        }

        if !b.groups.is_empty() {
            parts.push(format!("group by {}", self.wrap_refs(&b.groups)));
        }

        if !b.havings.is_empty() {
            parts.push(format!("having {}", self.compile_predicates(&b.havings)));
        }

        if !b.orders.is_empty() {
            let orders = b
                .orders
                .iter()
                .map(|o| format!("{} {}", self.wrap_ref(&o.column), o.direction.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("order by {}", orders));
        }

        if let Some(offset) = b.offset {
            parts.push(format!("offset {}", offset));
        }

        if let Some(limit) = b.limit {
            parts.push(format!("limit {}", limit));
        }

        for union in &b.unions {
            let keyword = if union.all { "union all" } else { "union" };
            parts.push(format!("{} {}", keyword, self.compile_select(&union.query)));
        }

        format!("select {}", parts.join(" "))
    }

    /// `insert into <table> (<cols>) values (?,?,...)`, one placeholder per
    /// column regardless of how many rows are inserted.
    pub fn compile_insert(&self, b: &Builder, columns: &[String]) -> String {
        let cols = columns
            .iter()
            .map(|c| self.wrap_column(c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "insert into {} ({}) values ({})",
            self.wrap_table(&b.table),
            cols,
            placeholders(columns.len())
        )
    }

    /// `update <table> set a = ?, b = ? [where ...]`
    pub fn compile_update(&self, b: &Builder, columns: &[String]) -> String {
        let sets = columns
            .iter()
            .map(|c| format!("{} = ?", self.wrap_column(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("update {} set {}", self.wrap_table(&b.table), sets);
        self.append_where(&mut sql, b);
        sql
    }

    /// `delete from <table> [where ...]`
    pub fn compile_delete(&self, b: &Builder) -> String {
        let mut sql = format!("delete from {}", self.wrap_table(&b.table));
        self.append_where(&mut sql, b);
        sql
    }

    fn append_where(&self, sql: &mut String, b: &Builder) {
        if !b.wheres.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&self.compile_predicates(&b.wheres));
        }
    }

    fn compile_joins(&self, joins: &[JoinClause]) -> String {
        joins
            .iter()
            .map(|join| {
                let mut sql = format!("{} join {}", join.kind.as_str(), self.wrap_table(&join.table));
                for (i, cond) in join.conditions.iter().enumerate() {
                    sql.push(' ');
                    sql.push_str(if i == 0 { "on" } else { cond.glue.as_str() });
                    let second = match &cond.second {
                        JoinOperand::Column(col) => self.wrap_ref(col),
                        JoinOperand::Value(_) => "?".to_string(),
                    };
                    sql.push_str(&format!(" {} {} {}", self.wrap_ref(&cond.first), cond.operator, second));
                }
                sql
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render predicates in list order. The first predicate never carries
    /// its glue.
    fn compile_predicates(&self, predicates: &[Predicate]) -> String {
        let mut sql = String::new();
        for (i, pred) in predicates.iter().enumerate() {
            if i > 0 {
                sql.push(' ');
                sql.push_str(pred.glue.as_str());
                sql.push(' ');
            }
            sql.push_str(&self.compile_predicate(pred));
        }
        sql
    }

    fn compile_predicate(&self, pred: &Predicate) -> String {
        let column = self.wrap_ref(&pred.column);
        match pred.kind {
            PredicateKind::Basic => format!("{} {} ?", column, pred.operator),
            PredicateKind::Null => format!("{} {} null", column, pred.operator),
            PredicateKind::In if pred.values.is_empty() => {
                // Nothing to match: `in ()` is invalid SQL.
                if pred.operator.trim().eq_ignore_ascii_case("not in") {
                    "1=1".to_string()
                } else {
                    "1=0".to_string()
                }
            }
            PredicateKind::In => {
                format!("{} {} ({})", column, pred.operator, placeholders(pred.values.len()))
            }
        }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}
