//! Compiled statements.

use crate::qb::binding::Category;
use crate::value::Value;

/// Statement kind compiled from a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    /// Binding categories the grammar emits placeholders for, in flatten order.
    pub fn categories(self) -> &'static [Category] {
        match self {
            StatementKind::Select => &[
                Category::Join,
                Category::Where,
                Category::Having,
                Category::Union,
            ],
            StatementKind::Insert => &[Category::Insert],
            StatementKind::Update => &[Category::Update, Category::Where],
            StatementKind::Delete => &[Category::Where],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        }
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }

    /// Number of `?` placeholders in the SQL text.
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }
}

/// One prepared INSERT executed once per parameter row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatement {
    pub sql: String,
    pub rows: Vec<Vec<Value>>,
}

impl BatchStatement {
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }
}

fn count_placeholders(sql: &str) -> usize {
    sql.matches('?').count()
}
