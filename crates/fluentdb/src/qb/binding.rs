//! Categorized parameter storage.

use crate::qb::statement::StatementKind;
use crate::value::Value;

/// Clause category a bound value belongs to.
///
/// The declaration order is the flatten order: placeholders are emitted by
/// the grammar in exactly this sequence for every statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Join,
    Insert,
    Update,
    Where,
    Having,
    Union,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Join,
        Category::Insert,
        Category::Update,
        Category::Where,
        Category::Having,
        Category::Union,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Ordered per-category parameter lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    slots: [Vec<Value>; 6],
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: Category, value: Value) {
        self.slots[category.slot()].push(value);
    }

    pub fn extend(&mut self, category: Category, values: impl IntoIterator<Item = Value>) {
        self.slots[category.slot()].extend(values);
    }

    pub fn get(&self, category: Category) -> &[Value] {
        &self.slots[category.slot()]
    }

    pub fn clear(&mut self, category: Category) {
        self.slots[category.slot()].clear();
    }

    pub fn len(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Vec::is_empty)
    }

    /// Concatenate every category in flatten order.
    pub fn flatten(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.len());
        for category in Category::ALL {
            out.extend_from_slice(self.get(category));
        }
        out
    }

    /// Concatenate the categories a statement kind renders, in flatten order.
    pub fn flatten_for(&self, kind: StatementKind) -> Vec<Value> {
        kind.categories()
            .iter()
            .flat_map(|&category| self.get(category).iter().cloned())
            .collect()
    }
}
