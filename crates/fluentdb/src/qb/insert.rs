//! Insert data sources: records, maps and sequences of either.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// One row of insert data as ordered `(column, value)` pairs.
///
/// `#[derive(Record)]` implements this from the record schema, leaving out
/// `auto` columns.
pub trait InsertRow {
    fn insert_values(&self) -> OrmResult<Vec<(String, Value)>>;
}

/// Anything that can be inserted: a single row or a sequence of rows.
pub trait InsertSource {
    fn insert_rows(&self) -> OrmResult<Vec<Vec<(String, Value)>>>;

    /// Whether this source is a sequence (required by multi-row insert).
    fn is_sequence(&self) -> bool {
        false
    }
}

impl<T: InsertRow + ?Sized> InsertRow for &T {
    fn insert_values(&self) -> OrmResult<Vec<(String, Value)>> {
        (**self).insert_values()
    }
}

impl<K, V, S> InsertRow for HashMap<K, V, S>
where
    K: AsRef<str>,
    V: Into<Value> + Clone,
    S: BuildHasher,
{
    fn insert_values(&self) -> OrmResult<Vec<(String, Value)>> {
        let mut pairs: Vec<_> = self
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.clone().into()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(pairs)
    }
}

impl<K, V, S> InsertSource for HashMap<K, V, S>
where
    K: AsRef<str>,
    V: Into<Value> + Clone,
    S: BuildHasher,
{
    fn insert_rows(&self) -> OrmResult<Vec<Vec<(String, Value)>>> {
        Ok(vec![self.insert_values()?])
    }
}

impl<K, V> InsertRow for BTreeMap<K, V>
where
    K: AsRef<str>,
    V: Into<Value> + Clone,
{
    fn insert_values(&self) -> OrmResult<Vec<(String, Value)>> {
        Ok(self
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.clone().into()))
            .collect())
    }
}

impl<K, V> InsertSource for BTreeMap<K, V>
where
    K: AsRef<str>,
    V: Into<Value> + Clone,
{
    fn insert_rows(&self) -> OrmResult<Vec<Vec<(String, Value)>>> {
        Ok(vec![self.insert_values()?])
    }
}

impl<T: InsertRow> InsertSource for [T] {
    fn insert_rows(&self) -> OrmResult<Vec<Vec<(String, Value)>>> {
        self.iter().map(InsertRow::insert_values).collect()
    }

    fn is_sequence(&self) -> bool {
        true
    }
}

impl<T: InsertRow> InsertSource for Vec<T> {
    fn insert_rows(&self) -> OrmResult<Vec<Vec<(String, Value)>>> {
        self.as_slice().insert_rows()
    }

    fn is_sequence(&self) -> bool {
        true
    }
}

impl<T: InsertRow, const N: usize> InsertSource for [T; N] {
    fn insert_rows(&self) -> OrmResult<Vec<Vec<(String, Value)>>> {
        self.as_slice().insert_rows()
    }

    fn is_sequence(&self) -> bool {
        true
    }
}

/// Rows aligned to one merged column list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InsertData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl InsertData {
    /// Single-row insert: the first row only.
    pub fn single<S: InsertSource + ?Sized>(source: &S) -> OrmResult<Self> {
        let first = source.insert_rows()?.into_iter().next().unwrap_or_default();
        if first.is_empty() {
            return Err(OrmError::EmptyInsert);
        }
        let (columns, values): (Vec<String>, Vec<Value>) = first.into_iter().unzip();
        Ok(Self {
            columns,
            rows: vec![values],
        })
    }

    /// Multi-row insert. Columns are merged in first-seen order and a row
    /// lacking a column binds NULL for it.
    pub fn multi<S: InsertSource + ?Sized>(source: &S) -> OrmResult<Self> {
        if !source.is_sequence() {
            return Err(OrmError::NotASequence);
        }
        let rows = source.insert_rows()?;

        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (column, _) in rows.iter().flatten() {
            if !index.contains_key(column) {
                index.insert(column.clone(), columns.len());
                columns.push(column.clone());
            }
        }
        if columns.is_empty() {
            return Err(OrmError::EmptyInsert);
        }

        let rows = rows
            .into_iter()
            .map(|row| {
                let mut aligned = vec![Value::Null; columns.len()];
                for (column, value) in row {
                    if let Some(&i) = index.get(&column) {
                        aligned[i] = value;
                    }
                }
                aligned
            })
            .collect();

        Ok(Self { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn hashmap_columns_are_sorted() {
        let mut m = HashMap::new();
        m.insert("b", 2);
        m.insert("a", 1);
        let data = InsertData::single(&m).unwrap();
        assert_eq!(data.columns, ["a", "b"]);
        assert_eq!(data.rows, vec![vec![Value::Int(1), Value::Int(2)]]);
    }

    #[test]
    fn empty_map_is_empty_insert() {
        let m: HashMap<String, i64> = HashMap::new();
        assert!(matches!(InsertData::single(&m), Err(OrmError::EmptyInsert)));
    }

    #[test]
    fn single_uses_first_row() {
        let rows = vec![row(&[("a", 1)]), row(&[("a", 2)])];
        let data = InsertData::single(&rows).unwrap();
        assert_eq!(data.rows, vec![vec![Value::Int(1)]]);
    }

    #[test]
    fn multi_requires_sequence() {
        let m = row(&[("a", 1)]);
        assert!(matches!(InsertData::multi(&m), Err(OrmError::NotASequence)));
    }

    #[test]
    fn multi_rejects_empty_sequence() {
        let rows: Vec<BTreeMap<String, i64>> = Vec::new();
        assert!(matches!(InsertData::multi(&rows), Err(OrmError::EmptyInsert)));
    }

    #[test]
    fn multi_merges_columns_and_fills_null() {
        let rows = vec![row(&[("a", 1)]), row(&[("a", 2), ("b", 3)])];
        let data = InsertData::multi(&rows).unwrap();
        assert_eq!(data.columns, ["a", "b"]);
        assert_eq!(
            data.rows,
            vec![
                vec![Value::Int(1), Value::Null],
                vec![Value::Int(2), Value::Int(3)],
            ]
        );
    }
}
