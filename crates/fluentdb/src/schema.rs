//! Record schemas: the mapping between struct fields and column names.
//!
//! A [`Record`] describes its columns once; the resulting [`Schema`] is cached
//! per type and shared by the materializer (column -> field) and by insert
//! (field -> column/value pairs).
//!
//! ```ignore
//! use fluentdb::Record;
//!
//! #[derive(Debug, Default, Record)]
//! struct User {
//!     #[orm(column = "id", auto)]
//!     id: i64,
//!     #[orm(column = "name")]
//!     name: String,
//!     #[orm(flatten)]
//!     audit: Option<Audit>,
//!     #[orm(skip)]
//!     cached: bool,
//! }
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

type Getter<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Arc<dyn Fn(&mut T, Value) -> OrmResult<()> + Send + Sync>;

/// A struct whose fields map to result columns.
///
/// Usually derived with `#[derive(Record)]`. `Default` provides the fresh
/// instance each materialized row starts from.
pub trait Record: Default + 'static {
    /// Register every mapped column of `Self` on `schema`.
    fn describe(schema: &mut SchemaBuilder<Self>) -> OrmResult<()>;
}

/// One mapped column of a record type.
pub struct ColumnDef<T> {
    name: String,
    auto: bool,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T> ColumnDef<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Auto columns are populated by the database and left out of inserts.
    pub fn is_auto(&self) -> bool {
        self.auto
    }

    pub fn get(&self, record: &T) -> Value {
        (self.get)(record)
    }

    pub fn set(&self, record: &mut T, value: Value) -> OrmResult<()> {
        (self.set)(record, value).map_err(|e| e.with_column(&self.name))
    }
}

impl<T> Clone for ColumnDef<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            auto: self.auto,
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<T> fmt::Debug for ColumnDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("name", &self.name)
            .field("auto", &self.auto)
            .finish_non_exhaustive()
    }
}

/// Collects column definitions while a record describes itself.
pub struct SchemaBuilder<T> {
    columns: Vec<ColumnDef<T>>,
    index: HashMap<String, usize>,
}

impl<T: 'static> SchemaBuilder<T> {
    fn new() -> Self {
        Self {
            columns: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a column backed by a field accessor pair.
    pub fn column<G, S>(&mut self, name: &str, auto: bool, get: G, set: S) -> OrmResult<&mut Self>
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> OrmResult<()> + Send + Sync + 'static,
    {
        self.push(ColumnDef {
            name: name.to_string(),
            auto,
            get: Arc::new(get),
            set: Arc::new(set),
        })?;
        Ok(self)
    }

    /// Flatten the columns of an embedded record into this schema.
    ///
    /// `get` returns `None` when the embedded value is absent (reads then
    /// yield NULL). `get_mut` must materialize the embedded value, so an
    /// absent `Option` is initialized with its default before a column is set.
    pub fn embed<S, G, M>(&mut self, get: G, get_mut: M) -> OrmResult<&mut Self>
    where
        S: Record,
        G: Fn(&T) -> Option<&S> + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut S + Send + Sync + 'static,
    {
        let inner = schema_of::<S>()?;
        let get = Arc::new(get);
        let get_mut = Arc::new(get_mut);

        for col in inner.columns() {
            let outer_get = Arc::clone(&get);
            let inner_get = Arc::clone(&col.get);
            let outer_mut = Arc::clone(&get_mut);
            let inner_set = Arc::clone(&col.set);

            self.push(ColumnDef {
                name: col.name.clone(),
                auto: col.auto,
                get: Arc::new(move |t: &T| outer_get(t).map_or(Value::Null, |s| inner_get(s))),
                set: Arc::new(move |t: &mut T, v: Value| inner_set(outer_mut(t), v)),
            })?;
        }
        Ok(self)
    }

    fn push(&mut self, def: ColumnDef<T>) -> OrmResult<()> {
        if self.index.contains_key(&def.name) {
            return Err(OrmError::DuplicateColumn(def.name));
        }
        self.index.insert(def.name.clone(), self.columns.len());
        self.columns.push(def);
        Ok(())
    }

    fn finish(self) -> Schema<T> {
        Schema {
            columns: self.columns,
            index: self.index,
        }
    }
}

/// The resolved column map of a record type.
pub struct Schema<T> {
    columns: Vec<ColumnDef<T>>,
    index: HashMap<String, usize>,
}

impl<T> Schema<T> {
    /// Columns in declaration order, embedded records expanded in place.
    pub fn columns(&self) -> &[ColumnDef<T>] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef<T>> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column/value pairs for an insert, skipping auto columns.
    pub fn insert_values(&self, record: &T) -> Vec<(String, Value)> {
        self.columns
            .iter()
            .filter(|c| !c.auto)
            .map(|c| (c.name.clone(), c.get(record)))
            .collect()
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.columns.iter()).finish()
    }
}

type SchemaCache = Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

/// Resolve (and cache) the schema of `T`.
///
/// Fails with [`OrmError::DuplicateColumn`] when two fields, possibly through
/// embedded records, map to the same column.
pub fn schema_of<T: Record>() -> OrmResult<Arc<Schema<T>>> {
    static CACHE: OnceLock<SchemaCache> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let key = TypeId::of::<T>();

    let cached = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();
    if let Some(schema) = cached.and_then(|any| any.downcast::<Schema<T>>().ok()) {
        return Ok(schema);
    }

    // Don't hold the lock while describing: embedded records resolve their own schema.
    let mut builder = SchemaBuilder::new();
    T::describe(&mut builder)?;
    let schema = Arc::new(builder.finish());

    let mut map = cache.lock().unwrap_or_else(PoisonError::into_inner);
    let stored = map
        .entry(key)
        .or_insert_with(|| Arc::clone(&schema) as Arc<dyn Any + Send + Sync>);
    Ok(Arc::clone(stored).downcast::<Schema<T>>().unwrap_or(schema))
}
