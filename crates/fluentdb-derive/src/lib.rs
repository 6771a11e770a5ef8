//! Derive macros for fluentdb
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod common;
mod record;

/// Derive `Record` (column mapping) plus `InsertRow`/`InsertSource` for a struct.
///
/// # Example
///
/// ```ignore
/// use fluentdb::Record;
///
/// #[derive(Debug, Default, Clone, Record)]
/// struct User {
///     #[orm(column = "id", auto)]
///     id: i64,
///     #[orm(column = "user_name")]
///     name: String,
///     email: Option<String>,
///     #[orm(flatten)]
///     audit: Option<Audit>,
///     #[orm(skip)]
///     loaded: bool,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Map field to a different column name; `""` skips it
/// - `#[orm(auto)]` - Column is filled by the database and left out of inserts
/// - `#[orm(skip)]` - Field is not mapped
/// - `#[orm(flatten)]` - Field is an embedded `Record` (`T`, `Box<T>`, `Option<T>` or
///   `Option<Box<T>>`) whose columns are mapped as if declared here
///
/// Mapped fields must be `Clone`, convertible into `Value` and implement `FromValue`.
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
