//! Result materialization.
//!
//! [`Rows`] wraps the cursor of an executed select and projects it into one
//! of three shapes: string rows, column-to-string maps, or typed records.

use std::collections::HashMap;

use futures_util::StreamExt;

use crate::driver::RowCursor;
use crate::error::OrmResult;
use crate::schema::{Record, schema_of};
use crate::value::Value;

/// The full result of a select.
#[derive(Debug)]
pub struct Rows {
    cursor: RowCursor,
}

impl Rows {
    pub fn new(cursor: RowCursor) -> Self {
        Self { cursor }
    }

    /// Column names reported by the query.
    pub fn columns(&self) -> &[String] {
        self.cursor.columns()
    }

    /// Advance the cursor by one raw row.
    pub async fn next_row(&mut self) -> OrmResult<Option<Vec<Value>>> {
        self.cursor.next().await.transpose()
    }

    /// Each row as its values rendered with [`Value::to_text`], in column order.
    pub async fn to_array(mut self) -> OrmResult<Vec<Vec<String>>> {
        let mut out = Vec::new();
        while let Some(row) = self.next_row().await? {
            out.push(row.into_iter().map(Value::into_text).collect());
        }
        Ok(out)
    }

    /// Each row as a column name to rendered value map.
    pub async fn to_map(mut self) -> OrmResult<Vec<HashMap<String, String>>> {
        let columns = self.cursor.columns().to_vec();
        let mut out = Vec::new();
        while let Some(row) = self.next_row().await? {
            out.push(
                columns
                    .iter()
                    .cloned()
                    .zip(row.into_iter().map(Value::into_text))
                    .collect(),
            );
        }
        Ok(out)
    }

    /// Each row scanned into a fresh `T`.
    ///
    /// Columns without a mapped field are discarded. A conversion failure
    /// stops consumption and drops the cursor.
    pub async fn to_records<T: Record>(self) -> OrmResult<Vec<T>> {
        let mut out = Vec::new();
        self.scan_into(&mut out).await?;
        Ok(out)
    }

    /// Append one `T` per row to `target`.
    pub async fn scan_into<T: Record>(mut self, target: &mut Vec<T>) -> OrmResult<()> {
        let schema = schema_of::<T>()?;
        let slots: Vec<_> = self
            .cursor
            .columns()
            .iter()
            .map(|name| schema.column(name))
            .collect();

        while let Some(row) = self.cursor.next().await {
            let mut record = T::default();
            for (slot, value) in slots.iter().zip(row?) {
                if let Some(column) = slot {
                    column.set(&mut record, value)?;
                }
            }
            target.push(record);
        }
        Ok(())
    }
}

/// Single-row view returned by `Builder::first`.
#[derive(Debug)]
pub struct FirstRow {
    columns: Vec<String>,
    row: Option<Vec<Value>>,
}

impl FirstRow {
    /// Take the first row of `rows` and release the cursor.
    pub async fn from_rows(mut rows: Rows) -> OrmResult<Self> {
        let row = rows.next_row().await?;
        Ok(Self {
            columns: rows.columns().to_vec(),
            row,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.row.is_none()
    }

    pub fn to_array(&self) -> Option<Vec<String>> {
        self.row
            .as_ref()
            .map(|row| row.iter().map(Value::to_text).collect())
    }

    pub fn to_map(&self) -> Option<HashMap<String, String>> {
        self.row.as_ref().map(|row| {
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().map(Value::to_text))
                .collect()
        })
    }

    pub fn to_record<T: Record>(&self) -> OrmResult<Option<T>> {
        let Some(row) = &self.row else {
            return Ok(None);
        };
        let schema = schema_of::<T>()?;
        let mut record = T::default();
        for (name, value) in self.columns.iter().zip(row) {
            if let Some(column) = schema.column(name) {
                column.set(&mut record, value.clone())?;
            }
        }
        Ok(Some(record))
    }
}
