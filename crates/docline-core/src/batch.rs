//! Rectangular text batch produced from one page of documents

use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, RecordBatchOptions, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;

use crate::path::Ambiguity;

/// One page of documents as a table: sorted columns, one text row per document.
///
/// Every row has exactly `columns.len()` cells; absent values are `""`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    ambiguities: Vec<Ambiguity>,
}

impl Batch {
    /// Batch with no columns and no rows
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        ambiguities: Vec<Ambiguity>,
    ) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self {
            columns,
            rows,
            ambiguities,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// No columns at all (nothing worth writing, even if rows exist)
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Key collisions seen while building the batch (one per column)
    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }

    /// Cells of row `idx` paired with their column names
    pub fn row(&self, idx: usize) -> Option<impl Iterator<Item = (&str, &str)>> {
        let row = self.rows.get(idx)?;
        Some(
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str)),
        )
    }

    /// Value of `column` in row `idx`
    pub fn cell(&self, idx: usize, column: &str) -> Option<&str> {
        let col = self.columns.binary_search_by(|c| c.as_str().cmp(column)).ok()?;
        self.rows.get(idx).map(|r| r[col].as_str())
    }

    /// All-`Utf8` Arrow schema over the batch columns
    pub fn schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| Field::new(c, DataType::Utf8, false))
                .collect::<Vec<_>>(),
        )
    }

    /// Convert to an Arrow `RecordBatch` (one `Utf8` array per column)
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let arrays: Vec<ArrayRef> = (0..self.columns.len())
            .map(|col| {
                let values = self.rows.iter().map(|r| r[col].as_str());
                Arc::new(StringArray::from_iter_values(values)) as ArrayRef
            })
            .collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.rows.len()));
        RecordBatch::try_new_with_options(Arc::new(self.schema()), arrays, &options)
    }
}
