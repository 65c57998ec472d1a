use std::sync::Arc;

use arrow::array::{new_empty_array, Array, ArrayRef};
use arrow::compute::{concat, concat_batches};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use tabload_error::{ErrorKind, Result, ResultExt, TabloadError};

use crate::datatype::ColumnTypes;

/// An immutable columnar table.
///
/// Data is held as a sequence of record batches ("chunks") that all share the
/// table's schema. Columns are exposed either per chunk through
/// [`Table::batches`] or concatenated through [`Table::column`].
#[derive(Debug, Clone)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        for (idx, batch) in batches.iter().enumerate() {
            if batch.schema() != schema {
                return Err(TabloadError::with_kind(
                    ErrorKind::SchemaConflict,
                    format!(
                        "Batch {idx} has schema {:?}, expected {:?}",
                        batch.schema(),
                        schema
                    ),
                ));
            }
        }
        Ok(Table { schema, batches })
    }

    /// Create a table with no rows.
    pub fn empty(schema: SchemaRef) -> Self {
        Table {
            schema,
            batches: Vec::new(),
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// Column types keyed by name.
    pub fn column_types(&self) -> ColumnTypes {
        self.schema
            .fields()
            .iter()
            .map(|f| (f.name().clone(), f.data_type().clone()))
            .collect()
    }

    /// Get a column with all chunks concatenated.
    pub fn column(&self, idx: usize) -> Result<ArrayRef> {
        let field = self.schema.fields().get(idx).ok_or_else(|| {
            TabloadError::new(format!(
                "Column index {idx} out of bounds for table with {} columns",
                self.num_columns()
            ))
        })?;

        match self.batches.len() {
            0 => Ok(new_empty_array(field.data_type())),
            1 => Ok(Arc::clone(self.batches[0].column(idx))),
            _ => {
                let chunks: Vec<&dyn Array> =
                    self.batches.iter().map(|b| b.column(idx).as_ref()).collect();
                concat(&chunks).context("failed to concatenate column chunks")
            }
        }
    }

    pub fn column_by_name(&self, name: &str) -> Result<Option<ArrayRef>> {
        match self.schema.index_of(name) {
            Ok(idx) => Ok(Some(self.column(idx)?)),
            Err(_) => Ok(None),
        }
    }

    /// Combine all chunks into a single batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        concat_batches(&self.schema, &self.batches).context("failed to concatenate batches")
    }

    /// Render the table as an ASCII grid.
    pub fn pretty_format(&self) -> Result<String> {
        if self.batches.is_empty() {
            // Still print the header for empty tables.
            let batch = RecordBatch::new_empty(Arc::clone(&self.schema));
            let out = pretty_format_batches(&[batch]).context("failed to format table")?;
            return Ok(out.to_string());
        }
        let out = pretty_format_batches(&self.batches).context("failed to format table")?;
        Ok(out.to_string())
    }
}
