//! Partition views over a shared dataset.

use std::sync::Arc;

use super::column::Column;
use super::dataset::{Dataset, DatasetError};

/// A lightweight view of one partition of a dataset.
///
/// A partition references the shared dataset plus either a row-index
/// selection (row strategies) or a column-name selection (vertical
/// strategies). Creating a partition copies nothing; values are gathered
/// only when a column is read or the view is materialized.
#[derive(Debug, Clone)]
pub struct Partition {
    dataset: Arc<Dataset>,
    rows: Option<Arc<[u64]>>,
    columns: Option<Arc<[String]>>,
}

impl Partition {
    /// Row-subset view.
    pub(crate) fn from_rows(dataset: Arc<Dataset>, rows: Arc<[u64]>) -> Self {
        Self {
            dataset,
            rows: Some(rows),
            columns: None,
        }
    }

    /// Column-subset view; all rows are shared.
    pub(crate) fn from_columns(dataset: Arc<Dataset>, columns: Arc<[String]>) -> Self {
        Self {
            dataset,
            rows: None,
            columns: Some(columns),
        }
    }

    /// Number of rows visible in this partition.
    pub fn n_rows(&self) -> usize {
        match &self.rows {
            Some(rows) => rows.len(),
            None => self.dataset.n_rows(),
        }
    }

    /// True if the partition holds no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// The selected row indices, or `None` for a column partition that
    /// shares the full row set.
    pub fn row_indices(&self) -> Option<&[u64]> {
        self.rows.as_deref()
    }

    /// Names of the columns visible in this partition.
    pub fn column_names(&self) -> Vec<String> {
        match &self.columns {
            Some(columns) => columns.to_vec(),
            None => self.dataset.column_names().to_vec(),
        }
    }

    /// Read one column of the partition, gathering selected rows.
    ///
    /// # Errors
    ///
    /// [`DatasetError::MissingColumn`] if the column does not exist or is
    /// not part of this partition's column selection.
    pub fn column(&self, name: &str) -> Result<Column, DatasetError> {
        if let Some(columns) = &self.columns {
            if !columns.iter().any(|c| c == name) {
                return Err(DatasetError::MissingColumn(name.to_string()));
            }
        }
        let column = self
            .dataset
            .column(name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;
        Ok(match &self.rows {
            Some(rows) => column.gather(rows),
            None => column.clone(),
        })
    }

    /// Materialize the partition into an owned dataset.
    ///
    /// # Errors
    ///
    /// [`DatasetError::EmptyColumns`] for a vertical partition whose column
    /// selection came out empty.
    pub fn to_dataset(&self) -> Result<Dataset, DatasetError> {
        let names = self.column_names();
        let mut builder = Dataset::builder();
        for name in &names {
            builder = builder.add_column(name, self.column(name)?);
        }
        builder.build()
    }
}
