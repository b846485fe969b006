//! Dataset container and builder.
//!
//! This module provides [`Dataset`] and [`DatasetBuilder`]. A dataset is an
//! ordered collection of equal-length named columns; it is immutable once
//! built and shared read-only by every partition view derived from it.

use ndarray::Array1;

use crate::error::ConfigError;

use super::column::{Column, Key};

/// Errors that can occur while building or selecting from a dataset.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    /// A dataset needs at least one column.
    #[error("dataset must have at least one column")]
    EmptyColumns,

    /// A column's length disagrees with the first column.
    #[error("column {column:?} has {got} rows, expected {expected}")]
    ShapeMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    /// Two columns share a name.
    #[error("duplicate column {0:?}")]
    DuplicateColumn(String),

    /// A selection referenced a column that does not exist.
    #[error("column {0:?} not found")]
    MissingColumn(String),
}

/// An in-memory, row-indexed dataset with named columns.
///
/// Rows are addressed by a stable index in `0..n_rows`. The partitioning
/// core never mutates a dataset; strategies read one designated column and
/// produce index mappings over the rest.
///
/// # Example
///
/// ```
/// use fedsplit::data::Dataset;
///
/// let ds = Dataset::builder()
///     .add_float("income", vec![10.0, 52.5, 31.0])
///     .add_int("label", vec![0, 1, 1])
///     .build()
///     .unwrap();
///
/// assert_eq!(ds.n_rows(), 3);
/// assert_eq!(ds.n_columns(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Create a builder for dataset construction.
    pub fn builder() -> DatasetBuilder {
        DatasetBuilder::new()
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// True if the dataset has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Number of columns.
    #[inline]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// True if a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// Extract the discrete grouping keys of an int or string column.
    ///
    /// This is the access path for `partition_by` columns of class- and
    /// id-driven strategies.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingColumn`] if the column is absent,
    /// [`ConfigError::ColumnType`] if it is a float column.
    pub fn class_keys(&self, name: &str) -> Result<Vec<Key>, ConfigError> {
        let column = self
            .column(name)
            .ok_or_else(|| ConfigError::MissingColumn(name.to_string()))?;
        match column {
            Column::Int(values) => Ok(values.iter().map(|&v| Key::Int(v)).collect()),
            Column::Str(values) => Ok(values.iter().cloned().map(Key::Str).collect()),
            Column::Float(_) => Err(ConfigError::ColumnType {
                column: name.to_string(),
                expected: "int or str",
                got: "float",
            }),
        }
    }

    /// Extract a numeric column as `f64` values, casting ints.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingColumn`] if the column is absent,
    /// [`ConfigError::ColumnType`] for string columns, and
    /// [`ConfigError::NonFiniteValues`] if any value is NaN or infinite.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, ConfigError> {
        let column = self
            .column(name)
            .ok_or_else(|| ConfigError::MissingColumn(name.to_string()))?;
        let values: Vec<f64> = match column {
            Column::Float(values) => values.to_vec(),
            Column::Int(values) => values.iter().map(|&v| v as f64).collect(),
            Column::Str(_) => {
                return Err(ConfigError::ColumnType {
                    column: name.to_string(),
                    expected: "float or int",
                    got: "str",
                })
            }
        };
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteValues {
                column: name.to_string(),
            });
        }
        Ok(values)
    }

    /// Materialize a new dataset holding the given rows, in the given order.
    ///
    /// Debug-asserts that every index is in range.
    pub fn select_rows(&self, indices: &[u64]) -> Dataset {
        Dataset {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.gather(indices)).collect(),
            n_rows: indices.len(),
        }
    }

    /// Materialize a new dataset holding the given columns, in the given order.
    ///
    /// # Errors
    ///
    /// [`DatasetError::MissingColumn`] if any name is absent.
    pub fn select_columns(&self, names: &[String]) -> Result<Dataset, DatasetError> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let column = self
                .column(name)
                .ok_or_else(|| DatasetError::MissingColumn(name.clone()))?;
            columns.push(column.clone());
        }
        Ok(Dataset {
            names: names.to_vec(),
            columns,
            n_rows: self.n_rows,
        })
    }
}

/// Builder for [`Dataset`].
///
/// Columns keep insertion order; `build` validates shapes and names.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl DatasetBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a float column.
    pub fn add_float(mut self, name: &str, values: Vec<f64>) -> Self {
        self.names.push(name.to_string());
        self.columns.push(Column::Float(Array1::from_vec(values)));
        self
    }

    /// Add an int column.
    pub fn add_int(mut self, name: &str, values: Vec<i64>) -> Self {
        self.names.push(name.to_string());
        self.columns.push(Column::Int(Array1::from_vec(values)));
        self
    }

    /// Add a string column.
    pub fn add_str(mut self, name: &str, values: Vec<String>) -> Self {
        self.names.push(name.to_string());
        self.columns.push(Column::Str(values));
        self
    }

    /// Add an already-constructed column.
    pub fn add_column(mut self, name: &str, column: Column) -> Self {
        self.names.push(name.to_string());
        self.columns.push(column);
        self
    }

    /// Build the dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if no columns were added, lengths disagree,
    /// or a column name repeats.
    pub fn build(self) -> Result<Dataset, DatasetError> {
        if self.columns.is_empty() {
            return Err(DatasetError::EmptyColumns);
        }

        let n_rows = self.columns[0].len();
        for (name, column) in self.names.iter().zip(&self.columns) {
            if column.len() != n_rows {
                return Err(DatasetError::ShapeMismatch {
                    column: name.clone(),
                    expected: n_rows,
                    got: column.len(),
                });
            }
        }
        for (i, name) in self.names.iter().enumerate() {
            if self.names[..i].contains(name) {
                return Err(DatasetError::DuplicateColumn(name.clone()));
            }
        }

        Ok(Dataset {
            names: self.names,
            columns: self.columns,
            n_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_dataset() -> Dataset {
        Dataset::builder()
            .add_float("x", vec![0.5, 1.5, 2.5, 3.5])
            .add_int("label", vec![0, 1, 0, 1])
            .add_str(
                "client",
                vec!["a".into(), "b".into(), "a".into(), "c".into()],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn builder_basic() {
        let ds = small_dataset();
        assert_eq!(ds.n_rows(), 4);
        assert_eq!(ds.n_columns(), 3);
        assert_eq!(ds.column_names(), &["x", "label", "client"]);
        assert!(ds.has_column("label"));
        assert!(!ds.has_column("missing"));
    }

    #[test]
    fn builder_empty_error() {
        assert!(matches!(
            Dataset::builder().build(),
            Err(DatasetError::EmptyColumns)
        ));
    }

    #[test]
    fn builder_shape_mismatch_error() {
        let result = Dataset::builder()
            .add_float("x", vec![1.0, 2.0, 3.0])
            .add_int("label", vec![0, 1])
            .build();
        assert!(matches!(
            result,
            Err(DatasetError::ShapeMismatch {
                expected: 3,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn builder_duplicate_name_error() {
        let result = Dataset::builder()
            .add_float("x", vec![1.0])
            .add_int("x", vec![0])
            .build();
        assert!(matches!(result, Err(DatasetError::DuplicateColumn(_))));
    }

    #[test]
    fn class_keys_from_int_and_str() {
        let ds = small_dataset();
        assert_eq!(
            ds.class_keys("label").unwrap(),
            vec![Key::Int(0), Key::Int(1), Key::Int(0), Key::Int(1)]
        );
        assert_eq!(ds.class_keys("client").unwrap()[3], Key::Str("c".into()));
    }

    #[test]
    fn class_keys_rejects_float() {
        let ds = small_dataset();
        assert!(matches!(
            ds.class_keys("x"),
            Err(ConfigError::ColumnType { got: "float", .. })
        ));
        assert!(matches!(
            ds.class_keys("nope"),
            Err(ConfigError::MissingColumn(_))
        ));
    }

    #[test]
    fn numeric_column_casts_int() {
        let ds = small_dataset();
        assert_eq!(
            ds.numeric_column("label").unwrap(),
            vec![0.0, 1.0, 0.0, 1.0]
        );
        assert!(matches!(
            ds.numeric_column("client"),
            Err(ConfigError::ColumnType { got: "str", .. })
        ));
    }

    #[test]
    fn numeric_column_rejects_nan() {
        let ds = Dataset::builder()
            .add_float("x", vec![1.0, f64::NAN])
            .build()
            .unwrap();
        assert!(matches!(
            ds.numeric_column("x"),
            Err(ConfigError::NonFiniteValues { .. })
        ));
    }

    #[test]
    fn select_rows_gathers_all_columns() {
        let ds = small_dataset();
        let sub = ds.select_rows(&[2, 0]);
        assert_eq!(sub.n_rows(), 2);
        assert_eq!(sub.column("x").unwrap(), &vec![2.5, 0.5].into());
        assert_eq!(sub.column("label").unwrap(), &vec![0i64, 0].into());
    }

    #[test]
    fn select_columns_keeps_rows() {
        let ds = small_dataset();
        let sub = ds.select_columns(&["label".into(), "x".into()]).unwrap();
        assert_eq!(sub.n_rows(), 4);
        assert_eq!(sub.column_names(), &["label", "x"]);
        assert!(matches!(
            ds.select_columns(&["nope".into()]),
            Err(DatasetError::MissingColumn(_))
        ));
    }
}
