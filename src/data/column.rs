//! Column storage and discrete key extraction.

use std::fmt;

use ndarray::Array1;

/// A single named column's values.
///
/// Columns are homogeneous: float for continuous values, int or string for
/// class labels and natural ids. Numeric columns are backed by ndarray so
/// callers can run vectorized statistics on them without copying.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Continuous values (regression targets, features).
    Float(Array1<f64>),
    /// Integer-coded values (class labels, numeric ids).
    Int(Array1<i64>),
    /// String values (natural ids, named labels).
    Str(Vec<String>),
}

impl Column {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Int(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    /// True if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short type name, used in error messages.
    pub fn dtype(&self) -> &'static str {
        match self {
            Column::Float(_) => "float",
            Column::Int(_) => "int",
            Column::Str(_) => "str",
        }
    }

    /// Gather the values at `indices` into a new column.
    ///
    /// Debug-asserts that every index is in range.
    pub(crate) fn gather(&self, indices: &[u64]) -> Column {
        match self {
            Column::Float(v) => Column::Float(
                indices
                    .iter()
                    .map(|&i| {
                        debug_assert!((i as usize) < v.len(), "row index out of range");
                        v[i as usize]
                    })
                    .collect(),
            ),
            Column::Int(v) => Column::Int(
                indices
                    .iter()
                    .map(|&i| {
                        debug_assert!((i as usize) < v.len(), "row index out of range");
                        v[i as usize]
                    })
                    .collect(),
            ),
            Column::Str(v) => Column::Str(
                indices
                    .iter()
                    .map(|&i| {
                        debug_assert!((i as usize) < v.len(), "row index out of range");
                        v[i as usize].clone()
                    })
                    .collect(),
            ),
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Column::Float(Array1::from_vec(values))
    }
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Column::Int(Array1::from_vec(values))
    }
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        Column::Str(values)
    }
}

/// A discrete grouping key extracted from an int or string column.
///
/// Keys order and hash, so class and id strategies can group rows with a
/// `BTreeMap` and obtain a deterministic class order. Float columns do not
/// yield keys; float equality is not a sound grouping criterion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{v}"),
            Key::Str(v) => write!(f, "{v}"),
        }
    }
}
