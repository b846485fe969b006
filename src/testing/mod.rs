//! Synthetic dataset generators for tests and benchmarks.
//!
//! These helpers build small in-memory datasets with known shapes so
//! partition properties (exact cover, class ratios, determinism) can be
//! asserted without external data.

use rand::Rng;

use crate::data::Dataset;
use crate::sampling::seeded_rng;

/// A classification dataset with `n_classes` exactly balanced labels.
///
/// Labels cycle `row % n_classes`; the feature column is uniform noise
/// from the seed. Columns: `feature` (float), `label` (int).
pub fn classification_dataset(n_rows: usize, n_classes: usize, seed: u64) -> Dataset {
    let mut rng = seeded_rng(seed);
    let features: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>() * 10.0 - 5.0).collect();
    let labels: Vec<i64> = (0..n_rows).map(|i| (i % n_classes) as i64).collect();
    Dataset::builder()
        .add_float("feature", features)
        .add_int("label", labels)
        .build()
        .expect("generated columns are consistent")
}

/// A regression dataset with a continuous target.
///
/// Columns: `feature` (float), `target` (float, uniform in [0, 100)).
pub fn regression_dataset(n_rows: usize, seed: u64) -> Dataset {
    let mut rng = seeded_rng(seed);
    let features: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>()).collect();
    let targets: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>() * 100.0).collect();
    Dataset::builder()
        .add_float("feature", features)
        .add_float("target", targets)
        .build()
        .expect("generated columns are consistent")
}

/// A dataset keyed by `n_ids` cycling string ids.
///
/// Columns: `client_id` (str, `client_000`...), `value` (int row number).
pub fn natural_id_dataset(n_rows: usize, n_ids: usize) -> Dataset {
    let ids: Vec<String> = (0..n_rows)
        .map(|i| format!("client_{:03}", i % n_ids))
        .collect();
    Dataset::builder()
        .add_str("client_id", ids)
        .add_int("value", (0..n_rows as i64).collect())
        .build()
        .expect("generated columns are consistent")
}

/// A dataset with `n_columns` float columns `col_0..`, two rows each.
pub fn wide_dataset(n_columns: usize) -> Dataset {
    let mut builder = Dataset::builder();
    for c in 0..n_columns {
        builder = builder.add_float(&format!("col_{c}"), vec![c as f64, -(c as f64)]);
    }
    builder.build().expect("generated columns are consistent")
}
