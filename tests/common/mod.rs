//! Shared assertions for partitioning integration tests.

#![allow(dead_code)]

use fedsplit::PartitionMapping;

/// Assert that a row mapping covers `0..n_rows` exactly once across all
/// partitions.
pub fn assert_exact_cover(mapping: &PartitionMapping, n_rows: usize) {
    let PartitionMapping::Rows(rows) = mapping else {
        panic!("expected a row mapping");
    };
    let mut all: Vec<u64> = rows.iter().flatten().copied().collect();
    all.sort_unstable();
    let expected: Vec<u64> = (0..n_rows as u64).collect();
    assert_eq!(all, expected, "partitions must cover every row exactly once");
}

/// Assert that the per-partition sizes sum to `n_rows`.
pub fn assert_sizes_sum(mapping: &PartitionMapping, n_rows: usize) {
    assert_eq!(
        mapping.partition_sizes().iter().sum::<usize>(),
        n_rows,
        "partition sizes must sum to the dataset length"
    );
}
