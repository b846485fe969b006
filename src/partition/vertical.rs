//! Vertical partitioning: split by column instead of row.

use bon::Builder;
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::Dataset;
use crate::error::{ConfigError, PartitionError};
use crate::sampling::{even_chunk_sizes, seeded_rng};

use super::{PartitionMapping, PartitionStrategy};

/// Resolve the splittable column set: schema order minus shared columns.
fn splittable_columns(
    dataset: &Dataset,
    shared_columns: &[String],
) -> Result<Vec<String>, ConfigError> {
    for shared in shared_columns {
        if !dataset.has_column(shared) {
            return Err(ConfigError::MissingColumn(shared.clone()));
        }
    }
    Ok(dataset
        .column_names()
        .iter()
        .filter(|name| !shared_columns.contains(name))
        .cloned()
        .collect())
}

/// Chunk column names by the given sizes and append the shared columns to
/// every partition.
fn chunk_columns(
    mut columns: Vec<String>,
    sizes: &[usize],
    shared_columns: &[String],
    shuffle: bool,
    rng: &mut Xoshiro256PlusPlus,
) -> Vec<Vec<String>> {
    if shuffle {
        columns.shuffle(rng);
    }
    let mut partitions = Vec::with_capacity(sizes.len());
    let mut offset = 0;
    for &size in sizes {
        let mut names: Vec<String> = columns[offset..offset + size].to_vec();
        names.extend(shared_columns.iter().cloned());
        partitions.push(names);
        offset += size;
    }
    partitions
}

// =============================================================================
// VerticalEvenPartitioner
// =============================================================================

/// Split the column set into even groups.
///
/// Non-shared columns are split into `num_partitions` groups of
/// `floor(C / n)`, the remainder handing one extra column to the first
/// partitions. `shared_columns` (an id or label column, typically) are
/// duplicated into every partition; all partitions keep the full row set.
///
/// # Example
///
/// ```
/// use fedsplit::partition::VerticalEvenPartitioner;
///
/// let strategy = VerticalEvenPartitioner::builder()
///     .num_partitions(3)
///     .shared_columns(vec!["label".to_string()])
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct VerticalEvenPartitioner {
    /// Number of partitions. Must be at least 1.
    pub num_partitions: usize,

    /// Columns duplicated into every partition. Default: none.
    #[builder(default)]
    pub shared_columns: Vec<String>,

    /// Shuffle column order before splitting. Default: false (keep schema
    /// order).
    #[builder(default = false)]
    pub shuffle: bool,

    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,
}

impl<S: vertical_even_partitioner_builder::IsComplete> VerticalEvenPartitionerBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidNumPartitions`] if `num_partitions == 0`.
    pub fn build(self) -> Result<VerticalEvenPartitioner, ConfigError> {
        let strategy = self.__build_internal();
        if strategy.num_partitions == 0 {
            return Err(ConfigError::InvalidNumPartitions);
        }
        Ok(strategy)
    }
}

impl PartitionStrategy for VerticalEvenPartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        Some(self.num_partitions)
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let columns = splittable_columns(dataset, &self.shared_columns)?;
        let sizes = even_chunk_sizes(columns.len(), self.num_partitions);
        let mut rng = seeded_rng(self.seed);
        Ok(PartitionMapping::Columns(chunk_columns(
            columns,
            &sizes,
            &self.shared_columns,
            self.shuffle,
            &mut rng,
        )))
    }
}

// =============================================================================
// VerticalSizePartitioner
// =============================================================================

/// Split the column set into explicitly sized groups.
///
/// `column_sizes[p]` non-shared columns go to partition `p`; the counts
/// must sum to the number of splittable columns.
///
/// # Example
///
/// ```
/// use fedsplit::partition::VerticalSizePartitioner;
///
/// let strategy = VerticalSizePartitioner::builder()
///     .column_sizes(vec![5, 3, 2])
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct VerticalSizePartitioner {
    /// Per-partition column counts; must sum to the splittable column
    /// count.
    pub column_sizes: Vec<usize>,

    /// Columns duplicated into every partition. Default: none.
    #[builder(default)]
    pub shared_columns: Vec<String>,

    /// Shuffle column order before splitting. Default: false.
    #[builder(default = false)]
    pub shuffle: bool,

    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,
}

impl<S: vertical_size_partitioner_builder::IsComplete> VerticalSizePartitionerBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidNumPartitions`] for an empty size list.
    pub fn build(self) -> Result<VerticalSizePartitioner, ConfigError> {
        let strategy = self.__build_internal();
        if strategy.column_sizes.is_empty() {
            return Err(ConfigError::InvalidNumPartitions);
        }
        Ok(strategy)
    }
}

impl PartitionStrategy for VerticalSizePartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        Some(self.column_sizes.len())
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let columns = splittable_columns(dataset, &self.shared_columns)?;
        let total: usize = self.column_sizes.iter().sum();
        if total != columns.len() {
            return Err(ConfigError::ColumnSizesSumMismatch {
                expected: columns.len(),
                got: total,
            }
            .into());
        }
        let mut rng = seeded_rng(self.seed);
        Ok(PartitionMapping::Columns(chunk_columns(
            columns,
            &self.column_sizes,
            &self.shared_columns,
            self.shuffle,
            &mut rng,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn wide_dataset(n_columns: usize) -> Dataset {
        let mut builder = Dataset::builder();
        for c in 0..n_columns {
            builder = builder.add_float(&format!("col_{c}"), vec![0.0, 1.0]);
        }
        builder.build().unwrap()
    }

    #[test]
    fn even_split_hands_remainder_to_first() {
        let strategy = VerticalEvenPartitioner::builder()
            .num_partitions(3)
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&wide_dataset(10)).unwrap();
        assert_eq!(mapping.partition_sizes(), vec![4, 3, 3]);

        // Disjoint groups whose union is the full column set.
        let PartitionMapping::Columns(columns) = mapping else {
            panic!("expected column mapping");
        };
        let mut seen = HashSet::new();
        for name in columns.iter().flatten() {
            assert!(seen.insert(name.clone()), "column {name} assigned twice");
        }
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn shared_columns_are_duplicated() {
        let strategy = VerticalEvenPartitioner::builder()
            .num_partitions(3)
            .shared_columns(vec!["col_0".to_string()])
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&wide_dataset(10)).unwrap();
        let PartitionMapping::Columns(columns) = mapping else {
            panic!("expected column mapping");
        };
        // 9 splittable columns in groups of 3, plus the shared column in
        // every partition.
        for partition in &columns {
            assert_eq!(partition.len(), 4);
            assert!(partition.contains(&"col_0".to_string()));
        }
    }

    #[test]
    fn missing_shared_column_fails() {
        let strategy = VerticalEvenPartitioner::builder()
            .num_partitions(2)
            .shared_columns(vec!["nope".to_string()])
            .build()
            .unwrap();
        assert!(matches!(
            strategy.compute_mapping(&wide_dataset(4)),
            Err(PartitionError::Config(ConfigError::MissingColumn(_)))
        ));
    }

    #[test]
    fn explicit_sizes_must_sum_to_columns() {
        let strategy = VerticalSizePartitioner::builder()
            .column_sizes(vec![5, 3, 2])
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&wide_dataset(10)).unwrap();
        assert_eq!(mapping.partition_sizes(), vec![5, 3, 2]);

        assert!(matches!(
            strategy.compute_mapping(&wide_dataset(11)),
            Err(PartitionError::Config(
                ConfigError::ColumnSizesSumMismatch {
                    expected: 11,
                    got: 10,
                }
            ))
        ));
    }

    #[test]
    fn schema_order_is_kept_without_shuffle() {
        let strategy = VerticalSizePartitioner::builder()
            .column_sizes(vec![2, 2])
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&wide_dataset(4)).unwrap();
        assert_eq!(
            mapping,
            PartitionMapping::Columns(vec![
                vec!["col_0".to_string(), "col_1".to_string()],
                vec!["col_2".to_string(), "col_3".to_string()],
            ])
        );
    }

    #[test]
    fn shuffled_split_is_seeded() {
        let build = |seed: u64| {
            VerticalEvenPartitioner::builder()
                .num_partitions(4)
                .shuffle(true)
                .seed(seed)
                .build()
                .unwrap()
                .compute_mapping(&wide_dataset(12))
                .unwrap()
        };
        assert_eq!(build(1), build(1));
        assert_ne!(build(1), build(2));
    }
}
