//! Natural-id partitioning: pre-existing ids choose the partition.

use std::fmt;
use std::sync::Arc;

use bon::Builder;

use crate::data::{Dataset, Key};
use crate::error::{ConfigError, PartitionError};
use crate::sampling::even_chunk_sizes;

use super::{indices_by_key, PartitionMapping, PartitionStrategy};

// =============================================================================
// NaturalIdPartitioner
// =============================================================================

/// One partition per unique value of the id column.
///
/// Partitions are ordered by sorted id, so partition 0 belongs to the
/// smallest id. The partition count is resolved from the dataset; there is
/// no randomness involved.
///
/// # Example
///
/// ```
/// use fedsplit::partition::NaturalIdPartitioner;
///
/// let strategy = NaturalIdPartitioner::builder()
///     .partition_by("client_id")
///     .build();
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug))]
pub struct NaturalIdPartitioner {
    /// Id column driving the grouping.
    #[builder(into)]
    pub partition_by: String,
}

impl PartitionStrategy for NaturalIdPartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        None
    }

    fn partition_column(&self) -> Option<&str> {
        Some(&self.partition_by)
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let keys = dataset.class_keys(&self.partition_by)?;
        let grouped = indices_by_key(&keys);
        Ok(PartitionMapping::Rows(grouped.into_values().collect()))
    }
}

// =============================================================================
// GroupedNaturalIdPartitioner
// =============================================================================

/// How ids are merged into partitions.
#[derive(Clone, Default)]
pub enum GroupingMode {
    /// Sorted ids, split into even contiguous runs (remainder to the
    /// first partitions).
    #[default]
    Contiguous,
    /// Greedy bin-packing: largest id-group first, into the currently
    /// smallest partition (ties to the lowest partition id).
    BalancedSize,
    /// Caller-supplied id-to-partition function.
    Custom(Arc<dyn Fn(&Key) -> usize + Send + Sync>),
}

impl GroupingMode {
    /// Wrap a caller-supplied grouping function.
    pub fn custom(f: impl Fn(&Key) -> usize + Send + Sync + 'static) -> Self {
        GroupingMode::Custom(Arc::new(f))
    }
}

impl fmt::Debug for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingMode::Contiguous => write!(f, "Contiguous"),
            GroupingMode::BalancedSize => write!(f, "BalancedSize"),
            GroupingMode::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Merge unique ids into a fixed number of partitions.
///
/// Each unique id still lands in exactly one partition; the grouping mode
/// decides which. All modes are deterministic — there is no seed.
///
/// # Example
///
/// ```
/// use fedsplit::partition::{GroupedNaturalIdPartitioner, GroupingMode};
///
/// let strategy = GroupedNaturalIdPartitioner::builder()
///     .partition_by("client_id")
///     .num_partitions(3)
///     .mode(GroupingMode::BalancedSize)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct GroupedNaturalIdPartitioner {
    /// Id column driving the grouping.
    #[builder(into)]
    pub partition_by: String,

    /// Number of partitions the ids are merged into. Must be at least 1.
    pub num_partitions: usize,

    /// Grouping mode. Default: `Contiguous`.
    #[builder(default)]
    pub mode: GroupingMode,
}

impl<S: grouped_natural_id_partitioner_builder::IsComplete> GroupedNaturalIdPartitionerBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidNumPartitions`] if `num_partitions == 0`.
    pub fn build(self) -> Result<GroupedNaturalIdPartitioner, ConfigError> {
        let strategy = self.__build_internal();
        if strategy.num_partitions == 0 {
            return Err(ConfigError::InvalidNumPartitions);
        }
        Ok(strategy)
    }
}

impl PartitionStrategy for GroupedNaturalIdPartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        Some(self.num_partitions)
    }

    fn partition_column(&self) -> Option<&str> {
        Some(&self.partition_by)
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let keys = dataset.class_keys(&self.partition_by)?;
        let grouped = indices_by_key(&keys);
        let p = self.num_partitions;

        let mut partitions: Vec<Vec<u64>> = vec![Vec::new(); p];
        match &self.mode {
            GroupingMode::Contiguous => {
                if grouped.len() < p {
                    return Err(ConfigError::TooFewIds {
                        ids: grouped.len(),
                        partitions: p,
                    }
                    .into());
                }
                let sizes = even_chunk_sizes(grouped.len(), p);
                let mut groups = grouped.into_values();
                for (partition, &count) in partitions.iter_mut().zip(&sizes) {
                    for _ in 0..count {
                        if let Some(rows) = groups.next() {
                            partition.extend(rows);
                        }
                    }
                }
            }
            GroupingMode::BalancedSize => {
                if grouped.len() < p {
                    return Err(ConfigError::TooFewIds {
                        ids: grouped.len(),
                        partitions: p,
                    }
                    .into());
                }
                // Largest group first; ties keep sorted-id order.
                let mut groups: Vec<(Key, Vec<u64>)> = grouped.into_iter().collect();
                groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
                for (_, rows) in groups {
                    // Size ties go to the lowest partition id.
                    let target = partitions
                        .iter()
                        .enumerate()
                        .min_by_key(|(id, partition)| (partition.len(), *id))
                        .map(|(id, _)| id)
                        .unwrap_or(0);
                    partitions[target].extend(rows);
                }
            }
            GroupingMode::Custom(group_fn) => {
                for (key, rows) in grouped {
                    let target = group_fn(&key);
                    if target >= p {
                        return Err(ConfigError::GroupFnOutOfRange {
                            id: key.to_string(),
                            got: target,
                            partitions: p,
                        }
                        .into());
                    }
                    partitions[target].extend(rows);
                }
            }
        }
        Ok(PartitionMapping::Rows(partitions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_dataset(n: usize, ids: usize) -> Dataset {
        Dataset::builder()
            .add_str(
                "client_id",
                (0..n).map(|i| format!("client_{:03}", i % ids)).collect(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn one_partition_per_unique_id() {
        let ds = id_dataset(30, 3);
        let strategy = NaturalIdPartitioner::builder()
            .partition_by("client_id")
            .build();
        assert_eq!(strategy.declared_partitions(), None);

        let mapping = strategy.compute_mapping(&ds).unwrap();
        assert_eq!(mapping.num_partitions(), 3);
        assert_eq!(mapping.partition_sizes(), vec![10, 10, 10]);

        // Partition 0 belongs to the smallest id.
        let PartitionMapping::Rows(rows) = mapping else {
            panic!("expected row mapping");
        };
        assert_eq!(rows[0], (0..30).step_by(3).collect::<Vec<u64>>());
    }

    #[test]
    fn contiguous_grouping_chunks_sorted_ids() {
        // 10 ids over 3 partitions: 4, 3, 3 ids each.
        let ds = id_dataset(100, 10);
        let strategy = GroupedNaturalIdPartitioner::builder()
            .partition_by("client_id")
            .num_partitions(3)
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&ds).unwrap();
        assert_eq!(mapping.partition_sizes(), vec![40, 30, 30]);
    }

    #[test]
    fn balanced_grouping_evens_out_skewed_ids() {
        // One dominant id (91 rows) and nine small ones (1 row each).
        let mut ids = vec!["big".to_string(); 91];
        for i in 0..9 {
            ids.push(format!("small_{i}"));
        }
        let ds = Dataset::builder().add_str("client_id", ids).build().unwrap();

        let strategy = GroupedNaturalIdPartitioner::builder()
            .partition_by("client_id")
            .num_partitions(2)
            .mode(GroupingMode::BalancedSize)
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&ds).unwrap();
        // The big id takes partition 0; all small ids pack into partition 1.
        assert_eq!(mapping.partition_sizes(), vec![91, 9]);
    }

    #[test]
    fn custom_grouping_function() {
        let ds = id_dataset(20, 4);
        let strategy = GroupedNaturalIdPartitioner::builder()
            .partition_by("client_id")
            .num_partitions(2)
            .mode(GroupingMode::custom(|key| {
                usize::from(key.to_string().ends_with(|c: char| {
                    c.to_digit(10).map(|d| d % 2 == 1).unwrap_or(false)
                }))
            }))
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&ds).unwrap();
        assert_eq!(mapping.partition_sizes(), vec![10, 10]);
    }

    #[test]
    fn custom_grouping_out_of_range_fails() {
        let ds = id_dataset(20, 4);
        let strategy = GroupedNaturalIdPartitioner::builder()
            .partition_by("client_id")
            .num_partitions(2)
            .mode(GroupingMode::custom(|_| 7))
            .build()
            .unwrap();
        assert!(matches!(
            strategy.compute_mapping(&ds),
            Err(PartitionError::Config(ConfigError::GroupFnOutOfRange {
                got: 7,
                partitions: 2,
                ..
            }))
        ));
    }

    #[test]
    fn too_few_ids_fail() {
        let ds = id_dataset(10, 2);
        let strategy = GroupedNaturalIdPartitioner::builder()
            .partition_by("client_id")
            .num_partitions(5)
            .build()
            .unwrap();
        assert!(matches!(
            strategy.compute_mapping(&ds),
            Err(PartitionError::Config(ConfigError::TooFewIds {
                ids: 2,
                partitions: 5,
            }))
        ));
    }
}
