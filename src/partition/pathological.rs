//! Pathological partitioning: a hard cap on classes per partition.

use bon::Builder;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::error::{ConfigError, PartitionError};
use crate::sampling::{even_chunk_sizes, seeded_rng, slice_by_sizes};

use super::{indices_by_key, PartitionMapping, PartitionStrategy};

/// How classes are ordered before the round-robin assignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassAssignment {
    /// Seeded shuffle of the class list.
    #[default]
    Shuffled,
    /// Sorted class-key order.
    Deterministic,
}

/// Restrict every partition to exactly `num_classes_per_partition`
/// distinct classes.
///
/// Classes are dealt round-robin over the (shuffled or sorted) class list:
/// partition `p` takes the `num_classes_per_partition` consecutive entries
/// starting at `p * num_classes_per_partition`, wrapping around, which
/// balances how often each class is reused across partitions. Each class's
/// rows are then split evenly among the partitions holding it, remainder
/// to the first holders. This produces the most extreme class skew of the
/// family by construction.
///
/// # Example
///
/// ```
/// use fedsplit::partition::PathologicalPartitioner;
///
/// let strategy = PathologicalPartitioner::builder()
///     .num_partitions(10)
///     .partition_by("label")
///     .num_classes_per_partition(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct PathologicalPartitioner {
    /// Number of partitions. Must be at least 1.
    pub num_partitions: usize,

    /// Class column driving the split.
    #[builder(into)]
    pub partition_by: String,

    /// Distinct classes allowed per partition. Must be at least 1.
    pub num_classes_per_partition: usize,

    /// Class ordering before the round-robin. Default: `Shuffled`.
    #[builder(default)]
    pub class_assignment: ClassAssignment,

    /// Shuffle rows within each class before splitting. Default: true.
    #[builder(default = true)]
    pub shuffle: bool,

    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,
}

impl<S: pathological_partitioner_builder::IsComplete> PathologicalPartitionerBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidNumPartitions`] or
    /// [`ConfigError::InvalidClassesPerPartition`] for zero values.
    pub fn build(self) -> Result<PathologicalPartitioner, ConfigError> {
        let strategy = self.__build_internal();
        if strategy.num_partitions == 0 {
            return Err(ConfigError::InvalidNumPartitions);
        }
        if strategy.num_classes_per_partition == 0 {
            return Err(ConfigError::InvalidClassesPerPartition);
        }
        Ok(strategy)
    }
}

impl PartitionStrategy for PathologicalPartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        Some(self.num_partitions)
    }

    fn partition_column(&self) -> Option<&str> {
        Some(&self.partition_by)
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let keys = dataset.class_keys(&self.partition_by)?;
        let grouped = indices_by_key(&keys);
        let num_classes = grouped.len();
        let per_partition = self.num_classes_per_partition;

        if per_partition > num_classes {
            return Err(ConfigError::TooManyClassesPerPartition {
                requested: per_partition,
                available: num_classes,
            }
            .into());
        }
        let slots = self.num_partitions * per_partition;
        if slots < num_classes {
            return Err(ConfigError::UncoveredClasses {
                classes: num_classes,
                slots,
            }
            .into());
        }

        let mut rng = seeded_rng(self.seed);
        let mut class_indices: Vec<Vec<u64>> = grouped.into_values().collect();
        let mut class_order: Vec<usize> = (0..num_classes).collect();
        if self.class_assignment == ClassAssignment::Shuffled {
            class_order.shuffle(&mut rng);
        }

        // Round-robin: consecutive slots walk the class list cyclically,
        // so reuse counts differ by at most one across classes.
        let mut holders: Vec<Vec<usize>> = vec![Vec::new(); num_classes];
        for partition in 0..self.num_partitions {
            for k in 0..per_partition {
                let class = class_order[(partition * per_partition + k) % num_classes];
                holders[class].push(partition);
            }
        }

        let mut partitions: Vec<Vec<u64>> = vec![Vec::new(); self.num_partitions];
        for (class, partition_ids) in holders.into_iter().enumerate() {
            let rows = &mut class_indices[class];
            if self.shuffle {
                rows.shuffle(&mut rng);
            }
            let sizes = even_chunk_sizes(rows.len(), partition_ids.len());
            for (partition, chunk) in partition_ids.into_iter().zip(slice_by_sizes(rows, &sizes)) {
                partitions[partition].extend(chunk);
            }
        }
        Ok(PartitionMapping::Rows(partitions))
    }
}
