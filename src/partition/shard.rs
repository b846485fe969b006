//! Shard partitioning: contiguous same-class blocks as allocation units.

use bon::Builder;
use rand::seq::SliceRandom;

use crate::data::Dataset;
use crate::error::{ConfigError, PartitionError};
use crate::sampling::seeded_rng;

use super::{indices_by_key, PartitionMapping, PartitionStrategy};

/// Assign fixed-size same-class shards to partitions.
///
/// Per class, that class's rows (optionally shuffled) are cut into
/// contiguous shards of `shard_size`; all shards enter one global pool,
/// the pool is seeded-shuffled, and each partition takes exactly
/// `shards_per_partition` shards without reuse.
///
/// Sizing is either direct (`shard_size`) or derived
/// (`num_shards_per_partition`, with
/// `shard_size = len / (num_partitions * num_shards_per_partition)`).
/// `keep_incomplete_shard` keeps or drops the per-class remainder shard.
/// Pooled shards beyond `num_partitions * shards_per_partition` are
/// dropped — the documented exception to the exact-cover invariant.
///
/// # Example
///
/// ```
/// use fedsplit::partition::ShardPartitioner;
///
/// let strategy = ShardPartitioner::builder()
///     .num_partitions(4)
///     .partition_by("label")
///     .shard_size(50)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct ShardPartitioner {
    /// Number of partitions. Must be at least 1.
    pub num_partitions: usize,

    /// Class column shards are formed within.
    #[builder(into)]
    pub partition_by: String,

    /// Rows per shard. Exclusive with `num_shards_per_partition`.
    pub shard_size: Option<usize>,

    /// Shards per partition, from which the shard size is derived.
    /// Exclusive with `shard_size`.
    pub num_shards_per_partition: Option<usize>,

    /// Keep the incomplete final shard of a class. Default: false.
    #[builder(default = false)]
    pub keep_incomplete_shard: bool,

    /// Shuffle rows within each class before cutting shards. Default: true.
    #[builder(default = true)]
    pub shuffle: bool,

    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,
}

impl<S: shard_partitioner_builder::IsComplete> ShardPartitionerBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ShardSizingConflict`] unless exactly one of
    /// `shard_size` and `num_shards_per_partition` is set;
    /// [`ConfigError::InvalidShardSize`] /
    /// [`ConfigError::InvalidNumShardsPerPartition`] for zero values.
    pub fn build(self) -> Result<ShardPartitioner, ConfigError> {
        let strategy = self.__build_internal();
        if strategy.num_partitions == 0 {
            return Err(ConfigError::InvalidNumPartitions);
        }
        match (strategy.shard_size, strategy.num_shards_per_partition) {
            (Some(_), Some(_)) | (None, None) => return Err(ConfigError::ShardSizingConflict),
            (Some(0), None) => return Err(ConfigError::InvalidShardSize),
            (None, Some(0)) => return Err(ConfigError::InvalidNumShardsPerPartition),
            _ => {}
        }
        Ok(strategy)
    }
}

impl PartitionStrategy for ShardPartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        Some(self.num_partitions)
    }

    fn partition_column(&self) -> Option<&str> {
        Some(&self.partition_by)
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let n = dataset.n_rows();
        let shard_size = match (self.shard_size, self.num_shards_per_partition) {
            (Some(size), _) => size,
            (None, Some(per_partition)) => {
                let size = n / (self.num_partitions * per_partition);
                if size == 0 {
                    return Err(ConfigError::ShardSizeUnderflow {
                        rows: n,
                        partitions: self.num_partitions,
                        shards_per_partition: per_partition,
                    }
                    .into());
                }
                size
            }
            // Excluded by build().
            (None, None) => return Err(ConfigError::ShardSizingConflict.into()),
        };

        let keys = dataset.class_keys(&self.partition_by)?;
        let grouped = indices_by_key(&keys);
        let mut rng = seeded_rng(self.seed);

        // Cut each class into shards and pool them.
        let mut pool: Vec<Vec<u64>> = Vec::new();
        for mut indices in grouped.into_values() {
            if self.shuffle {
                indices.shuffle(&mut rng);
            }
            for chunk in indices.chunks(shard_size) {
                if chunk.len() == shard_size || self.keep_incomplete_shard {
                    pool.push(chunk.to_vec());
                }
            }
        }
        pool.shuffle(&mut rng);

        let shards_per_partition = match self.num_shards_per_partition {
            Some(per_partition) => per_partition,
            None => pool.len() / self.num_partitions,
        };
        let required = self
            .num_partitions
            .saturating_mul(shards_per_partition.max(1));
        if shards_per_partition == 0 || pool.len() < required {
            return Err(ConfigError::InsufficientShards {
                required,
                available: pool.len(),
            }
            .into());
        }

        let partitions: Vec<Vec<u64>> = (0..self.num_partitions)
            .map(|p| {
                pool[p * shards_per_partition..(p + 1) * shards_per_partition]
                    .iter()
                    .flatten()
                    .copied()
                    .collect()
            })
            .collect();
        Ok(PartitionMapping::Rows(partitions))
    }
}
