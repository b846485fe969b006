//! IID (uniform random) partitioning.

use bon::Builder;

use crate::data::Dataset;
use crate::error::{ConfigError, PartitionError};
use crate::sampling::{even_chunk_sizes, permutation, seeded_rng, slice_by_sizes};

use super::{PartitionMapping, PartitionStrategy};

/// Split rows uniformly at random into equally sized partitions.
///
/// A seeded permutation of the full index range is sliced into
/// `num_partitions` chunks of `floor(len / n)` rows; the remainder hands
/// one extra row to each of the first `len mod n` partitions, in id order.
/// With `shuffle = false` the permutation step is skipped and the split is
/// a contiguous range split.
///
/// # Example
///
/// ```
/// use fedsplit::partition::IidPartitioner;
///
/// let strategy = IidPartitioner::builder()
///     .num_partitions(10)
///     .seed(7)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct IidPartitioner {
    /// Number of partitions. Must be at least 1.
    pub num_partitions: usize,

    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    /// Permute rows before slicing. Default: true.
    #[builder(default = true)]
    pub shuffle: bool,
}

impl<S: iid_partitioner_builder::IsComplete> IidPartitionerBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidNumPartitions`] if `num_partitions == 0`.
    pub fn build(self) -> Result<IidPartitioner, ConfigError> {
        let strategy = self.__build_internal();
        if strategy.num_partitions == 0 {
            return Err(ConfigError::InvalidNumPartitions);
        }
        Ok(strategy)
    }
}

impl PartitionStrategy for IidPartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        Some(self.num_partitions)
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let n = dataset.n_rows();
        let indices = if self.shuffle {
            let mut rng = seeded_rng(self.seed);
            permutation(n, &mut rng)
        } else {
            (0..n as u64).collect()
        };
        let sizes = even_chunk_sizes(n, self.num_partitions);
        Ok(PartitionMapping::Rows(slice_by_sizes(&indices, &sizes)))
    }
}
