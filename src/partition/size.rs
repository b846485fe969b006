//! Size-function partitioning: weight-driven and explicit partition sizes.

use std::fmt;
use std::sync::Arc;

use bon::Builder;

use crate::data::Dataset;
use crate::error::{ConfigError, PartitionError};
use crate::sampling::{apportion, permutation, seeded_rng, slice_by_sizes};

use super::{PartitionMapping, PartitionStrategy};

/// How partition sizes are derived from partition ids.
///
/// The weight-driven variants size partition `id` proportionally to
/// `f(id)`; `Explicit` states the sizes outright.
#[derive(Clone)]
pub enum SizeSpec {
    /// `f(id) = id + 1`.
    Linear,
    /// `f(id) = (id + 1)^2`.
    Square,
    /// `f(id) = e^id`.
    Exponential,
    /// Literal per-partition sizes; must sum to the dataset length.
    Explicit(Vec<usize>),
    /// Caller-supplied id-to-weight function.
    Custom(Arc<dyn Fn(usize) -> f64 + Send + Sync>),
}

impl SizeSpec {
    /// Wrap a caller-supplied weight function.
    pub fn custom(f: impl Fn(usize) -> f64 + Send + Sync + 'static) -> Self {
        SizeSpec::Custom(Arc::new(f))
    }

    /// Weight for one partition id. `None` for `Explicit`.
    fn weight(&self, partition_id: usize) -> Option<f64> {
        match self {
            SizeSpec::Linear => Some((partition_id + 1) as f64),
            SizeSpec::Square => Some(((partition_id + 1) * (partition_id + 1)) as f64),
            SizeSpec::Exponential => Some((partition_id as f64).exp()),
            SizeSpec::Explicit(_) => None,
            SizeSpec::Custom(f) => Some(f(partition_id)),
        }
    }
}

impl fmt::Debug for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeSpec::Linear => write!(f, "Linear"),
            SizeSpec::Square => write!(f, "Square"),
            SizeSpec::Exponential => write!(f, "Exponential"),
            SizeSpec::Explicit(sizes) => f.debug_tuple("Explicit").field(sizes).finish(),
            SizeSpec::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Partition sizes follow a function of the partition id.
///
/// Indices are drawn sequentially, in partition-id order, from one seeded
/// permutation of the full index range, so no index is skipped or
/// duplicated regardless of the size profile. Weight-driven sizes are
/// `round(len * f(id) / sum f)` with the rounding shortfall or excess
/// reconciled against the last partitions.
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct SizePartitioner {
    /// Number of partitions. Must be at least 1.
    pub num_partitions: usize,

    /// Size profile.
    pub sizes: SizeSpec,

    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    /// Permute rows before slicing. Default: true.
    #[builder(default = true)]
    pub shuffle: bool,
}

impl<S: size_partitioner_builder::IsComplete> SizePartitionerBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidNumPartitions`] if `num_partitions == 0`;
    /// [`ConfigError::SizesLengthMismatch`] if an explicit size list does
    /// not have one entry per partition.
    pub fn build(self) -> Result<SizePartitioner, ConfigError> {
        let strategy = self.__build_internal();
        if strategy.num_partitions == 0 {
            return Err(ConfigError::InvalidNumPartitions);
        }
        if let SizeSpec::Explicit(sizes) = &strategy.sizes {
            if sizes.len() != strategy.num_partitions {
                return Err(ConfigError::SizesLengthMismatch {
                    expected: strategy.num_partitions,
                    got: sizes.len(),
                });
            }
        }
        Ok(strategy)
    }
}

impl SizePartitioner {
    /// Resolve the per-partition sizes against the dataset length.
    fn partition_sizes(&self, n_rows: usize) -> Result<Vec<usize>, ConfigError> {
        match &self.sizes {
            SizeSpec::Explicit(sizes) => {
                let total: usize = sizes.iter().sum();
                if total != n_rows {
                    return Err(ConfigError::SizesSumMismatch {
                        expected: n_rows,
                        got: total,
                    });
                }
                Ok(sizes.clone())
            }
            spec => {
                let mut weights = Vec::with_capacity(self.num_partitions);
                for id in 0..self.num_partitions {
                    // weight() is Some for every non-explicit spec
                    let w = spec.weight(id).unwrap_or(0.0);
                    if !w.is_finite() || w < 0.0 {
                        return Err(ConfigError::InvalidSizeWeight {
                            partition_id: id,
                            value: w,
                        });
                    }
                    weights.push(w);
                }
                apportion(n_rows, &weights)
            }
        }
    }
}

impl PartitionStrategy for SizePartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        Some(self.num_partitions)
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let n = dataset.n_rows();
        let sizes = self.partition_sizes(n)?;
        let indices = if self.shuffle {
            let mut rng = seeded_rng(self.seed);
            permutation(n, &mut rng)
        } else {
            (0..n as u64).collect()
        };
        Ok(PartitionMapping::Rows(slice_by_sizes(&indices, &sizes)))
    }
}
