//! Dirichlet-distributed class proportions per partition.

use bon::Builder;
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::error::{ConfigError, PartitionError};
use crate::sampling::{apportion, seeded_rng, slice_by_sizes, symmetric_dirichlet};

use super::{indices_by_key, PartitionMapping, PartitionStrategy};

// =============================================================================
// Alpha
// =============================================================================

/// Dirichlet concentration: one scalar broadcast to every class, or one
/// value per class.
///
/// Larger values produce near-uniform per-partition proportions; smaller
/// values concentrate each class's mass on few partitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Alpha {
    /// The same concentration for every class.
    Scalar(f64),
    /// One concentration per class, in sorted class-key order.
    PerClass(Vec<f64>),
}

impl Alpha {
    /// Validate that every concentration is positive and finite.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let check = |v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidAlpha(v))
            }
        };
        match self {
            Alpha::Scalar(v) => check(*v),
            Alpha::PerClass(values) => values.iter().try_for_each(|&v| check(v)),
        }
    }

    /// Expand to one concentration per class.
    ///
    /// # Errors
    ///
    /// [`ConfigError::AlphaLengthMismatch`] when a per-class vector does
    /// not match the class count.
    pub(crate) fn for_classes(&self, classes: usize) -> Result<Vec<f64>, ConfigError> {
        match self {
            Alpha::Scalar(v) => Ok(vec![*v; classes]),
            Alpha::PerClass(values) => {
                if values.len() != classes {
                    return Err(ConfigError::AlphaLengthMismatch {
                        got: values.len(),
                        classes,
                    });
                }
                Ok(values.clone())
            }
        }
    }
}

impl From<f64> for Alpha {
    fn from(value: f64) -> Self {
        Alpha::Scalar(value)
    }
}

impl From<Vec<f64>> for Alpha {
    fn from(values: Vec<f64>) -> Self {
        Alpha::PerClass(values)
    }
}

// =============================================================================
// Shared assignment core
// =============================================================================

/// Inputs for the per-class Dirichlet assignment, shared between the
/// Dirichlet strategy (classes) and the continuous strategy (bins).
pub(crate) struct DirichletAssignment<'a> {
    /// Row indices per class, dataset order.
    pub class_indices: &'a [Vec<u64>],
    /// One concentration per class.
    pub alphas: &'a [f64],
    pub num_partitions: usize,
    pub min_partition_size: usize,
    pub max_retries: usize,
    pub self_balancing: bool,
    pub shuffle: bool,
}

/// Run the assignment: one proportion draw per class per attempt, counts
/// via last-reconciled rounding, resampling whole attempts until every
/// partition reaches `min_partition_size`.
pub(crate) fn dirichlet_assignment(
    assignment: &DirichletAssignment<'_>,
    rng: &mut Xoshiro256PlusPlus,
) -> Result<Vec<Vec<u64>>, PartitionError> {
    let p = assignment.num_partitions;
    let total_rows: usize = assignment.class_indices.iter().map(Vec::len).sum();
    let average_size = total_rows / p;

    for attempt in 0..=assignment.max_retries {
        let mut partitions: Vec<Vec<u64>> = vec![Vec::new(); p];

        for (class, indices) in assignment.class_indices.iter().enumerate() {
            if indices.is_empty() {
                continue;
            }
            let mut proportions = symmetric_dirichlet(assignment.alphas[class], p, rng)?;

            if assignment.self_balancing {
                // Stop feeding partitions that already reached the average
                // size, renormalizing over the rest.
                for (id, partition) in partitions.iter().enumerate() {
                    if partition.len() >= average_size && average_size > 0 {
                        proportions[id] = 0.0;
                    }
                }
                let mass: f64 = proportions.iter().sum();
                if mass > 0.0 {
                    for value in &mut proportions {
                        *value /= mass;
                    }
                } else {
                    proportions = vec![1.0 / p as f64; p];
                }
            }

            let counts = apportion(indices.len(), &proportions)?;
            let class_rows: Vec<u64> = if assignment.shuffle {
                let mut rows = indices.clone();
                rows.shuffle(rng);
                rows
            } else {
                indices.clone()
            };
            for (partition, chunk) in partitions
                .iter_mut()
                .zip(slice_by_sizes(&class_rows, &counts))
            {
                partition.extend(chunk);
            }
        }

        let smallest = partitions.iter().map(Vec::len).min().unwrap_or(0);
        if smallest >= assignment.min_partition_size {
            if assignment.shuffle {
                for partition in &mut partitions {
                    partition.shuffle(rng);
                }
            }
            return Ok(partitions);
        }
        tracing::warn!(
            attempt,
            smallest,
            min_partition_size = assignment.min_partition_size,
            "partition below min_partition_size, resampling"
        );
    }

    Err(PartitionError::MinSizeUnreachable {
        min_partition_size: assignment.min_partition_size,
        retries: assignment.max_retries,
    })
}

// =============================================================================
// DirichletPartitioner
// =============================================================================

/// Per-class partition proportions sampled from a Dirichlet distribution.
///
/// For each distinct value of `partition_by` (sorted key order), a
/// length-`num_partitions` proportion vector is drawn from a symmetric
/// Dirichlet with that class's concentration, and the class's rows are
/// split accordingly. If any partition ends below `min_partition_size`,
/// the whole assignment is resampled with fresh draws, up to `max_retries`
/// times.
///
/// # Example
///
/// ```
/// use fedsplit::partition::DirichletPartitioner;
///
/// let strategy = DirichletPartitioner::builder()
///     .num_partitions(10)
///     .partition_by("label")
///     .alpha(0.5)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct DirichletPartitioner {
    /// Number of partitions. Must be at least 1.
    pub num_partitions: usize,

    /// Class column driving the split.
    #[builder(into)]
    pub partition_by: String,

    /// Concentration: scalar broadcast or one value per class.
    #[builder(into)]
    pub alpha: Alpha,

    /// Smallest partition size accepted without resampling. Default: 10.
    #[builder(default = 10)]
    pub min_partition_size: usize,

    /// Resampling budget. Default: 10.
    #[builder(default = 10)]
    pub max_retries: usize,

    /// Divert mass away from partitions already at the average size.
    /// Default: false.
    #[builder(default = false)]
    pub self_balancing: bool,

    /// Shuffle rows within classes and partitions. Default: true.
    #[builder(default = true)]
    pub shuffle: bool,

    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,
}

impl<S: dirichlet_partitioner_builder::IsComplete> DirichletPartitionerBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidNumPartitions`] or
    /// [`ConfigError::InvalidAlpha`] on out-of-range parameters.
    pub fn build(self) -> Result<DirichletPartitioner, ConfigError> {
        let strategy = self.__build_internal();
        if strategy.num_partitions == 0 {
            return Err(ConfigError::InvalidNumPartitions);
        }
        strategy.alpha.validate()?;
        Ok(strategy)
    }
}

impl PartitionStrategy for DirichletPartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        Some(self.num_partitions)
    }

    fn partition_column(&self) -> Option<&str> {
        Some(&self.partition_by)
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let keys = dataset.class_keys(&self.partition_by)?;
        let grouped = indices_by_key(&keys);
        let class_indices: Vec<Vec<u64>> = grouped.into_values().collect();
        let alphas = self.alpha.for_classes(class_indices.len())?;

        let mut rng = seeded_rng(self.seed);
        let partitions = dirichlet_assignment(
            &DirichletAssignment {
                class_indices: &class_indices,
                alphas: &alphas,
                num_partitions: self.num_partitions,
                min_partition_size: self.min_partition_size,
                max_retries: self.max_retries,
                self_balancing: self.self_balancing,
                shuffle: self.shuffle,
            },
            &mut rng,
        )?;
        Ok(PartitionMapping::Rows(partitions))
    }
}
