//! Explicit target-distribution partitioning.

use bon::Builder;
use ndarray::Array2;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::error::{ConfigError, PartitionError};
use crate::sampling::{apportion, multinomial_counts, seeded_rng, slice_by_sizes};

use super::{indices_by_key, PartitionMapping, PartitionStrategy};

/// How per-class counts are derived from a proportion column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountMethod {
    /// Seeded multinomial draw.
    #[default]
    Multinomial,
    /// Deterministic rounding, reconciled against the last partitions.
    Rounded,
}

/// Split classes according to a caller-supplied
/// `num_partitions x num_classes` proportion matrix.
///
/// This generalizes the Dirichlet family to arbitrary target shapes: for
/// each class (sorted key order), its column of the matrix is normalized
/// and the class's rows are distributed over partitions by a multinomial
/// draw or by deterministic rounding.
///
/// # Example
///
/// ```
/// use fedsplit::partition::DistributionPartitioner;
/// use ndarray::array;
///
/// // Two partitions, two classes: partition 0 takes all of class 0,
/// // partition 1 all of class 1.
/// let strategy = DistributionPartitioner::builder()
///     .partition_by("label")
///     .distribution(array![[1.0, 0.0], [0.0, 1.0]])
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct DistributionPartitioner {
    /// Class column driving the split.
    #[builder(into)]
    pub partition_by: String,

    /// Target proportions, shape `[num_partitions, num_classes]`.
    pub distribution: Array2<f64>,

    /// Count derivation. Default: `Multinomial`.
    #[builder(default)]
    pub count_method: CountMethod,

    /// Shuffle rows within classes and partitions. Default: true.
    #[builder(default = true)]
    pub shuffle: bool,

    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,
}

impl<S: distribution_partitioner_builder::IsComplete> DistributionPartitionerBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidNumPartitions`] for an empty matrix;
    /// [`ConfigError::InvalidDistribution`] for negative or non-finite
    /// entries, or a class column without mass.
    pub fn build(self) -> Result<DistributionPartitioner, ConfigError> {
        let strategy = self.__build_internal();
        if strategy.distribution.nrows() == 0 {
            return Err(ConfigError::InvalidNumPartitions);
        }
        if strategy
            .distribution
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(ConfigError::InvalidDistribution);
        }
        for column in strategy.distribution.columns() {
            if column.sum() <= 0.0 {
                return Err(ConfigError::InvalidDistribution);
            }
        }
        Ok(strategy)
    }
}

impl PartitionStrategy for DistributionPartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        Some(self.distribution.nrows())
    }

    fn partition_column(&self) -> Option<&str> {
        Some(&self.partition_by)
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let keys = dataset.class_keys(&self.partition_by)?;
        let grouped = indices_by_key(&keys);
        if grouped.len() != self.distribution.ncols() {
            return Err(ConfigError::DistributionShape {
                expected: grouped.len(),
                got: self.distribution.ncols(),
            }
            .into());
        }

        let num_partitions = self.distribution.nrows();
        let mut rng = seeded_rng(self.seed);
        let mut partitions: Vec<Vec<u64>> = vec![Vec::new(); num_partitions];

        for (class, indices) in grouped.into_values().enumerate() {
            let weights = self.distribution.column(class).to_vec();
            let counts = match self.count_method {
                CountMethod::Multinomial => {
                    multinomial_counts(indices.len(), &weights, &mut rng)?
                }
                CountMethod::Rounded => apportion(indices.len(), &weights)?,
            };
            let class_rows: Vec<u64> = if self.shuffle {
                let mut rows = indices;
                rows.shuffle(&mut rng);
                rows
            } else {
                indices
            };
            for (partition, chunk) in partitions
                .iter_mut()
                .zip(slice_by_sizes(&class_rows, &counts))
            {
                partition.extend(chunk);
            }
        }

        if self.shuffle {
            for partition in &mut partitions {
                partition.shuffle(&mut rng);
            }
        }
        Ok(PartitionMapping::Rows(partitions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn dataset(n: usize, classes: i64) -> Dataset {
        Dataset::builder()
            .add_int("label", (0..n as i64).map(|i| i % classes).collect())
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_bad_matrices() {
        let negative = DistributionPartitioner::builder()
            .partition_by("label")
            .distribution(array![[1.0, -0.5], [0.0, 1.0]])
            .build();
        assert_eq!(negative.unwrap_err(), ConfigError::InvalidDistribution);

        let empty_class = DistributionPartitioner::builder()
            .partition_by("label")
            .distribution(array![[1.0, 0.0], [1.0, 0.0]])
            .build();
        assert_eq!(empty_class.unwrap_err(), ConfigError::InvalidDistribution);
    }

    #[test]
    fn matrix_shape_checked_against_classes() {
        let strategy = DistributionPartitioner::builder()
            .partition_by("label")
            .distribution(array![[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]])
            .build()
            .unwrap();
        assert!(matches!(
            strategy.compute_mapping(&dataset(100, 2)),
            Err(PartitionError::Config(ConfigError::DistributionShape {
                expected: 2,
                got: 3,
            }))
        ));
    }

    #[test]
    fn identity_matrix_separates_classes() {
        let ds = dataset(100, 2);
        let strategy = DistributionPartitioner::builder()
            .partition_by("label")
            .distribution(array![[1.0, 0.0], [0.0, 1.0]])
            .count_method(CountMethod::Rounded)
            .shuffle(false)
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&ds).unwrap();
        let PartitionMapping::Rows(rows) = mapping else {
            panic!("expected row mapping");
        };
        assert_eq!(rows[0], (0..100).filter(|i| i % 2 == 0).collect::<Vec<u64>>());
        assert_eq!(rows[1], (0..100).filter(|i| i % 2 == 1).collect::<Vec<u64>>());
    }

    #[test]
    fn multinomial_counts_cover_every_row() {
        let strategy = DistributionPartitioner::builder()
            .partition_by("label")
            .distribution(array![[0.7, 0.1], [0.2, 0.3], [0.1, 0.6]])
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&dataset(1000, 2)).unwrap();
        let PartitionMapping::Rows(rows) = mapping else {
            panic!("expected row mapping");
        };
        let mut all: Vec<u64> = rows.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<u64>>());
    }

    #[test]
    fn rounded_counts_follow_proportions() {
        let strategy = DistributionPartitioner::builder()
            .partition_by("label")
            .distribution(array![[3.0], [1.0]])
            .count_method(CountMethod::Rounded)
            .build()
            .unwrap();
        let ds = Dataset::builder()
            .add_int("label", vec![7; 100])
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&ds).unwrap();
        assert_eq!(mapping.partition_sizes(), vec![75, 25]);
    }

    #[test]
    fn same_seed_reproduces_mapping() {
        let ds = dataset(500, 5);
        let build = |seed: u64| {
            DistributionPartitioner::builder()
                .partition_by("label")
                .distribution(array![
                    [0.5, 0.1, 0.1, 0.1, 0.1],
                    [0.3, 0.5, 0.2, 0.3, 0.4],
                    [0.2, 0.4, 0.7, 0.6, 0.5],
                ])
                .seed(seed)
                .build()
                .unwrap()
                .compute_mapping(&ds)
                .unwrap()
        };
        assert_eq!(build(5), build(5));
        assert_ne!(build(5), build(6));
    }
}
