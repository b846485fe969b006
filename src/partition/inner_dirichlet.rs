//! Dirichlet class priors under fixed partition sizes.

use bon::Builder;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::Dataset;
use crate::error::{ConfigError, PartitionError};
use crate::sampling::{dirichlet, seeded_rng};

use super::dirichlet::Alpha;
use super::{indices_by_key, PartitionMapping, PartitionStrategy};

/// Fixes each partition's total size up front and samples its class
/// composition from a Dirichlet prior over classes.
///
/// Every partition draws a class-prior vector from `Dirichlet(alpha)` over
/// the `C` distinct classes of `partition_by`, then fills its configured
/// size by drawing classes from that prior against the remaining per-class
/// budgets. When a class runs out, its prior mass is dropped and the rest
/// renormalized; if a prior carries no mass over the classes still in
/// stock, the remaining stock itself is used as the draw weights.
///
/// # Example
///
/// ```
/// use fedsplit::partition::InnerDirichletPartitioner;
///
/// let strategy = InnerDirichletPartitioner::builder()
///     .partition_sizes(vec![300, 300, 400])
///     .partition_by("label")
///     .alpha(0.5)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct InnerDirichletPartitioner {
    /// Per-partition sizes; must sum to the dataset length.
    pub partition_sizes: Vec<usize>,

    /// Class column driving the composition.
    #[builder(into)]
    pub partition_by: String,

    /// Concentration over classes: scalar broadcast or one value per class.
    #[builder(into)]
    pub alpha: Alpha,

    /// Shuffle draw order within classes and partitions. Default: true.
    #[builder(default = true)]
    pub shuffle: bool,

    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,
}

impl<S: inner_dirichlet_partitioner_builder::IsComplete> InnerDirichletPartitionerBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidNumPartitions`] for an empty size list;
    /// [`ConfigError::InvalidAlpha`] for out-of-range concentrations.
    pub fn build(self) -> Result<InnerDirichletPartitioner, ConfigError> {
        let strategy = self.__build_internal();
        if strategy.partition_sizes.is_empty() {
            return Err(ConfigError::InvalidNumPartitions);
        }
        strategy.alpha.validate()?;
        Ok(strategy)
    }
}

impl PartitionStrategy for InnerDirichletPartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        Some(self.partition_sizes.len())
    }

    fn partition_column(&self) -> Option<&str> {
        Some(&self.partition_by)
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let n = dataset.n_rows();
        let total: usize = self.partition_sizes.iter().sum();
        if total != n {
            return Err(ConfigError::SizesSumMismatch {
                expected: n,
                got: total,
            }
            .into());
        }

        let keys = dataset.class_keys(&self.partition_by)?;
        let grouped = indices_by_key(&keys);
        let alphas = self.alpha.for_classes(grouped.len())?;

        let mut rng = seeded_rng(self.seed);

        // Per-class pools with a draw cursor.
        let mut pools: Vec<Vec<u64>> = grouped.into_values().collect();
        if self.shuffle {
            for pool in &mut pools {
                pool.shuffle(&mut rng);
            }
        }
        let mut cursors = vec![0usize; pools.len()];
        let mut remaining: Vec<usize> = pools.iter().map(Vec::len).collect();

        let mut partitions = Vec::with_capacity(self.partition_sizes.len());
        for &size in &self.partition_sizes {
            let prior = dirichlet(&alphas, &mut rng)?;
            let mut weights: Vec<f64> = prior
                .iter()
                .zip(&remaining)
                .map(|(&w, &left)| if left > 0 { w } else { 0.0 })
                .collect();
            let mut index = stock_weighted_index(&weights, &remaining)?;

            let mut partition = Vec::with_capacity(size);
            for _ in 0..size {
                let class = index.sample(&mut rng);
                partition.push(pools[class][cursors[class]]);
                cursors[class] += 1;
                remaining[class] -= 1;
                if remaining[class] == 0 {
                    weights[class] = 0.0;
                    index = stock_weighted_index(&weights, &remaining)?;
                }
            }
            if self.shuffle {
                partition.shuffle(&mut rng);
            }
            partitions.push(partition);
        }

        Ok(PartitionMapping::Rows(partitions))
    }
}

/// Weighted draw over classes, falling back to remaining stock when the
/// prior carries no mass over the classes still available.
fn stock_weighted_index(
    weights: &[f64],
    remaining: &[usize],
) -> Result<WeightedIndex<f64>, ConfigError> {
    if remaining.iter().all(|&left| left == 0) {
        // Only reachable when the partition budget is already exhausted;
        // keep a valid (never sampled) index instead of failing.
        return WeightedIndex::new(vec![1.0; weights.len().max(1)])
            .map_err(|_| ConfigError::InvalidWeights);
    }
    match WeightedIndex::new(weights) {
        Ok(index) => Ok(index),
        Err(_) => {
            let stock: Vec<f64> = remaining.iter().map(|&left| left as f64).collect();
            WeightedIndex::new(stock).map_err(|_| ConfigError::InvalidWeights)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize, classes: i64) -> Dataset {
        Dataset::builder()
            .add_int("label", (0..n as i64).map(|i| i % classes).collect())
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_empty_sizes() {
        let result = InnerDirichletPartitioner::builder()
            .partition_sizes(vec![])
            .partition_by("label")
            .alpha(1.0)
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::InvalidNumPartitions);
    }

    #[test]
    fn sizes_must_sum_to_length() {
        let strategy = InnerDirichletPartitioner::builder()
            .partition_sizes(vec![10, 10])
            .partition_by("label")
            .alpha(1.0)
            .build()
            .unwrap();
        assert!(matches!(
            strategy.compute_mapping(&dataset(100, 2)),
            Err(PartitionError::Config(ConfigError::SizesSumMismatch {
                expected: 100,
                got: 20,
            }))
        ));
    }

    #[test]
    fn partition_sizes_are_exact() {
        let strategy = InnerDirichletPartitioner::builder()
            .partition_sizes(vec![300, 300, 400])
            .partition_by("label")
            .alpha(0.5)
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&dataset(1000, 2)).unwrap();
        assert_eq!(mapping.partition_sizes(), vec![300, 300, 400]);
    }

    #[test]
    fn covers_all_rows_exactly_once() {
        let strategy = InnerDirichletPartitioner::builder()
            .partition_sizes(vec![250, 250, 250, 250])
            .partition_by("label")
            .alpha(0.2)
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&dataset(1000, 5)).unwrap();
        let PartitionMapping::Rows(rows) = mapping else {
            panic!("expected row mapping");
        };
        let mut all: Vec<u64> = rows.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<u64>>());
    }

    #[test]
    fn per_class_alpha_must_match_class_count() {
        let strategy = InnerDirichletPartitioner::builder()
            .partition_sizes(vec![50, 50])
            .partition_by("label")
            .alpha(vec![1.0, 2.0, 3.0])
            .build()
            .unwrap();
        assert!(matches!(
            strategy.compute_mapping(&dataset(100, 2)),
            Err(PartitionError::Config(
                ConfigError::AlphaLengthMismatch { .. }
            ))
        ));
    }

    #[test]
    fn same_seed_reproduces_mapping() {
        let ds = dataset(400, 4);
        let build = |seed: u64| {
            InnerDirichletPartitioner::builder()
                .partition_sizes(vec![100, 100, 100, 100])
                .partition_by("label")
                .alpha(0.5)
                .seed(seed)
                .build()
                .unwrap()
                .compute_mapping(&ds)
                .unwrap()
        };
        assert_eq!(build(3), build(3));
        assert_ne!(build(3), build(4));
    }
}
