//! Continuous-label partitioning via binning.

use bon::Builder;

use crate::binning::{bin_values, BinningStrategy};
use crate::data::Dataset;
use crate::error::{ConfigError, PartitionError};
use crate::sampling::seeded_rng;

use super::dirichlet::{dirichlet_assignment, Alpha, DirichletAssignment};
use super::{PartitionMapping, PartitionStrategy};

/// Heterogeneity over a continuous (regression-style) label.
///
/// The label column is discretized into `num_bins` (quantile or
/// equal-width), and the per-class Dirichlet assignment then runs over
/// bins in place of discrete classes: `alpha` tunes how strongly each
/// partition concentrates on a region of the label range.
///
/// # Example
///
/// ```
/// use fedsplit::partition::ContinuousPartitioner;
///
/// let strategy = ContinuousPartitioner::builder()
///     .num_partitions(5)
///     .partition_by("target")
///     .num_bins(10)
///     .alpha(0.3)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct ContinuousPartitioner {
    /// Number of partitions. Must be at least 1.
    pub num_partitions: usize,

    /// Continuous column driving the split.
    #[builder(into)]
    pub partition_by: String,

    /// Number of bins the label range is cut into. Must be at least 1.
    pub num_bins: usize,

    /// Bin boundary strategy. Default: `Quantile`.
    #[builder(default)]
    pub binning: BinningStrategy,

    /// Concentration: scalar broadcast or one value per bin.
    #[builder(into)]
    pub alpha: Alpha,

    /// Smallest partition size accepted without resampling. Default: 0.
    #[builder(default = 0)]
    pub min_partition_size: usize,

    /// Resampling budget. Default: 10.
    #[builder(default = 10)]
    pub max_retries: usize,

    /// Shuffle rows within bins and partitions. Default: true.
    #[builder(default = true)]
    pub shuffle: bool,

    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,
}

impl<S: continuous_partitioner_builder::IsComplete> ContinuousPartitionerBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidNumPartitions`],
    /// [`ConfigError::InvalidNumBins`], or [`ConfigError::InvalidAlpha`]
    /// on out-of-range parameters.
    pub fn build(self) -> Result<ContinuousPartitioner, ConfigError> {
        let strategy = self.__build_internal();
        if strategy.num_partitions == 0 {
            return Err(ConfigError::InvalidNumPartitions);
        }
        if strategy.num_bins == 0 {
            return Err(ConfigError::InvalidNumBins);
        }
        strategy.alpha.validate()?;
        Ok(strategy)
    }
}

impl PartitionStrategy for ContinuousPartitioner {
    fn declared_partitions(&self) -> Option<usize> {
        Some(self.num_partitions)
    }

    fn partition_column(&self) -> Option<&str> {
        Some(&self.partition_by)
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        let values = dataset.numeric_column(&self.partition_by)?;
        let bins = bin_values(&values, self.num_bins, self.binning);

        // Bins play the role of classes; sparse datasets may leave some
        // bins empty, which the assignment skips.
        let mut bin_indices: Vec<Vec<u64>> = vec![Vec::new(); self.num_bins];
        for (row, &bin) in bins.iter().enumerate() {
            bin_indices[bin as usize].push(row as u64);
        }
        let alphas = self.alpha.for_classes(self.num_bins)?;

        let mut rng = seeded_rng(self.seed);
        let partitions = dirichlet_assignment(
            &DirichletAssignment {
                class_indices: &bin_indices,
                alphas: &alphas,
                num_partitions: self.num_partitions,
                min_partition_size: self.min_partition_size,
                max_retries: self.max_retries,
                self_balancing: false,
                shuffle: self.shuffle,
            },
            &mut rng,
        )?;
        Ok(PartitionMapping::Rows(partitions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regression_dataset(n: usize) -> Dataset {
        Dataset::builder()
            .add_float("target", (0..n).map(|i| (i as f64).sqrt()).collect())
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_zero_bins() {
        let result = ContinuousPartitioner::builder()
            .num_partitions(4)
            .partition_by("target")
            .num_bins(0)
            .alpha(1.0)
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::InvalidNumBins);
    }

    #[test]
    fn covers_all_rows_exactly_once() {
        let strategy = ContinuousPartitioner::builder()
            .num_partitions(5)
            .partition_by("target")
            .num_bins(4)
            .alpha(1000.0)
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&regression_dataset(100)).unwrap();
        let PartitionMapping::Rows(rows) = mapping else {
            panic!("expected row mapping");
        };
        let mut all: Vec<u64> = rows.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<u64>>());
    }

    #[test]
    fn high_alpha_spreads_bins_evenly() {
        let strategy = ContinuousPartitioner::builder()
            .num_partitions(5)
            .partition_by("target")
            .num_bins(10)
            .alpha(1000.0)
            .build()
            .unwrap();
        let sizes = strategy
            .compute_mapping(&regression_dataset(1000))
            .unwrap()
            .partition_sizes();
        for size in sizes {
            assert!((150..=250).contains(&size), "uneven partition: {size}");
        }
    }

    #[test]
    fn low_alpha_concentrates_label_ranges() {
        let dataset = regression_dataset(1000);
        let strategy = ContinuousPartitioner::builder()
            .num_partitions(5)
            .partition_by("target")
            .num_bins(5)
            .alpha(0.01)
            .build()
            .unwrap();
        let mapping = strategy.compute_mapping(&dataset).unwrap();
        let PartitionMapping::Rows(rows) = mapping else {
            panic!("expected row mapping");
        };
        let values = dataset.numeric_column("target").unwrap();
        let bins = bin_values(&values, 5, BinningStrategy::Quantile);

        // Near-one-hot bin proportions leave the split visibly skewed:
        // either whole bins collide on few partitions (starving others) or
        // each partition is dominated by a single bin.
        let sizes: Vec<usize> = rows.iter().map(Vec::len).collect();
        let starved =
            sizes.iter().any(|&s| s < 50) && sizes.iter().any(|&s| s >= 150);
        let dominated = rows.iter().any(|partition| {
            if partition.len() < 100 {
                return false;
            }
            let mut counts = [0usize; 5];
            for &row in partition {
                counts[bins[row as usize] as usize] += 1;
            }
            let max = counts.iter().max().copied().unwrap_or(0);
            max as f64 / partition.len() as f64 > 0.9
        });
        assert!(
            starved || dominated,
            "low alpha produced a near-uniform split: sizes {sizes:?}"
        );
    }

    #[test]
    fn string_column_is_rejected() {
        let dataset = Dataset::builder()
            .add_str("target", vec!["a".into(), "b".into()])
            .build()
            .unwrap();
        let strategy = ContinuousPartitioner::builder()
            .num_partitions(2)
            .partition_by("target")
            .num_bins(2)
            .alpha(1.0)
            .build()
            .unwrap();
        assert!(matches!(
            strategy.compute_mapping(&dataset),
            Err(PartitionError::Config(ConfigError::ColumnType { .. }))
        ));
    }

    #[test]
    fn same_seed_reproduces_mapping() {
        let dataset = regression_dataset(500);
        let build = |seed: u64| {
            ContinuousPartitioner::builder()
                .num_partitions(4)
                .partition_by("target")
                .num_bins(8)
                .alpha(0.5)
                .seed(seed)
                .build()
                .unwrap()
                .compute_mapping(&dataset)
                .unwrap()
        };
        assert_eq!(build(2), build(2));
        assert_ne!(build(2), build(3));
    }
}
