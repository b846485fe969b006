//! Value binning for the continuous strategy.
//!
//! Discretizes a continuous column into a fixed number of bins so the
//! class-driven assignment machinery can run over bins in place of labels.

use serde::{Deserialize, Serialize};

/// Strategy for computing bin boundaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinningStrategy {
    /// Equal-width bins: divide [min, max] into equal intervals.
    /// Fast but poor for skewed data.
    EqualWidth,

    /// Equal-frequency (quantile) bins: each bin holds ~the same number of
    /// rows. Better behaved for skewed real-world distributions.
    #[default]
    Quantile,
}

/// Assign each value to a bin in `0..num_bins`.
///
/// Values must be finite; callers validate before binning. Quantile bins
/// are rank-based: rows are ordered by value (ties broken by row order, so
/// equal values may straddle a bin boundary) and split into equal-count
/// runs. Equal-width bins clamp to the last bin at the maximum; a constant
/// column lands entirely in bin 0.
pub(crate) fn bin_values(values: &[f64], num_bins: usize, strategy: BinningStrategy) -> Vec<u32> {
    debug_assert!(num_bins > 0, "num_bins must be positive");
    debug_assert!(values.iter().all(|v| v.is_finite()));

    match strategy {
        BinningStrategy::Quantile => {
            let n = values.len();
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| {
                values[a]
                    .partial_cmp(&values[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let mut bins = vec![0u32; n];
            for (rank, &row) in order.iter().enumerate() {
                bins[row] = ((rank * num_bins) / n) as u32;
            }
            bins
        }
        BinningStrategy::EqualWidth => {
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let width = (max - min) / num_bins as f64;
            values
                .iter()
                .map(|&v| {
                    if width <= 0.0 {
                        0
                    } else {
                        (((v - min) / width) as u32).min(num_bins as u32 - 1)
                    }
                })
                .collect()
        }
    }
}
