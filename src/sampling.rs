//! Seeded sampling and apportionment helpers shared across strategies.
//!
//! Every function takes an explicit RNG (or is fully deterministic), so
//! reproducibility is a property of `(dataset length, config, seed)` and
//! never of process history. The RNG is `Xoshiro256PlusPlus` seeded via
//! `seed_from_u64`, the same generator the rest of the stack uses for
//! subsampling.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::Gamma;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::ConfigError;

/// Construct the crate-wide RNG from a seed.
pub(crate) fn seeded_rng(seed: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

/// A uniform random permutation of `0..n`.
pub(crate) fn permutation(n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<u64> {
    let mut indices: Vec<u64> = (0..n as u64).collect();
    indices.shuffle(rng);
    indices
}

/// Split `total` into `parts` chunk sizes: `floor(total / parts)` each,
/// with one extra for the first `total % parts` chunks, in id order.
pub(crate) fn even_chunk_sizes(total: usize, parts: usize) -> Vec<usize> {
    debug_assert!(parts > 0, "parts must be positive");
    let base = total / parts;
    let extra = total % parts;
    (0..parts).map(|i| base + usize::from(i < extra)).collect()
}

/// Apportion `total` items proportionally to `weights`.
///
/// Each share is `round(total * w / sum)`. The rounding shortfall or excess
/// is reconciled against the last partitions, walking backwards one item at
/// a time, so the result always sums to `total` exactly.
///
/// # Errors
///
/// [`ConfigError::InvalidWeights`] if any weight is negative or non-finite,
/// or the total mass is not positive.
pub(crate) fn apportion(total: usize, weights: &[f64]) -> Result<Vec<usize>, ConfigError> {
    debug_assert!(!weights.is_empty(), "weights must be non-empty");
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ConfigError::InvalidWeights);
    }
    let sum: f64 = weights.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(ConfigError::InvalidWeights);
    }

    let mut sizes: Vec<usize> = weights
        .iter()
        .map(|&w| ((total as f64) * w / sum).round() as usize)
        .collect();

    let n = sizes.len();
    let mut diff = total as i64 - sizes.iter().sum::<usize>() as i64;
    let mut step = 0usize;
    while diff != 0 {
        let j = n - 1 - (step % n);
        if diff > 0 {
            sizes[j] += 1;
            diff -= 1;
        } else if sizes[j] > 0 {
            sizes[j] -= 1;
            diff += 1;
        }
        step += 1;
    }
    Ok(sizes)
}

/// Slice `indices` sequentially into chunks of the given sizes.
///
/// Debug-asserts that the sizes sum to the index count; no index is skipped
/// or duplicated.
pub(crate) fn slice_by_sizes(indices: &[u64], sizes: &[usize]) -> Vec<Vec<u64>> {
    debug_assert_eq!(
        sizes.iter().sum::<usize>(),
        indices.len(),
        "sizes must cover all indices"
    );
    let mut chunks = Vec::with_capacity(sizes.len());
    let mut offset = 0;
    for &size in sizes {
        chunks.push(indices[offset..offset + size].to_vec());
        offset += size;
    }
    chunks
}

/// Draw proportions from a symmetric Dirichlet of dimension `k`.
///
/// Sampled through the Gamma construction: `x_i ~ Gamma(alpha, 1)`
/// normalized by their sum. For very small `alpha` the draws can underflow
/// to zero simultaneously; that degenerate case falls back to uniform
/// proportions rather than dividing by zero.
///
/// # Errors
///
/// [`ConfigError::InvalidAlpha`] if `alpha` is not positive and finite.
pub(crate) fn symmetric_dirichlet(
    alpha: f64,
    k: usize,
    rng: &mut Xoshiro256PlusPlus,
) -> Result<Vec<f64>, ConfigError> {
    if k == 1 {
        return Ok(vec![1.0]);
    }
    let gamma = Gamma::new(alpha, 1.0).map_err(|_| ConfigError::InvalidAlpha(alpha))?;
    let draws: Vec<f64> = (0..k).map(|_| gamma.sample(rng)).collect();
    Ok(normalize_or_uniform(draws))
}

/// Draw proportions from a Dirichlet with per-dimension concentrations.
///
/// # Errors
///
/// [`ConfigError::InvalidAlpha`] if any concentration is not positive and
/// finite.
pub(crate) fn dirichlet(
    alphas: &[f64],
    rng: &mut Xoshiro256PlusPlus,
) -> Result<Vec<f64>, ConfigError> {
    if alphas.len() == 1 {
        return Ok(vec![1.0]);
    }
    let mut draws = Vec::with_capacity(alphas.len());
    for &alpha in alphas {
        let gamma = Gamma::new(alpha, 1.0).map_err(|_| ConfigError::InvalidAlpha(alpha))?;
        draws.push(gamma.sample(rng));
    }
    Ok(normalize_or_uniform(draws))
}

fn normalize_or_uniform(draws: Vec<f64>) -> Vec<f64> {
    let sum: f64 = draws.iter().sum();
    let k = draws.len();
    if sum > 0.0 && sum.is_finite() {
        draws.into_iter().map(|x| x / sum).collect()
    } else {
        vec![1.0 / k as f64; k]
    }
}

/// Count `n` multinomial draws over `weights` (need not be normalized).
///
/// # Errors
///
/// [`ConfigError::InvalidWeights`] if the weights cannot form a valid
/// categorical distribution.
pub(crate) fn multinomial_counts(
    n: usize,
    weights: &[f64],
    rng: &mut Xoshiro256PlusPlus,
) -> Result<Vec<usize>, ConfigError> {
    let index = WeightedIndex::new(weights).map_err(|_| ConfigError::InvalidWeights)?;
    let mut counts = vec![0usize; weights.len()];
    for _ in 0..n {
        counts[index.sample(rng)] += 1;
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn permutation_is_reproducible_and_complete() {
        let mut rng = seeded_rng(42);
        let perm1 = permutation(100, &mut rng);
        let mut rng = seeded_rng(42);
        let perm2 = permutation(100, &mut rng);
        assert_eq!(perm1, perm2);

        let mut sorted = perm1.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<u64>>());

        let mut rng = seeded_rng(7);
        assert_ne!(permutation(100, &mut rng), perm1);
    }

    #[test]
    fn even_chunks_give_remainder_to_first() {
        assert_eq!(even_chunk_sizes(100, 5), vec![20, 20, 20, 20, 20]);
        assert_eq!(even_chunk_sizes(10, 3), vec![4, 3, 3]);
        assert_eq!(even_chunk_sizes(2, 4), vec![1, 1, 0, 0]);
    }

    #[test]
    fn apportion_exact_weights() {
        let sizes = apportion(100, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(sizes, vec![10, 20, 30, 40]);
    }

    #[test]
    fn apportion_reconciles_against_last() {
        // Thirds of 100 round to 33 each; the missing item goes to the
        // last partition.
        let sizes = apportion(100, &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(sizes.iter().sum::<usize>(), 100);
        assert_eq!(sizes, vec![33, 33, 34]);
    }

    #[test]
    fn apportion_rejects_bad_weights() {
        assert!(apportion(10, &[0.0, 0.0]).is_err());
        assert!(apportion(10, &[1.0, -1.0]).is_err());
        assert!(apportion(10, &[1.0, f64::NAN]).is_err());
    }

    #[test]
    fn slice_by_sizes_covers_all() {
        let chunks = slice_by_sizes(&[5, 6, 7, 8, 9], &[2, 0, 3]);
        assert_eq!(chunks, vec![vec![5, 6], vec![], vec![7, 8, 9]]);
    }

    #[test]
    fn symmetric_dirichlet_sums_to_one() {
        let mut rng = seeded_rng(42);
        let props = symmetric_dirichlet(0.5, 10, &mut rng).unwrap();
        assert_eq!(props.len(), 10);
        assert_abs_diff_eq!(props.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(props.iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn symmetric_dirichlet_high_alpha_is_near_uniform() {
        let mut rng = seeded_rng(42);
        let props = symmetric_dirichlet(10_000.0, 4, &mut rng).unwrap();
        for p in props {
            assert_abs_diff_eq!(p, 0.25, epsilon = 0.05);
        }
    }

    #[test]
    fn symmetric_dirichlet_rejects_bad_alpha() {
        let mut rng = seeded_rng(42);
        assert!(symmetric_dirichlet(0.0, 4, &mut rng).is_err());
        assert!(symmetric_dirichlet(-1.0, 4, &mut rng).is_err());
    }

    #[test]
    fn dirichlet_single_dimension_is_total() {
        let mut rng = seeded_rng(42);
        assert_eq!(dirichlet(&[3.0], &mut rng).unwrap(), vec![1.0]);
    }

    #[test]
    fn multinomial_counts_sum_to_n() {
        let mut rng = seeded_rng(42);
        let counts = multinomial_counts(1000, &[0.5, 0.3, 0.2], &mut rng).unwrap();
        assert_eq!(counts.iter().sum::<usize>(), 1000);
        // With 1000 draws the empirical shares stay close to the weights.
        assert!(counts[0] > counts[2]);
    }

    #[test]
    fn multinomial_rejects_zero_mass() {
        let mut rng = seeded_rng(42);
        assert!(multinomial_counts(10, &[0.0, 0.0], &mut rng).is_err());
    }
}
