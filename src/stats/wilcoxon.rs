//! Wilcoxon signed-rank test for paired samples
//!
//! Zero differences are dropped. With fewer than 50 non-zero differences and
//! no tied magnitudes the exact null distribution of V is used; otherwise
//! the normal approximation with tie and continuity correction.

use super::rank::average_ranks;
use super::{check_finite, check_same_len, standard_normal, Result, StatsError};
use serde::Serialize;
use statrs::distribution::ContinuousCDF;

const EXACT_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WilcoxonMethod {
    Exact,
    NormalApproximation,
}

/// Result of a two-sided Wilcoxon signed-rank test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WilcoxonSignedRank {
    /// Sum of ranks of positive differences (`first - second`)
    pub v: f64,
    pub pvalue: f64,
    pub method: WilcoxonMethod,
    /// Number of pairs supplied
    pub n_pairs: usize,
    /// Pairs left after dropping zero differences
    pub n_nonzero: usize,
    /// Standardised statistic implied by the p-value, signed like `v - E[v]`
    pub z: f64,
    /// Effect size r = |z| / sqrt(n_pairs)
    pub effect_size_r: f64,
}

/// Two-sided signed-rank test of `first - second`
pub fn wilcoxon_signed_rank(first: &[f64], second: &[f64]) -> Result<WilcoxonSignedRank> {
    const TEST: &str = "Wilcoxon signed-rank";
    check_same_len("first sample", first, "second sample", second)?;
    check_finite("Wilcoxon input", first)?;
    check_finite("Wilcoxon input", second)?;
    if first.is_empty() {
        return Err(StatsError::TooFewObservations {
            test: TEST,
            required: 1,
            actual: 0,
        });
    }

    let diffs: Vec<f64> = first
        .iter()
        .zip(second)
        .map(|(a, b)| a - b)
        .filter(|d| *d != 0.0)
        .collect();
    let n = diffs.len();
    if n == 0 {
        return Err(StatsError::AllDifferencesZero { test: TEST });
    }

    let magnitudes: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let ranks = average_ranks(&magnitudes);
    let v: f64 = ranks
        .iter()
        .zip(&diffs)
        .filter(|(_, d)| **d > 0.0)
        .map(|(r, _)| r)
        .sum();

    let has_ties = {
        let mut sorted = magnitudes.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted.windows(2).any(|w| w[0] == w[1])
    };
    let n_f = n as f64;
    let expected = n_f * (n_f + 1.0) / 4.0;
    let normal = standard_normal()?;

    let (pvalue, method) = if n < EXACT_LIMIT && !has_ties && n == first.len() {
        (exact_pvalue(v, n), WilcoxonMethod::Exact)
    } else {
        let tie_term: f64 = tie_group_sizes(&ranks)
            .into_iter()
            .map(|t| t * t * t - t)
            .sum::<f64>()
            / 48.0;
        let sigma = (n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_term).sqrt();
        let centered = v - expected;
        let correction = if centered == 0.0 {
            0.0
        } else {
            0.5 * centered.signum()
        };
        let z = if sigma > 0.0 {
            (centered - correction) / sigma
        } else {
            0.0
        };
        let p = (2.0 * normal.cdf(-z.abs())).min(1.0);
        (p, WilcoxonMethod::NormalApproximation)
    };

    let z_magnitude = if pvalue > 0.0 {
        -normal.inverse_cdf(pvalue / 2.0)
    } else {
        f64::INFINITY
    };
    let z = z_magnitude.copysign(v - expected);

    Ok(WilcoxonSignedRank {
        v,
        pvalue,
        method,
        n_pairs: first.len(),
        n_nonzero: n,
        z,
        effect_size_r: z.abs() / (first.len() as f64).sqrt(),
    })
}

/// Sizes of groups sharing the same average rank
fn tie_group_sizes(ranks: &[f64]) -> Vec<f64> {
    let mut sorted = ranks.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut sizes = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        sizes.push((j - i + 1) as f64);
        i = j + 1;
    }
    sizes
}

/// Exact two-sided p-value from the null distribution of V
fn exact_pvalue(v: f64, n: usize) -> f64 {
    let max = n * (n + 1) / 2;
    // counts[s] = number of sign assignments with rank sum s
    let mut counts = vec![0.0f64; max + 1];
    counts[0] = 1.0;
    for k in 1..=n {
        for s in (k..=max).rev() {
            counts[s] += counts[s - k];
        }
    }
    let total = 2f64.powi(n as i32);
    let v = v.round() as usize;
    let expected = n as f64 * (n as f64 + 1.0) / 4.0;

    let p = if v as f64 > expected {
        2.0 * counts[v..].iter().sum::<f64>() / total
    } else {
        2.0 * counts[..=v].iter().sum::<f64>() / total
    };
    p.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_small_sample() {
        // All five differences positive with distinct magnitudes: V = 15,
        // P(V >= 15) = 1/32, two-sided 1/16
        let first = [11.0, 12.0, 13.0, 14.0, 15.0];
        let second = [10.0, 10.0, 10.0, 10.0, 10.0];
        let result = wilcoxon_signed_rank(&first, &second).unwrap();
        assert_eq!(result.method, WilcoxonMethod::Exact);
        assert_eq!(result.v, 15.0);
        assert!((result.pvalue - 0.0625).abs() < 1e-12);
        assert!(result.z > 0.0);
    }

    #[test]
    fn test_exact_symmetric_lower_tail() {
        let first = [10.0; 5];
        let second = [11.0, 12.0, 13.0, 14.0, 15.0];
        let result = wilcoxon_signed_rank(&first, &second).unwrap();
        assert_eq!(result.v, 0.0);
        assert!((result.pvalue - 0.0625).abs() < 1e-12);
        assert!(result.z < 0.0);
    }

    #[test]
    fn test_constant_shift_is_significant() {
        // Every pair differs by +5: all magnitudes tied, normal approximation
        let second: Vec<f64> = (0..20).map(|i| 30.0 + i as f64).collect();
        let first: Vec<f64> = second.iter().map(|s| s + 5.0).collect();
        let result = wilcoxon_signed_rank(&first, &second).unwrap();
        assert_eq!(result.method, WilcoxonMethod::NormalApproximation);
        assert_eq!(result.v, 210.0);
        assert!(result.pvalue < 0.001, "p = {}", result.pvalue);
        assert!(result.z > 0.0);
        assert!(result.effect_size_r > 0.9);
    }

    #[test]
    fn test_zero_differences_dropped() {
        let first = [1.0, 2.0, 3.0, 8.0];
        let second = [1.0, 2.0, 1.0, 1.0];
        let result = wilcoxon_signed_rank(&first, &second).unwrap();
        assert_eq!(result.n_nonzero, 2);
        assert_eq!(result.n_pairs, 4);
        assert_eq!(result.method, WilcoxonMethod::NormalApproximation);
    }

    #[test]
    fn test_all_zero_differences_is_error() {
        let result = wilcoxon_signed_rank(&[1.0, 2.0], &[1.0, 2.0]);
        assert!(matches!(result, Err(StatsError::AllDifferencesZero { .. })));
    }

    #[test]
    fn test_no_difference_large_p() {
        let first = [1.0, 5.0, 2.0, 8.0, 3.0, 9.0];
        let second = [2.0, 3.0, 4.5, 6.0, 7.0, 5.5];
        // diffs -1, 2, -2.5, 2, -4, 3.5: ties at |2|, normal approximation
        let result = wilcoxon_signed_rank(&first, &second).unwrap();
        assert!(result.pvalue > 0.5, "p = {}", result.pvalue);
    }

    #[test]
    fn test_statistic_at_expectation_gives_unit_p() {
        // V = 5 = E[V] with tied magnitudes: no continuity shift, p = 1
        let result = wilcoxon_signed_rank(&[1.0, -1.0, 2.0, -2.0], &[0.0; 4]).unwrap();
        assert_eq!(result.method, WilcoxonMethod::NormalApproximation);
        assert_eq!(result.v, 5.0);
        assert_eq!(result.pvalue, 1.0);
        assert_eq!(result.z, 0.0);
    }

    #[test]
    fn test_normal_approximation_reference() {
        // R: wilcox.test(first, second, paired = TRUE) gives V = 27,
        // p-value = 0.6353 (one zero difference dropped, ties at |5|)
        let first = [125.0, 115.0, 130.0, 140.0, 140.0, 115.0, 140.0, 125.0, 140.0, 135.0];
        let second = [110.0, 122.0, 125.0, 120.0, 140.0, 124.0, 123.0, 137.0, 135.0, 145.0];
        let result = wilcoxon_signed_rank(&first, &second).unwrap();
        assert_eq!(result.method, WilcoxonMethod::NormalApproximation);
        assert_eq!(result.n_nonzero, 9);
        assert_eq!(result.v, 27.0);
        assert!((result.pvalue - 0.635289).abs() < 1e-5, "p = {}", result.pvalue);
    }

    #[test]
    fn test_exact_distribution_sums_to_one() {
        let n = 12;
        let max = n * (n + 1) / 2;
        assert!((exact_pvalue(max as f64 / 2.0, n) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tie_group_sizes() {
        assert_eq!(tie_group_sizes(&[1.0, 2.5, 2.5, 4.0]), vec![1.0, 2.0, 1.0]);
    }
}
