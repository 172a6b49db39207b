// Statistical kernels for the tapping analysis
//
// Everything downstream of the loader goes through these functions:
// - Shapiro-Wilk normality test (Royston 1995, AS R94)
// - Wilcoxon signed-rank and paired t-test for the hand comparison
// - Average ranks and Pearson/Spearman correlation
// - Ordinary least squares with coefficient inference and diagnostics
//
// Probability distributions and moments come from statrs, matrix algebra
// from nalgebra; all arithmetic is f64.
// Degenerate inputs are errors, never silently defaulted.

mod diagnostics;
mod ols;
mod rank;
mod shapiro;
mod ttest;
mod wilcoxon;

pub use diagnostics::{breusch_pagan, variance_inflation, BreuschPagan};
pub use ols::{fit_ols, Coefficient, OlsFit, INTERCEPT};
pub use rank::{average_ranks, pearson, spearman, Correlation};
pub use shapiro::{shapiro_wilk, ShapiroWilk};
pub use ttest::{paired_t_test, PairedTTest};
pub use wilcoxon::{wilcoxon_signed_rank, WilcoxonMethod, WilcoxonSignedRank};

use crate::dataset::PairingError;
use aprender::stats::DescriptiveStats;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use statrs::statistics::Statistics;
use thiserror::Error;

/// Statistical precondition failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("{test}: need at least {required} observations, got {actual}")]
    TooFewObservations {
        test: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("{test}: at most {max} observations supported, got {actual}")]
    TooManyObservations {
        test: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{test}: all values of {what} are identical, the test is undefined")]
    ZeroVariance { test: &'static str, what: String },

    #[error("{test}: all paired differences are zero")]
    AllDifferencesZero { test: &'static str },

    #[error("{what}: non-finite value encountered")]
    NonFinite { what: String },

    #[error("Design matrix for {model} is singular (collinear terms)")]
    SingularDesign { model: String },

    #[error("Model {model} has no term '{term}'")]
    MissingTerm { model: String, term: String },

    #[error("Length mismatch: {left} has {left_len} values, {right} has {right_len}")]
    LengthMismatch {
        left: String,
        left_len: usize,
        right: String,
        right_len: usize,
    },

    #[error("Invalid distribution parameters: {0}")]
    Distribution(String),

    #[error("Failed to compute quantile {q}: {reason}")]
    Quantile { q: f64, reason: String },

    #[error(transparent)]
    Pairing(#[from] PairingError),
}

pub type Result<T> = std::result::Result<T, StatsError>;

/// Arithmetic mean; NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    Statistics::mean(values)
}

/// Sample variance with n - 1 denominator; NaN below two values
pub fn sample_variance(values: &[f64]) -> f64 {
    Statistics::variance(values)
}

/// Sample standard deviation with n - 1 denominator
pub fn sample_sd(values: &[f64]) -> f64 {
    Statistics::std_dev(values)
}

/// Sample quantile (R-7 interpolation) via aprender's `DescriptiveStats`
///
/// Computed in single precision; used for medians and box summaries where
/// two-decimal display is all that is needed.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(StatsError::Quantile {
            q,
            reason: "empty sample".to_string(),
        });
    }
    let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let vector = trueno::Vector::from_slice(&data);
    DescriptiveStats::new(&vector)
        .quantile(q)
        .map(f64::from)
        .map_err(|e| StatsError::Quantile {
            q,
            reason: e.to_string(),
        })
}

pub fn median(values: &[f64]) -> Result<f64> {
    quantile(values, 0.5)
}

pub(crate) fn check_same_len(left: &str, a: &[f64], right: &str, b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(StatsError::LengthMismatch {
            left: left.to_string(),
            left_len: a.len(),
            right: right.to_string(),
            right_len: b.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_finite(what: &str, values: &[f64]) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite {
            what: what.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| StatsError::Distribution(e.to_string()))
}

pub(crate) fn students_t(df: f64) -> Result<StudentsT> {
    StudentsT::new(0.0, 1.0, df).map_err(|e| StatsError::Distribution(e.to_string()))
}

/// Two-sided p-value of a t statistic
pub fn t_two_sided_p(t: f64, df: f64) -> Result<f64> {
    if t.is_infinite() {
        return Ok(0.0);
    }
    let dist = students_t(df)?;
    Ok((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Critical t value for a two-sided interval with the given coverage
pub fn t_critical(confidence: f64, df: f64) -> Result<f64> {
    let dist = students_t(df)?;
    Ok(dist.inverse_cdf(0.5 + confidence / 2.0))
}

/// t statistic that tolerates a zero standard error
///
/// Zero error with a zero estimate is reported as t = 0 (no evidence);
/// zero error with a non-zero estimate as an infinite t.
pub(crate) fn t_statistic(estimate: f64, se: f64) -> f64 {
    if se > 0.0 {
        estimate / se
    } else if estimate == 0.0 {
        0.0
    } else {
        f64::INFINITY.copysign(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_sd() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        // sum of squares 32, n - 1 = 7
        assert!((sample_variance(&values) - 32.0 / 7.0).abs() < 1e-12);
        assert!((sample_sd(&values) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_descriptives() {
        assert!(mean(&[]).is_nan());
        assert!(sample_variance(&[3.0]).is_nan());
        assert!(sample_sd(&[3.0]).is_nan());
        assert_eq!(sample_sd(&[4.0, 4.0, 4.0]), 0.0);
    }

    #[test]
    fn test_t_two_sided_p_symmetry() {
        let p_pos = t_two_sided_p(2.0, 10.0).unwrap();
        let p_neg = t_two_sided_p(-2.0, 10.0).unwrap();
        assert!((p_pos - p_neg).abs() < 1e-12);
        // t = 2.228 is the 97.5th percentile at df = 10
        assert!((t_two_sided_p(2.228139, 10.0).unwrap() - 0.05).abs() < 1e-4);
        assert_eq!(t_two_sided_p(0.0, 5.0).unwrap(), 1.0);
        assert_eq!(t_two_sided_p(f64::INFINITY, 5.0).unwrap(), 0.0);
    }

    #[test]
    fn test_t_critical() {
        let crit = t_critical(0.95, 10.0).unwrap();
        assert!((crit - 2.228139).abs() < 1e-4);
    }

    #[test]
    fn test_t_statistic_zero_se() {
        assert_eq!(t_statistic(0.0, 0.0), 0.0);
        assert_eq!(t_statistic(2.0, 0.0), f64::INFINITY);
        assert_eq!(t_statistic(-2.0, 0.0), f64::NEG_INFINITY);
        assert_eq!(t_statistic(4.0, 2.0), 2.0);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[1.0, 3.0, 5.0, 7.0, 9.0]).unwrap(), 5.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_quartiles() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&values, 0.25).unwrap(), 2.0);
        assert_eq!(quantile(&values, 0.75).unwrap(), 4.0);
        assert!(quantile(&[], 0.5).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let err = check_same_len("a", &[1.0], "b", &[1.0, 2.0]).unwrap_err();
        assert!(err.to_string().contains("a has 1 values"));
    }
}
