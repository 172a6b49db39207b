//! Paired t-test
//!
//! Computed in f64 with the exact Student t tail from statrs. aprender's
//! `ttest_rel` agrees on the statistic but works in f32 and falls back to a
//! normal tail above 30 degrees of freedom, which understates p for the
//! sample sizes this analysis sees.

use super::{
    check_finite, check_same_len, mean, sample_sd, t_critical, t_two_sided_p, Result, StatsError,
};
use serde::Serialize;

/// Result of a two-sided paired t-test of `first - second`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedTTest {
    pub mean_difference: f64,
    pub sd_difference: f64,
    pub t: f64,
    pub df: f64,
    pub pvalue: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub confidence_level: f64,
    /// Cohen's d_z: mean difference over SD of differences
    pub cohens_dz: f64,
}

pub fn paired_t_test(first: &[f64], second: &[f64], confidence: f64) -> Result<PairedTTest> {
    check_same_len("first sample", first, "second sample", second)?;
    check_finite("paired t-test input", first)?;
    check_finite("paired t-test input", second)?;
    if first.len() < 2 {
        return Err(StatsError::TooFewObservations {
            test: "paired t-test",
            required: 2,
            actual: first.len(),
        });
    }

    let diffs: Vec<f64> = first.iter().zip(second).map(|(a, b)| a - b).collect();
    let md = mean(&diffs);
    let sd = sample_sd(&diffs);
    if sd == 0.0 {
        return Err(StatsError::ZeroVariance {
            test: "paired t-test",
            what: "the paired differences".to_string(),
        });
    }

    let n = diffs.len() as f64;
    let df = n - 1.0;
    let se = sd / n.sqrt();
    let t = md / se;
    let crit = t_critical(confidence, df)?;

    Ok(PairedTTest {
        mean_difference: md,
        sd_difference: sd,
        t,
        df,
        pvalue: t_two_sided_p(t, df)?,
        ci_lower: md - crit * se,
        ci_upper: md + crit * se,
        confidence_level: confidence,
        cohens_dz: md / sd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paired_t_known_values() {
        // diffs 1, 2, 3, 4, 5: mean 3, sd sqrt(2.5), t = 3 / (sqrt(2.5)/sqrt(5)) = 4.2426
        let first = [2.0, 4.0, 6.0, 8.0, 10.0];
        let second = [1.0, 2.0, 3.0, 4.0, 5.0];
        let r = paired_t_test(&first, &second, 0.95).unwrap();
        assert_eq!(r.mean_difference, 3.0);
        assert!((r.t - 4.242641).abs() < 1e-5);
        assert_eq!(r.df, 4.0);
        assert!(r.pvalue > 0.01 && r.pvalue < 0.02, "p = {}", r.pvalue);
        assert!(r.ci_lower > 0.0 && r.ci_upper > r.ci_lower);
        assert!((r.cohens_dz - 3.0 / 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_statistic_agrees_with_aprender_ttest_rel() {
        let first = [12.0, 15.5, 11.0, 18.0, 14.5, 16.0, 13.0];
        let second = [11.0, 14.0, 11.5, 15.0, 13.0, 15.5, 12.5];
        let r = paired_t_test(&first, &second, 0.95).unwrap();

        let to_f32 = |v: &[f64]| v.iter().map(|&x| x as f32).collect::<Vec<f32>>();
        let reference =
            aprender::stats::hypothesis::ttest_rel(&to_f32(&first), &to_f32(&second)).unwrap();
        assert!((r.t - f64::from(reference.statistic)).abs() < 1e-3 * r.t.abs());
        assert_eq!(r.df, f64::from(reference.df));
    }

    #[test]
    fn test_pvalue_uses_student_t_tail_at_moderate_df() {
        // 41 pairs, t = 1.995 on 40 df: the t tail gives p = 0.053 while a
        // normal tail would report 0.046
        let first: Vec<f64> = (0..41).map(|i| 0.5 + f64::from(i % 5)).collect();
        let second = vec![2.0; 41];
        let r = paired_t_test(&first, &second, 0.95).unwrap();
        assert!((r.t - 1.994906).abs() < 1e-5, "t = {}", r.t);
        assert_eq!(r.df, 40.0);
        assert!((r.pvalue - t_two_sided_p(r.t, 40.0).unwrap()).abs() < 1e-15);
        assert!(r.pvalue > 0.05, "p = {}", r.pvalue);

        let normal = statrs::distribution::Normal::new(0.0, 1.0).unwrap();
        let normal_p = 2.0 * statrs::distribution::ContinuousCDF::sf(&normal, r.t.abs());
        assert!(normal_p < 0.05);
    }

    #[test]
    fn test_paired_t_constant_difference_is_error() {
        let first = [6.0, 7.0, 8.0];
        let second = [1.0, 2.0, 3.0];
        assert!(matches!(
            paired_t_test(&first, &second, 0.95),
            Err(StatsError::ZeroVariance { .. })
        ));
    }

    #[test]
    fn test_paired_t_too_few() {
        assert!(paired_t_test(&[1.0], &[2.0], 0.95).is_err());
    }
}
