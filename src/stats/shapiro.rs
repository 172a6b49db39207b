//! Shapiro-Wilk normality test
//!
//! Coefficients and p-value follow Royston (1995), Algorithm AS R94, which
//! covers 3 <= n <= 5000.

use super::{check_finite, mean, standard_normal, Result, StatsError};
use serde::Serialize;
use statrs::distribution::ContinuousCDF;
use std::cmp::Ordering;

const MAX_N: usize = 5000;

const G: [f64; 2] = [-2.273, 0.459];
const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];

/// Result of a Shapiro-Wilk test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapiroWilk {
    pub w: f64,
    pub pvalue: f64,
    pub n: usize,
}

impl ShapiroWilk {
    /// Whether normality is rejected at `alpha`
    pub fn rejects_normality(&self, alpha: f64) -> bool {
        self.pvalue < alpha
    }
}

/// Polynomial `cc[0] + cc[1] x + cc[2] x^2 + ...`
fn poly(cc: &[f64], x: f64) -> f64 {
    cc.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Test a sample for normality
///
/// Fails when n is outside 3..=5000 or every value is identical.
pub fn shapiro_wilk(sample: &[f64]) -> Result<ShapiroWilk> {
    const TEST: &str = "Shapiro-Wilk";
    check_finite("Shapiro-Wilk input", sample)?;

    let n = sample.len();
    if n < 3 {
        return Err(StatsError::TooFewObservations {
            test: TEST,
            required: 3,
            actual: n,
        });
    }
    if n > MAX_N {
        return Err(StatsError::TooManyObservations {
            test: TEST,
            max: MAX_N,
            actual: n,
        });
    }

    let mut x = sample.to_vec();
    x.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    if x[n - 1] - x[0] < 1e-19 {
        return Err(StatsError::ZeroVariance {
            test: TEST,
            what: "the sample".to_string(),
        });
    }

    let half = royston_coefficients(n)?;

    // Full antisymmetric weight vector over the sorted sample
    let mut a = vec![0.0; n];
    for (i, &coef) in half.iter().enumerate() {
        a[i] = -coef;
        a[n - 1 - i] = coef;
    }

    // W is the squared correlation between the weights and the ordered data
    let mx = mean(&x);
    let (mut sax, mut saa, mut sxx) = (0.0, 0.0, 0.0);
    for (ai, xi) in a.iter().zip(&x) {
        sax += ai * (xi - mx);
        saa += ai * ai;
        sxx += (xi - mx).powi(2);
    }
    let w = ((sax * sax) / (saa * sxx)).min(1.0);

    let pvalue = royston_pvalue(w, n)?;
    Ok(ShapiroWilk { w, pvalue, n })
}

/// Upper-half weights a_1..a_{n/2} (largest first)
fn royston_coefficients(n: usize) -> Result<Vec<f64>> {
    let nn2 = n / 2;
    if n == 3 {
        return Ok(vec![std::f64::consts::FRAC_1_SQRT_2]);
    }

    let normal = standard_normal()?;
    let an = n as f64;
    let an25 = an + 0.25;
    let m: Vec<f64> = (1..=nn2)
        .map(|i| normal.inverse_cdf((i as f64 - 0.375) / an25))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();

    let a1 = poly(&C1, rsn) - m[0] / ssumm2;
    let mut coef = vec![0.0; nn2];
    coef[0] = a1;

    let (first, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        coef[1] = a2;
        let fac = ((summ2 - 2.0 * m[0].powi(2) - 2.0 * m[1].powi(2))
            / (1.0 - 2.0 * a1.powi(2) - 2.0 * a2.powi(2)))
        .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0].powi(2)) / (1.0 - 2.0 * a1.powi(2))).sqrt();
        (1, fac)
    };

    for i in first..nn2 {
        coef[i] = -m[i] / fac;
    }
    Ok(coef)
}

fn royston_pvalue(w: f64, n: usize) -> Result<f64> {
    if n == 3 {
        const PI6: f64 = 6.0 / std::f64::consts::PI;
        const STQR: f64 = std::f64::consts::FRAC_PI_3;
        return Ok((PI6 * (w.sqrt().asin() - STQR)).max(0.0));
    }

    let an = n as f64;
    let mut y = (1.0 - w).ln();
    let (m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return Ok(1e-99);
        }
        y = -(gamma - y).ln();
        (poly(&C3, an), poly(&C4, an).exp())
    } else {
        let xx = an.ln();
        (poly(&C5, xx), poly(&C6, xx).exp())
    };

    let normal = standard_normal()?;
    Ok(normal.sf((y - m) / s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal_scores(n: usize) -> Vec<f64> {
        let normal = standard_normal().unwrap();
        (1..=n)
            .map(|i| normal.inverse_cdf((i as f64 - 0.5) / n as f64))
            .collect()
    }

    #[test]
    fn test_poly() {
        assert_eq!(poly(&[1.0, 2.0, 3.0], 2.0), 1.0 + 4.0 + 12.0);
        assert_eq!(poly(&G, 10.0), -2.273 + 4.59);
    }

    #[test]
    fn test_coefficients_are_normalized() {
        for n in [4, 5, 6, 11, 12, 50, 159] {
            let half = royston_coefficients(n).unwrap();
            let sum_sq: f64 = 2.0 * half.iter().map(|a| a * a).sum::<f64>();
            assert!((sum_sq - 1.0).abs() < 1e-6, "n={} sum_sq={}", n, sum_sq);
            // weights decrease from the extremes inwards
            assert!(half.windows(2).all(|w| w[0] >= w[1]), "n={}", n);
        }
    }

    #[test]
    fn test_normal_sample_not_rejected() {
        let sample = normal_scores(40);
        let result = shapiro_wilk(&sample).unwrap();
        assert!(result.w > 0.97, "W = {}", result.w);
        assert!(result.pvalue > 0.5, "p = {}", result.pvalue);
        assert!(!result.rejects_normality(0.05));
    }

    #[test]
    fn test_skewed_sample_rejected() {
        let sample: Vec<f64> = (0..30).map(|i| (i as f64 / 3.0).exp()).collect();
        let result = shapiro_wilk(&sample).unwrap();
        assert!(result.w < 0.8, "W = {}", result.w);
        assert!(result.rejects_normality(0.05), "p = {}", result.pvalue);
    }

    #[test]
    fn test_outlier_small_sample_rejected() {
        let sample = [1.0, 1.1, 0.9, 1.0, 1.05, 0.95, 1.0, 10.0];
        let result = shapiro_wilk(&sample).unwrap();
        assert!(result.pvalue < 0.01, "p = {}", result.pvalue);
    }

    #[test]
    fn test_order_invariant() {
        let a = [3.1, 0.4, 2.2, 5.0, 1.7, 2.9, 4.4];
        let mut b = a;
        b.reverse();
        let ra = shapiro_wilk(&a).unwrap();
        let rb = shapiro_wilk(&b).unwrap();
        assert_eq!(ra.w, rb.w);
        assert_eq!(ra.pvalue, rb.pvalue);
    }

    #[test]
    fn test_n3_exact() {
        // Equally spaced points give W = 1 and p = 1
        let result = shapiro_wilk(&[1.0, 2.0, 3.0]).unwrap();
        assert!((result.w - 1.0).abs() < 1e-12);
        assert!((result.pvalue - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_w_in_unit_interval() {
        let sample = [12.0, 15.0, 11.0, 19.0, 14.0, 13.0, 30.0, 12.5, 16.0, 14.2, 13.3, 15.9];
        let result = shapiro_wilk(&sample).unwrap();
        assert!(result.w > 0.0 && result.w <= 1.0);
        assert!(result.pvalue >= 0.0 && result.pvalue <= 1.0);
    }

    #[test]
    fn test_reference_weights() {
        // Shapiro & Wilk (1965) weights; R: W = 0.78881, p-value = 0.006704
        let weights = [148.0, 154.0, 158.0, 160.0, 161.0, 162.0, 166.0, 170.0, 182.0, 195.0, 236.0];
        let result = shapiro_wilk(&weights).unwrap();
        assert!((result.w - 0.78881).abs() < 1e-4, "W = {}", result.w);
        assert!((result.pvalue - 0.006704).abs() < 1e-4, "p = {}", result.pvalue);
        assert!(result.rejects_normality(0.05));
    }

    #[test]
    fn test_constant_sample_is_error() {
        assert!(matches!(
            shapiro_wilk(&[5.0; 10]),
            Err(StatsError::ZeroVariance { .. })
        ));
    }

    #[test]
    fn test_too_few() {
        assert!(matches!(
            shapiro_wilk(&[1.0, 2.0]),
            Err(StatsError::TooFewObservations { .. })
        ));
    }

    #[test]
    fn test_too_many() {
        let sample: Vec<f64> = (0..5001).map(f64::from).collect();
        assert!(matches!(
            shapiro_wilk(&sample),
            Err(StatsError::TooManyObservations { .. })
        ));
    }
}
