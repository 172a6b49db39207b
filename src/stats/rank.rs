//! Ranking and correlation

use super::{check_finite, check_same_len, mean, t_two_sided_p, Result, StatsError};
use serde::Serialize;
use std::cmp::Ordering;

/// Ranks starting at 1, ties receive the average of the ranks they span
///
/// Values must be finite; NaN ordering is treated as equal.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // positions start..=end hold ranks start+1..=end+1
        let avg = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = avg;
        }
        start = end + 1;
    }
    ranks
}

/// Pearson product-moment correlation
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64> {
    check_same_len("x", x, "y", y)?;
    if x.len() < 2 {
        return Err(StatsError::TooFewObservations {
            test: "correlation",
            required: 2,
            actual: x.len(),
        });
    }
    let mx = mean(x);
    let my = mean(y);
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 {
        return Err(StatsError::ZeroVariance {
            test: "correlation",
            what: "x".to_string(),
        });
    }
    if syy == 0.0 {
        return Err(StatsError::ZeroVariance {
            test: "correlation",
            what: "y".to_string(),
        });
    }
    Ok((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Correlation coefficient with its significance
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    pub coefficient: f64,
    pub n: usize,
    pub pvalue: f64,
}

/// Spearman rank correlation, p-value from the t approximation with n - 2 df
pub fn spearman(x: &[f64], y: &[f64]) -> Result<Correlation> {
    check_same_len("x", x, "y", y)?;
    check_finite("spearman input", x)?;
    check_finite("spearman input", y)?;
    if x.len() < 3 {
        return Err(StatsError::TooFewObservations {
            test: "Spearman correlation",
            required: 3,
            actual: x.len(),
        });
    }

    let rho = pearson(&average_ranks(x), &average_ranks(y))?;
    let df = (x.len() - 2) as f64;
    let pvalue = if rho.abs() >= 1.0 {
        0.0
    } else {
        let t = rho * (df / (1.0 - rho * rho)).sqrt();
        t_two_sided_p(t, df)?
    };

    Ok(Correlation {
        coefficient: rho,
        n: x.len(),
        pvalue,
    })
}
