//! Ordinary least squares with classical inference
//!
//! The design matrix and normal equations live in nalgebra. X'X is
//! Cholesky-factored once; the factor solves for the coefficients and its
//! inverse scaled by the residual variance is the coefficient covariance
//! matrix needed for simple slopes and Johnson-Neyman bounds.

use super::{
    check_finite, mean, sample_sd, t_critical, t_statistic, t_two_sided_p, Result, StatsError,
};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

pub const INTERCEPT: &str = "(Intercept)";

/// One estimated coefficient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    /// b * sd(term column) / sd(outcome); absent for the intercept
    pub std_beta: Option<f64>,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub t: f64,
    pub pvalue: f64,
}

/// A fitted linear model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OlsFit {
    pub model: String,
    pub coefficients: Vec<Coefficient>,
    pub n: usize,
    pub df_residual: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub residual_se: f64,
    pub f_statistic: Option<f64>,
    pub f_pvalue: Option<f64>,
    pub confidence_level: f64,
    #[serde(skip)]
    pub covariance: Vec<Vec<f64>>,
    #[serde(skip)]
    pub fitted: Vec<f64>,
    #[serde(skip)]
    pub residuals: Vec<f64>,
}

impl OlsFit {
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.coefficients.iter().position(|c| c.term == term)
    }

    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.term == term)
    }

    /// Sampling covariance of two coefficient estimates
    pub fn covariance_of(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.covariance[i][j])
    }
}

/// Fit `y ~ 1 + columns`
///
/// `terms` names each design column (the intercept is added in front).
pub fn fit_ols(
    model: &str,
    terms: &[String],
    columns: &[Vec<f64>],
    y: &[f64],
    confidence: f64,
) -> Result<OlsFit> {
    let n = y.len();
    let p = columns.len() + 1;
    check_finite(model, y)?;
    for (term, col) in terms.iter().zip(columns) {
        super::check_same_len("outcome", y, term, col)?;
        check_finite(term, col)?;
    }
    if terms.len() != columns.len() {
        return Err(StatsError::LengthMismatch {
            left: "term names".to_string(),
            left_len: terms.len(),
            right: "design columns".to_string(),
            right_len: columns.len(),
        });
    }
    if n <= p {
        return Err(StatsError::TooFewObservations {
            test: "linear model",
            required: p + 1,
            actual: n,
        });
    }

    let sd_y = sample_sd(y);
    if sd_y == 0.0 {
        return Err(StatsError::ZeroVariance {
            test: "linear model",
            what: format!("the outcome of {}", model),
        });
    }

    let x = DMatrix::from_fn(n, p, |i, j| if j == 0 { 1.0 } else { columns[j - 1][i] });
    let y_vec = DVector::from_column_slice(y);
    let xt = x.transpose();
    let xtx = &xt * &x;

    let singular = || StatsError::SingularDesign {
        model: model.to_string(),
    };
    if is_rank_deficient(&xtx) {
        return Err(singular());
    }
    let cholesky = xtx.cholesky().ok_or_else(singular)?;
    let beta = cholesky.solve(&(&xt * &y_vec));
    let xtx_inv = cholesky.inverse();

    let fitted = &x * &beta;
    let residuals = &y_vec - &fitted;

    let rss = residuals.norm_squared();
    let my = mean(y);
    let tss: f64 = y.iter().map(|v| (v - my).powi(2)).sum();
    let df_residual = n - p;
    let sigma2 = rss / df_residual as f64;

    let covariance: Vec<Vec<f64>> = (0..p)
        .map(|i| (0..p).map(|j| xtx_inv[(i, j)] * sigma2).collect())
        .collect();

    let crit = t_critical(confidence, df_residual as f64)?;
    let mut coefficients = Vec::with_capacity(p);
    for (k, &estimate) in beta.iter().enumerate() {
        let (term, std_beta) = if k == 0 {
            (INTERCEPT.to_string(), None)
        } else {
            let sd_x = sample_sd(&columns[k - 1]);
            (terms[k - 1].clone(), Some(estimate * sd_x / sd_y))
        };
        let std_error = covariance[k][k].max(0.0).sqrt();
        let t = t_statistic(estimate, std_error);
        coefficients.push(Coefficient {
            term,
            estimate,
            std_error,
            std_beta,
            ci_lower: estimate - crit * std_error,
            ci_upper: estimate + crit * std_error,
            t,
            pvalue: t_two_sided_p(t, df_residual as f64)?,
        });
    }

    let r_squared = (1.0 - rss / tss).clamp(0.0, 1.0);
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_residual as f64;

    let (f_statistic, f_pvalue) = if p > 1 {
        let df1 = (p - 1) as f64;
        let df2 = df_residual as f64;
        if rss > 0.0 {
            let f = ((tss - rss) / df1) / (rss / df2);
            let dist = FisherSnedecor::new(df1, df2)
                .map_err(|e| StatsError::Distribution(e.to_string()))?;
            (Some(f), Some(dist.sf(f.max(0.0))))
        } else {
            (Some(f64::INFINITY), Some(0.0))
        }
    } else {
        (None, None)
    };

    Ok(OlsFit {
        model: model.to_string(),
        coefficients,
        n,
        df_residual,
        r_squared,
        adj_r_squared,
        residual_se: sigma2.sqrt(),
        f_statistic,
        f_pvalue,
        confidence_level: confidence,
        covariance,
        fitted: fitted.iter().copied().collect(),
        residuals: residuals.iter().copied().collect(),
    })
}

/// Whether the smallest singular value of X'X vanishes relative to the largest
fn is_rank_deficient(xtx: &DMatrix<f64>) -> bool {
    let singular_values = xtx.singular_values();
    let largest = singular_values.max();
    largest <= 0.0 || singular_values.min() <= largest * 1e-12
}
