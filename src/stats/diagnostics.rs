//! Regression assumption diagnostics
//!
//! These feed narrative notes only; a violated assumption never changes
//! which model is fitted.

use super::ols::fit_ols;
use super::{Result, StatsError};
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Koenker's studentized Breusch-Pagan test for heteroscedasticity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreuschPagan {
    pub statistic: f64,
    pub df: f64,
    pub pvalue: f64,
}

/// Regress squared residuals on the model's predictors; BP = n * R²
pub fn breusch_pagan(
    terms: &[String],
    columns: &[Vec<f64>],
    residuals: &[f64],
) -> Result<BreuschPagan> {
    let squared: Vec<f64> = residuals.iter().map(|e| e * e).collect();
    let aux = fit_ols("Breusch-Pagan auxiliary", terms, columns, &squared, 0.95)?;
    let df = columns.len() as f64;
    let statistic = aux.n as f64 * aux.r_squared;
    let dist = ChiSquared::new(df).map_err(|e| StatsError::Distribution(e.to_string()))?;
    Ok(BreuschPagan {
        statistic,
        df,
        pvalue: dist.sf(statistic),
    })
}

/// Variance inflation factor of each design column against the others
pub fn variance_inflation(terms: &[String], columns: &[Vec<f64>]) -> Result<Vec<(String, f64)>> {
    if columns.len() < 2 {
        return Ok(terms.iter().map(|t| (t.clone(), 1.0)).collect());
    }

    let mut out = Vec::with_capacity(columns.len());
    for (j, term) in terms.iter().enumerate() {
        let other_terms: Vec<String> = terms
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != j)
            .map(|(_, t)| t.clone())
            .collect();
        let other_columns: Vec<Vec<f64>> = columns
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != j)
            .map(|(_, c)| c.clone())
            .collect();
        let fit = fit_ols(term, &other_terms, &other_columns, &columns[j], 0.95)?;
        let vif = if fit.r_squared < 1.0 {
            1.0 / (1.0 - fit.r_squared)
        } else {
            f64::INFINITY
        };
        out.push((term.clone(), vif));
    }
    Ok(out)
}
