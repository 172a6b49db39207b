// Simple slopes and Johnson-Neyman intervals
//
// For focal predictor X, moderator M and product term X:M the conditional
// slope of X at M = m is b_X + b_XM * m with variance
//   Var(b_X) + 2 m Cov(b_X, b_XM) + m^2 Var(b_XM).
// Johnson-Neyman bounds are the m where |slope / se| equals the critical t,
// i.e. the real roots of a quadratic in m.

use super::model::{FittedModel, Predictor, Term};
use crate::stats::{t_critical, t_statistic, t_two_sided_p, StatsError};
use serde::Serialize;

/// Conditional slope of the focal predictor at one moderator value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleSlope {
    pub level: String,
    /// Moderator value in raw units (years, or the 0/1 dummy)
    pub moderator_value: f64,
    pub slope: f64,
    pub std_error: f64,
    pub t: f64,
    pub pvalue: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// slope * sd(focal) / sd(outcome)
    pub std_slope: f64,
}

/// Focal predictor, moderator and the three coefficient pieces
struct Interaction {
    b_focal: f64,
    b_product: f64,
    var_focal: f64,
    cov: f64,
    var_product: f64,
}

impl Interaction {
    fn lookup(model: &FittedModel, focal: Predictor, moderator: Predictor) -> Result<Self, StatsError> {
        let product = model
            .spec
            .interaction(focal, moderator)
            .ok_or_else(|| model.missing(Term::Interaction(focal, moderator)))?;
        let focal = Term::Main(focal);
        Ok(Self {
            b_focal: model.estimate(focal)?,
            b_product: model.estimate(product)?,
            var_focal: model.covariance(focal, focal)?,
            cov: model.covariance(focal, product)?,
            var_product: model.covariance(product, product)?,
        })
    }

    /// (slope, standard error) at a design-scale moderator value
    fn at(&self, m: f64) -> (f64, f64) {
        let slope = self.b_focal + self.b_product * m;
        let var = self.var_focal + 2.0 * m * self.cov + m * m * self.var_product;
        (slope, var.max(0.0).sqrt())
    }
}

/// Conditional slope and standard error at a design-scale moderator value
pub fn conditional_slope(
    model: &FittedModel,
    focal: Predictor,
    moderator: Predictor,
    value: f64,
) -> Result<(f64, f64), StatsError> {
    Ok(Interaction::lookup(model, focal, moderator)?.at(value))
}

fn focal_sd(model: &FittedModel, focal: Predictor) -> f64 {
    match focal {
        Predictor::Aq => model.centering.aq_sd,
        Predictor::Age => model.centering.age_sd,
        Predictor::Gender => {
            let gender_col = model
                .spec
                .terms
                .iter()
                .position(|t| *t == Term::Main(Predictor::Gender));
            gender_col
                .map(|i| crate::stats::sample_sd(&model.design.columns[i]))
                .unwrap_or(f64::NAN)
        }
    }
}

/// Simple slopes of `focal` at labelled design-scale moderator values
pub fn simple_slopes(
    model: &FittedModel,
    focal: Predictor,
    moderator: Predictor,
    levels: &[(String, f64)],
) -> Result<Vec<SimpleSlope>, StatsError> {
    let interaction = Interaction::lookup(model, focal, moderator)?;
    let df = model.fit.df_residual as f64;
    let crit = t_critical(model.fit.confidence_level, df)?;
    let scale = focal_sd(model, focal) / model.outcome_sd;

    levels
        .iter()
        .map(|(label, m)| {
            let (slope, se) = interaction.at(*m);
            let t = t_statistic(slope, se);
            Ok(SimpleSlope {
                level: label.clone(),
                moderator_value: model.centering.to_raw(moderator, *m),
                slope,
                std_error: se,
                t,
                pvalue: t_two_sided_p(t, df)?,
                ci_lower: slope - crit * se,
                ci_upper: slope + crit * se,
                std_slope: slope * scale,
            })
        })
        .collect()
}

/// Mean - 1 SD, mean and mean + 1 SD of age on the centered scale
pub fn age_levels(model: &FittedModel) -> Vec<(String, f64)> {
    let sd = model.centering.age_sd;
    vec![
        ("Mean - 1 SD".to_string(), -sd),
        ("Mean".to_string(), 0.0),
        ("Mean + 1 SD".to_string(), sd),
    ]
}

/// The two dummy-coded gender levels
pub fn gender_levels() -> Vec<(String, f64)> {
    crate::dataset::Gender::ALL
        .into_iter()
        .map(|g| (g.label().to_string(), f64::from(g.dummy())))
        .collect()
}

/// Where along the moderator the focal slope is significant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "region", rename_all = "snake_case")]
pub enum JnRegion {
    Everywhere,
    Nowhere,
    /// Significant for moderator values inside [lower, upper]
    Inside { lower: f64, upper: f64 },
    /// Significant below `lower` and above `upper`
    Outside { lower: f64, upper: f64 },
    Above { bound: f64 },
    Below { bound: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JnBound {
    /// Moderator value in raw units
    pub value: f64,
    pub within_observed: bool,
}

/// Johnson-Neyman result for one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JohnsonNeyman {
    pub focal: Predictor,
    pub moderator: Predictor,
    pub alpha: f64,
    pub t_critical: f64,
    pub bounds: Vec<JnBound>,
    pub region: JnRegion,
    pub observed_min: f64,
    pub observed_max: f64,
}

impl JohnsonNeyman {
    /// Whether the slope is significant at a raw moderator value
    pub fn is_significant_at(&self, value: f64) -> bool {
        match self.region {
            JnRegion::Everywhere => true,
            JnRegion::Nowhere => false,
            JnRegion::Inside { lower, upper } => value >= lower && value <= upper,
            JnRegion::Outside { lower, upper } => value <= lower || value >= upper,
            JnRegion::Above { bound } => value >= bound,
            JnRegion::Below { bound } => value <= bound,
        }
    }
}

/// Solve for moderator values where the focal slope's significance flips
///
/// The slope is significant where
/// (b_X + b_XM m)^2 - t^2 (V_X + 2 m C + m^2 V_XM) > 0, a quadratic
/// a m^2 + b m + c with
///   a = b_XM^2 - t^2 V_XM, b = 2 (b_X b_XM - t^2 C), c = b_X^2 - t^2 V_X.
pub fn johnson_neyman(
    model: &FittedModel,
    focal: Predictor,
    moderator: Predictor,
    alpha: f64,
) -> Result<JohnsonNeyman, StatsError> {
    let i = Interaction::lookup(model, focal, moderator)?;
    let crit = t_critical(1.0 - alpha, model.fit.df_residual as f64)?;
    let t2 = crit * crit;

    let a = i.b_product.powi(2) - t2 * i.var_product;
    let b = 2.0 * (i.b_focal * i.b_product - t2 * i.cov);
    let c = i.b_focal.powi(2) - t2 * i.var_focal;

    let raw = |m: f64| model.centering.to_raw(moderator, m);
    let region = if a.abs() < f64::EPSILON * (b.abs() + c.abs()).max(1.0) {
        // Degenerate quadratic: linear in m
        if b == 0.0 {
            if c > 0.0 {
                JnRegion::Everywhere
            } else {
                JnRegion::Nowhere
            }
        } else {
            let root = raw(-c / b);
            if b > 0.0 {
                JnRegion::Above { bound: root }
            } else {
                JnRegion::Below { bound: root }
            }
        }
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            if a > 0.0 {
                JnRegion::Everywhere
            } else {
                JnRegion::Nowhere
            }
        } else {
            let sq = disc.sqrt();
            let r1 = (-b - sq) / (2.0 * a);
            let r2 = (-b + sq) / (2.0 * a);
            let (lower, upper) = (raw(r1.min(r2)), raw(r1.max(r2)));
            if a > 0.0 {
                JnRegion::Outside { lower, upper }
            } else {
                JnRegion::Inside { lower, upper }
            }
        }
    };

    let (observed_min, observed_max) = match moderator {
        Predictor::Age => (model.centering.age_min, model.centering.age_max),
        Predictor::Aq => (model.centering.aq_min, model.centering.aq_max),
        Predictor::Gender => (0.0, 1.0),
    };
    let bound_values: Vec<f64> = match region {
        JnRegion::Inside { lower, upper } | JnRegion::Outside { lower, upper } => {
            vec![lower, upper]
        }
        JnRegion::Above { bound } | JnRegion::Below { bound } => vec![bound],
        JnRegion::Everywhere | JnRegion::Nowhere => Vec::new(),
    };
    let bounds = bound_values
        .into_iter()
        .map(|value| JnBound {
            value,
            within_observed: value >= observed_min && value <= observed_max,
        })
        .collect();

    Ok(JohnsonNeyman {
        focal,
        moderator,
        alpha,
        t_critical: crit,
        bounds,
        region,
        observed_min,
        observed_max,
    })
}
