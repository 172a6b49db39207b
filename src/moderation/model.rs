// Model specifications and design matrices
//
// Continuous predictors (AQ-10, age) enter centered at their sample means so
// that main effects are conditional effects at the mean of the other
// predictor. Gender enters as its 0/1 dummy.

use crate::dataset::{Hand, Participant};
use crate::stats::{
    self, breusch_pagan, fit_ols, shapiro_wilk, variance_inflation, BreuschPagan, OlsFit,
    ShapiroWilk, StatsError,
};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Predictors available to the models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Predictor {
    Aq,
    Age,
    Gender,
}

impl Predictor {
    /// Column name used for coefficients
    pub fn name(self) -> &'static str {
        match self {
            Predictor::Aq => "aq_c",
            Predictor::Age => "age_c",
            Predictor::Gender => "gender",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Predictor::Aq => "AQ-10 (centered)",
            Predictor::Age => "Age (centered)",
            Predictor::Gender => "Gender (female)",
        }
    }
}

/// A model term: a main effect or a two-way product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Term {
    Main(Predictor),
    Interaction(Predictor, Predictor),
}

impl Term {
    pub fn name(self) -> String {
        match self {
            Term::Main(p) => p.name().to_string(),
            Term::Interaction(a, b) => format!("{}:{}", a.name(), b.name()),
        }
    }

    pub fn label(self) -> String {
        let short = |p: Predictor| match p {
            Predictor::Aq => "AQ-10",
            Predictor::Age => "Age",
            Predictor::Gender => "Gender",
        };
        match self {
            Term::Main(p) => p.label().to_string(),
            Term::Interaction(a, b) => format!("{} \u{d7} {}", short(a), short(b)),
        }
    }

    fn involves(self, a: Predictor, b: Predictor) -> bool {
        matches!(self, Term::Interaction(x, y) if (x == a && y == b) || (x == b && y == a))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelKind {
    /// AQ x age moderation plus gender
    Primary,
    /// Primary terms plus an AQ x gender interaction
    Exploratory,
}

/// Outcome and right-hand side of one regression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    pub kind: ModelKind,
    pub outcome: Hand,
    pub terms: Vec<Term>,
}

impl ModelSpec {
    /// `FTT ~ AQc * Agec + Gender`
    pub fn primary(outcome: Hand) -> Self {
        Self {
            kind: ModelKind::Primary,
            outcome,
            terms: vec![
                Term::Main(Predictor::Aq),
                Term::Main(Predictor::Age),
                Term::Main(Predictor::Gender),
                Term::Interaction(Predictor::Aq, Predictor::Age),
            ],
        }
    }

    /// `FTT ~ AQc * Agec + AQc * Gender`
    pub fn exploratory(outcome: Hand) -> Self {
        let mut spec = Self::primary(outcome);
        spec.kind = ModelKind::Exploratory;
        spec.terms
            .push(Term::Interaction(Predictor::Aq, Predictor::Gender));
        spec
    }

    pub fn name(&self) -> String {
        let outcome = match self.outcome {
            Hand::Dominant => "ftt_dominant",
            Hand::NonDominant => "ftt_nondominant",
        };
        let rhs: Vec<String> = self.terms.iter().map(|t| t.name()).collect();
        format!("{} ~ {}", outcome, rhs.join(" + "))
    }

    pub fn interaction(&self, a: Predictor, b: Predictor) -> Option<Term> {
        self.terms.iter().copied().find(|t| t.involves(a, b))
    }
}

/// Sample means and spreads used for centering and moderator levels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Centering {
    pub aq_mean: f64,
    pub aq_sd: f64,
    pub aq_min: f64,
    pub aq_max: f64,
    pub age_mean: f64,
    pub age_sd: f64,
    pub age_min: f64,
    pub age_max: f64,
}

impl Centering {
    pub fn from_participants(participants: &[Participant]) -> Self {
        let aq: Vec<f64> = participants.iter().map(|p| f64::from(p.aq_score)).collect();
        let age: Vec<f64> = participants.iter().map(|p| f64::from(p.age)).collect();
        Self {
            aq_mean: stats::mean(&aq),
            aq_sd: stats::sample_sd(&aq),
            aq_min: aq.iter().copied().fold(f64::INFINITY, f64::min),
            aq_max: aq.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            age_mean: stats::mean(&age),
            age_sd: stats::sample_sd(&age),
            age_min: age.iter().copied().fold(f64::INFINITY, f64::min),
            age_max: age.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Predictor value entering the design (centered where applicable)
    pub fn design_value(&self, predictor: Predictor, p: &Participant) -> f64 {
        match predictor {
            Predictor::Aq => f64::from(p.aq_score) - self.aq_mean,
            Predictor::Age => f64::from(p.age) - self.age_mean,
            Predictor::Gender => f64::from(p.gender.dummy()),
        }
    }

    /// Convert a design-scale moderator value back to raw units
    pub fn to_raw(&self, predictor: Predictor, value: f64) -> f64 {
        match predictor {
            Predictor::Aq => value + self.aq_mean,
            Predictor::Age => value + self.age_mean,
            Predictor::Gender => value,
        }
    }
}

/// Design columns in term order (no intercept column)
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    pub term_names: Vec<String>,
    pub columns: Vec<Vec<f64>>,
    pub outcome: Vec<f64>,
}

impl Design {
    pub fn build(spec: &ModelSpec, centering: &Centering, participants: &[Participant]) -> Self {
        let value = |term: Term, p: &Participant| match term {
            Term::Main(a) => centering.design_value(a, p),
            Term::Interaction(a, b) => centering.design_value(a, p) * centering.design_value(b, p),
        };
        Self {
            term_names: spec.terms.iter().map(|t| t.name()).collect(),
            columns: spec
                .terms
                .iter()
                .map(|&t| participants.iter().map(|p| value(t, p)).collect())
                .collect(),
            outcome: participants.iter().map(|p| p.score(spec.outcome)).collect(),
        }
    }
}

/// A fitted model together with what produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedModel {
    pub spec: ModelSpec,
    pub name: String,
    pub fit: OlsFit,
    pub centering: Centering,
    /// Sample SD of the outcome, for standardised slopes
    pub outcome_sd: f64,
    #[serde(skip)]
    pub design: Design,
}

impl FittedModel {
    pub fn estimate(&self, term: Term) -> Result<f64, StatsError> {
        self.fit
            .coefficient(&term.name())
            .map(|c| c.estimate)
            .ok_or_else(|| self.missing(term))
    }

    pub fn covariance(&self, a: Term, b: Term) -> Result<f64, StatsError> {
        self.fit
            .covariance_of(&a.name(), &b.name())
            .ok_or_else(|| self.missing(if self.fit.index_of(&a.name()).is_none() { a } else { b }))
    }

    pub(crate) fn missing(&self, term: Term) -> StatsError {
        StatsError::MissingTerm {
            model: self.name.clone(),
            term: term.name(),
        }
    }
}

/// Fit one model specification
pub fn fit_model(
    spec: &ModelSpec,
    participants: &[Participant],
    confidence: f64,
) -> Result<FittedModel, StatsError> {
    let centering = Centering::from_participants(participants);
    let design = Design::build(spec, &centering, participants);
    let name = spec.name();
    let fit = fit_ols(
        &name,
        &design.term_names,
        &design.columns,
        &design.outcome,
        confidence,
    )?;
    info!(
        model = %name,
        n = fit.n,
        r_squared = fit.r_squared,
        "fitted linear model"
    );
    Ok(FittedModel {
        spec: spec.clone(),
        name,
        outcome_sd: stats::sample_sd(&design.outcome),
        fit,
        centering,
        design,
    })
}

/// Assumption checks for a fitted model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub residual_normality: ShapiroWilk,
    pub breusch_pagan: BreuschPagan,
    pub vif: Vec<(String, f64)>,
    /// Narrative notes for violated assumptions
    pub notes: Vec<String>,
}

/// VIF above which a collinearity note is written
const VIF_NOTE_THRESHOLD: f64 = 5.0;

/// Residual normality, heteroscedasticity and collinearity checks
///
/// Violations only produce notes; the model is never changed.
pub fn diagnose(model: &FittedModel, alpha: f64) -> Result<Diagnostics, StatsError> {
    let residual_normality = shapiro_wilk(&model.fit.residuals)?;
    let bp = breusch_pagan(
        &model.design.term_names,
        &model.design.columns,
        &model.fit.residuals,
    )?;
    let vif = variance_inflation(&model.design.term_names, &model.design.columns)?;

    let mut notes = Vec::new();
    if residual_normality.rejects_normality(alpha) {
        notes.push(format!(
            "Residuals deviate from normality (Shapiro-Wilk W = {:.3}, p = {:.3}); \
             coefficient tests rely on the sample size for validity.",
            residual_normality.w, residual_normality.pvalue
        ));
    }
    if bp.pvalue < alpha {
        notes.push(format!(
            "Residual variance is not constant (Breusch-Pagan BP = {:.2}, df = {}, p = {:.3}); \
             standard errors may be biased.",
            bp.statistic, bp.df, bp.pvalue
        ));
    }
    for (term, v) in &vif {
        if *v > VIF_NOTE_THRESHOLD {
            notes.push(format!(
                "Term {} has a variance inflation factor of {:.2}.",
                term, v
            ));
        }
    }
    for note in &notes {
        warn!(model = %model.name, "{}", note);
    }

    Ok(Diagnostics {
        residual_normality,
        breusch_pagan: bp,
        vif,
        notes,
    })
}
