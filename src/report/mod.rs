//! Report assembly and rendering
//!
//! A [`Report`] holds every result object of one run. It can only be
//! obtained from a [`ReportBuilder`], which refuses to build while any
//! section is missing. Renderers turn the report into Markdown, standalone
//! HTML or JSON; they take every number from the result objects and fail
//! with [`RenderError::MissingValue`] instead of printing a blank.

mod figures;
mod html;
mod json;
mod markdown;
mod narrative;

pub use figures::{
    johnson_neyman_figure, raincloud_figure, simple_slopes_figure, Figure, FigureKind,
};
pub use html::render_html;
pub use json::render_json;
pub use markdown::render_markdown;
pub use narrative::{check_claims, ConsistencyWarning};

use crate::config::AnalysisConfig;
use crate::correlation::CorrelationMatrix;
use crate::dataset::{Hand, LoadSummary};
use crate::descriptives::DescriptiveTable;
use crate::hand_comparison::{HandComparison, PairedTest};
use crate::moderation::{HandModels, JnRegion, JohnsonNeyman};
use crate::stats::{Coefficient, OlsFit, StatsError};
use serde::Serialize;
use thiserror::Error;

/// Rendering failures
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Report section '{0}' is missing")]
    MissingSection(&'static str),

    #[error("{object} has no value for '{field}'")]
    MissingValue { object: String, field: String },

    #[error("Figure summary could not be computed: {0}")]
    Summary(#[from] StatsError),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    pub(crate) fn missing(object: impl Into<String>, field: impl Into<String>) -> Self {
        RenderError::MissingValue {
            object: object.into(),
            field: field.into(),
        }
    }
}

/// Where the data came from and how it was analysed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub source: String,
    pub sha256: String,
    pub rows_read: usize,
    pub excluded_ids: Vec<String>,
    pub participants_analysed: usize,
    pub min_dominant_taps: f64,
    pub significance_level: f64,
    pub confidence_level: f64,
    pub jitter_seed: u64,
    pub generator: String,
}

impl Provenance {
    pub fn new(summary: &LoadSummary, participants_analysed: usize, config: &AnalysisConfig) -> Self {
        Self {
            source: summary.source.clone(),
            sha256: summary.sha256.clone(),
            rows_read: summary.rows_read,
            excluded_ids: summary.excluded_ids.clone(),
            participants_analysed,
            min_dominant_taps: summary.min_dominant_taps,
            significance_level: config.significance_level,
            confidence_level: config.confidence_level,
            jitter_seed: config.jitter_seed,
            generator: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

/// All results of one analysis run, in section order
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub title: String,
    pub provenance: Provenance,
    pub descriptives: DescriptiveTable,
    pub hand_comparison: HandComparison,
    pub correlations: CorrelationMatrix,
    pub dominant: HandModels,
    pub non_dominant: HandModels,
    pub figures: Vec<Figure>,
    pub warnings: Vec<ConsistencyWarning>,
}

impl Report {
    pub fn models(&self) -> [&HandModels; 2] {
        [&self.dominant, &self.non_dominant]
    }

    pub fn figure(&self, kind: FigureKind) -> Option<&Figure> {
        self.figures.iter().find(|f| f.kind == kind)
    }

    /// Figures in the order they appear in the document
    pub fn figures_for_section(&self, hand: Option<Hand>) -> impl Iterator<Item = &Figure> {
        self.figures.iter().filter(move |f| f.kind.hand() == hand)
    }
}

pub const DEFAULT_TITLE: &str = "Autistic Traits, Age and Finger-Tapping Performance";

/// Collects report sections; `build` fails on the first missing one
#[derive(Debug, Default)]
pub struct ReportBuilder {
    title: Option<String>,
    provenance: Option<Provenance>,
    descriptives: Option<DescriptiveTable>,
    hand_comparison: Option<HandComparison>,
    correlations: Option<CorrelationMatrix>,
    dominant: Option<HandModels>,
    non_dominant: Option<HandModels>,
    figures: Vec<Figure>,
    warnings: Vec<ConsistencyWarning>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn descriptives(mut self, table: DescriptiveTable) -> Self {
        self.descriptives = Some(table);
        self
    }

    pub fn hand_comparison(mut self, comparison: HandComparison) -> Self {
        self.hand_comparison = Some(comparison);
        self
    }

    pub fn correlations(mut self, matrix: CorrelationMatrix) -> Self {
        self.correlations = Some(matrix);
        self
    }

    /// Regression results; the hand inside decides the slot
    pub fn models(mut self, models: HandModels) -> Self {
        match models.hand {
            Hand::Dominant => self.dominant = Some(models),
            Hand::NonDominant => self.non_dominant = Some(models),
        }
        self
    }

    pub fn figure(mut self, figure: Figure) -> Self {
        self.figures.push(figure);
        self
    }

    pub fn warnings(mut self, warnings: Vec<ConsistencyWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn build(self) -> Result<Report, RenderError> {
        Ok(Report {
            title: self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            provenance: self
                .provenance
                .ok_or(RenderError::MissingSection("provenance"))?,
            descriptives: self
                .descriptives
                .ok_or(RenderError::MissingSection("descriptives"))?,
            hand_comparison: self
                .hand_comparison
                .ok_or(RenderError::MissingSection("hand comparison"))?,
            correlations: self
                .correlations
                .ok_or(RenderError::MissingSection("correlations"))?,
            dominant: self
                .dominant
                .ok_or(RenderError::MissingSection("regression (dominant hand)"))?,
            non_dominant: self
                .non_dominant
                .ok_or(RenderError::MissingSection("regression (non-dominant hand)"))?,
            figures: self.figures,
            warnings: self.warnings,
        })
    }
}

// Number formatting shared by the text renderers

/// Two decimals
pub fn fmt2(value: f64) -> String {
    format!("{:.2}", value)
}

/// Two decimals, or `NA` when undefined
pub fn fmt_opt(value: Option<f64>) -> String {
    value.map(fmt2).unwrap_or_else(|| "NA".to_string())
}

/// Drop the leading zero of a value bounded by one (`0.23` -> `.23`)
fn strip_leading_zero(text: String) -> String {
    if let Some(rest) = text.strip_prefix("0.") {
        format!(".{}", rest)
    } else if let Some(rest) = text.strip_prefix("-0.") {
        format!("-.{}", rest)
    } else {
        text
    }
}

/// p-value with three decimals and no leading zero; `< .001` below that
///
/// # Examples
/// ```
/// use aqtap::report::format_p;
///
/// assert_eq!(format_p(0.0342), ".034");
/// assert_eq!(format_p(0.0004), "< .001");
/// ```
pub fn format_p(p: f64) -> String {
    if p < 0.001 {
        "< .001".to_string()
    } else {
        strip_leading_zero(format!("{:.3}", p))
    }
}

/// `p = .034` or `p < .001`
pub fn p_clause(p: f64) -> String {
    let formatted = format_p(p);
    if formatted.starts_with('<') {
        format!("p {}", formatted)
    } else {
        format!("p = {}", formatted)
    }
}

/// R² style statistic, two decimals without the leading zero
pub fn format_unit(value: f64) -> String {
    strip_leading_zero(format!("{:.2}", value))
}

/// Proportion as a whole percentage (`0.2249` -> `22%`)
pub fn format_percent(proportion: f64) -> String {
    format!("{:.0}%", proportion * 100.0)
}

/// Percentage with one decimal (`40.0%`)
pub fn format_percent1(percent: f64) -> String {
    format!("{:.1}%", percent)
}

pub(crate) fn coefficient<'a>(fit: &'a OlsFit, term: &str) -> Result<&'a Coefficient, RenderError> {
    fit.coefficient(term)
        .ok_or_else(|| RenderError::missing(&fit.model, term))
}

// Narrative sentences shared by the Markdown and HTML renderers

pub(crate) fn gender_split_sentence(table: &DescriptiveTable) -> String {
    let parts: Vec<String> = table
        .gender_split
        .iter()
        .map(|g| {
            format!(
                "{} {} ({})",
                g.n,
                g.gender.label().to_lowercase(),
                format_percent1(g.percent)
            )
        })
        .collect();
    format!(
        "The analysed sample comprised {} participants: {}.",
        table.n_total,
        parts.join(" and ")
    )
}

pub(crate) fn comparison_sentences(comparison: &HandComparison) -> Vec<String> {
    let normality = &comparison.normality;
    let verdict = if normality.rejects_normality(comparison.alpha) {
        "deviated from normality"
    } else {
        "did not deviate from normality"
    };
    let first = format!(
        "Within-participant differences (dominant minus non-dominant, n = {} pairs) {} \
         (Shapiro-Wilk W = {}, {}), so a {} was used.",
        comparison.n_pairs,
        verdict,
        fmt2(normality.w),
        p_clause(normality.pvalue),
        comparison.test.name()
    );

    let direction = if !comparison.is_significant() {
        "did not differ significantly from"
    } else if comparison.test.favors_dominant() {
        "were significantly higher than"
    } else {
        "were significantly lower than"
    };
    let d = &comparison.dominant;
    let nd = &comparison.non_dominant;
    let second = match &comparison.test {
        PairedTest::Wilcoxon(w) => format!(
            "Dominant-hand scores (Mdn = {}) {} non-dominant-hand scores (Mdn = {}), \
             V = {}, {}, r = {} ({}).",
            fmt2(d.median),
            direction,
            fmt2(nd.median),
            fmt2(w.v),
            p_clause(w.pvalue),
            fmt2(w.effect_size_r),
            match w.method {
                crate::stats::WilcoxonMethod::Exact => "exact",
                crate::stats::WilcoxonMethod::NormalApproximation => "normal approximation",
            }
        ),
        PairedTest::TTest(t) => format!(
            "Dominant-hand scores (M = {}, SD = {}) {} non-dominant-hand scores \
             (M = {}, SD = {}), t({}) = {}, {}, mean difference = {}, {:.0}% CI [{}, {}], d_z = {}.",
            fmt2(d.mean),
            fmt2(d.sd),
            direction,
            fmt2(nd.mean),
            fmt2(nd.sd),
            t.df,
            fmt2(t.t),
            p_clause(t.pvalue),
            fmt2(t.mean_difference),
            t.confidence_level * 100.0,
            fmt2(t.ci_lower),
            fmt2(t.ci_upper),
            fmt2(t.cohens_dz)
        ),
    };
    vec![first, second]
}

pub(crate) fn model_fit_sentence(fit: &OlsFit, outcome: &str) -> Result<String, RenderError> {
    let f = fit
        .f_statistic
        .ok_or_else(|| RenderError::missing(&fit.model, "F statistic"))?;
    let f_p = fit
        .f_pvalue
        .ok_or_else(|| RenderError::missing(&fit.model, "F p-value"))?;
    let df1 = fit.coefficients.len().saturating_sub(1);
    Ok(format!(
        "The model explained {} of the variance in {} (R\u{b2} = {}, adjusted R\u{b2} = {}, \
         F({}, {}) = {}, {}).",
        format_percent(fit.r_squared),
        outcome,
        format_unit(fit.r_squared),
        format_unit(fit.adj_r_squared),
        df1,
        fit.df_residual,
        fmt2(f),
        p_clause(f_p)
    ))
}

pub(crate) fn interaction_sentence(
    fit: &OlsFit,
    term: &str,
    label: &str,
    alpha: f64,
) -> Result<String, RenderError> {
    let c = coefficient(fit, term)?;
    let verdict = if c.pvalue < alpha { "was" } else { "was not" };
    Ok(format!(
        "The {} interaction {} significant (b = {}, SE = {}, t({}) = {}, {}).",
        label,
        verdict,
        fmt2(c.estimate),
        fmt2(c.std_error),
        fit.df_residual,
        fmt2(c.t),
        p_clause(c.pvalue)
    ))
}

pub(crate) fn johnson_neyman_sentence(jn: &JohnsonNeyman) -> String {
    let region = match jn.region {
        JnRegion::Everywhere => "at every age".to_string(),
        JnRegion::Nowhere => return format!(
            "Johnson-Neyman analysis: the AQ-10 slope was not significant at any age \
             (\u{3b1} = {}, critical t = {}).",
            format_unit(jn.alpha),
            fmt2(jn.t_critical)
        ),
        JnRegion::Inside { lower, upper } => {
            format!("for ages between {} and {}", fmt2(lower), fmt2(upper))
        }
        JnRegion::Outside { lower, upper } => {
            format!("for ages below {} and above {}", fmt2(lower), fmt2(upper))
        }
        JnRegion::Above { bound } => format!("for ages above {}", fmt2(bound)),
        JnRegion::Below { bound } => format!("for ages below {}", fmt2(bound)),
    };
    let mut sentence = format!(
        "Johnson-Neyman analysis: the AQ-10 slope was significant {} \
         (\u{3b1} = {}, critical t = {}; observed ages {}-{}).",
        region,
        format_unit(jn.alpha),
        fmt2(jn.t_critical),
        jn.observed_min,
        jn.observed_max
    );
    let outside: Vec<String> = jn
        .bounds
        .iter()
        .filter(|b| !b.within_observed)
        .map(|b| fmt2(b.value))
        .collect();
    if !outside.is_empty() {
        sentence.push_str(&format!(
            " Boundary {} lies outside the observed age range.",
            outside.join(" and ")
        ));
    }
    sentence
}

pub(crate) fn outcome_label(hand: Hand) -> &'static str {
    match hand {
        Hand::Dominant => "dominant-hand FTT",
        Hand::NonDominant => "non-dominant-hand FTT",
    }
}

/// Display label for a coefficient name
pub(crate) fn term_label(name: &str) -> String {
    use crate::moderation::{Predictor, Term};
    let predictors = [Predictor::Aq, Predictor::Age, Predictor::Gender];
    for a in predictors {
        if name == a.name() {
            return Term::Main(a).label();
        }
        for b in predictors {
            if name == format!("{}:{}", a.name(), b.name()) {
                return Term::Interaction(a, b).label();
            }
        }
    }
    name.to_string()
}
