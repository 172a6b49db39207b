//! End-to-end analysis: load -> describe -> compare hands -> correlate ->
//! model -> report
//!
//! Each stage consumes the previous stage's output and any failure stops
//! the run; no stage substitutes a default for a failed precondition.

use crate::config::{AnalysisConfig, ConfigError};
use crate::correlation::{spearman_matrix, CorrelationVariable};
use crate::dataset::{self, Dataset, Hand, LoadError};
use crate::descriptives::{describe, Variable};
use crate::hand_comparison::compare_hands;
use crate::moderation::analyze_hand;
use crate::report::{
    check_claims, johnson_neyman_figure, raincloud_figure, simple_slopes_figure, Provenance,
    RenderError, Report, ReportBuilder,
};
use crate::stats::StatsError;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Any failure of an analysis run
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Load(#[from] LoadError),

    #[error("Statistical precondition failed: {0}")]
    Stats(#[from] StatsError),

    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),
}

/// Load `path` and run the whole analysis
pub fn run_file<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> Result<Report, AnalysisError> {
    config.validate()?;
    let data = dataset::load_file(path, config)?;
    run(&data, config)
}

/// Run every stage on an already loaded dataset
pub fn run(data: &Dataset, config: &AnalysisConfig) -> Result<Report, AnalysisError> {
    config.validate()?;
    let participants = &data.participants;
    info!(
        participants = participants.len(),
        excluded = data.summary.rows_excluded(),
        "starting analysis"
    );

    let descriptives = describe(participants, &Variable::DEFAULT);
    info!(rows = descriptives.rows.len(), "descriptives complete");

    let comparison = compare_hands(
        &data.to_long(),
        config.significance_level,
        config.confidence_level,
    )?;

    let correlations = spearman_matrix(participants, &CorrelationVariable::ALL)?;
    info!(
        variables = correlations.variables.len(),
        "correlation matrix complete"
    );

    let dominant = analyze_hand(participants, Hand::Dominant, config)?;
    let non_dominant = analyze_hand(participants, Hand::NonDominant, config)?;

    let warnings = check_claims(&config.narrative, &[&dominant, &non_dominant]);

    let mut builder = ReportBuilder::new()
        .provenance(Provenance::new(&data.summary, participants.len(), config))
        .descriptives(descriptives)
        .hand_comparison(comparison)
        .correlations(correlations)
        .figure(raincloud_figure(participants, config.jitter_seed)?);
    for models in [&dominant, &non_dominant] {
        builder = builder
            .figure(simple_slopes_figure(models)?)
            .figure(johnson_neyman_figure(models)?);
    }
    let report = builder
        .models(dominant)
        .models(non_dominant)
        .warnings(warnings)
        .build()?;

    info!(
        figures = report.figures.len(),
        warnings = report.warnings.len(),
        "analysis complete"
    );
    Ok(report)
}
