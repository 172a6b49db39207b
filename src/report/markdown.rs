//! Markdown rendering
//!
//! Figures are linked as `<stem>_<figure-id>.svg`; the caller writes the
//! SVG files. Without a stem (document on stdout) only the captions are
//! listed.

use super::{
    coefficient, comparison_sentences, fmt2, fmt_opt, format_p, gender_split_sentence,
    interaction_sentence, johnson_neyman_sentence, model_fit_sentence, outcome_label, term_label,
    Figure, RenderError, Report,
};
use crate::correlation::significance_stars;
use crate::hand_comparison::HandSummary;
use crate::moderation::{Diagnostics, FittedModel, HandModels, Predictor, SimpleSlope};
use crate::stats::OlsFit;

fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", headers.join(" | ")));
    let rule: Vec<&str> = headers.iter().map(|_| "---").collect();
    out.push_str(&format!("| {} |\n", rule.join(" | ")));
    for row in rows {
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    out.push('\n');
    out
}

fn figure(out: &mut String, figure: &Figure, number: usize, stem: Option<&str>) {
    match stem {
        Some(stem) => out.push_str(&format!(
            "![Figure {}]({})\n\n*Figure {}.* {}\n\n",
            number,
            figure.file_name(stem),
            number,
            figure.caption
        )),
        None => out.push_str(&format!("*Figure {}.* {}\n\n", number, figure.caption)),
    }
}

/// Render the report as Markdown
pub fn render_markdown(report: &Report, figure_stem: Option<&str>) -> Result<String, RenderError> {
    let mut out = String::new();
    let mut figure_number = 0;

    out.push_str(&format!("# {}\n\n", report.title));

    // Provenance
    let p = &report.provenance;
    out.push_str("## Data and provenance\n\n");
    out.push_str(&format!("- Input: `{}`\n", p.source));
    out.push_str(&format!("- SHA-256: `{}`\n", p.sha256));
    out.push_str(&format!("- Rows read: {}\n", p.rows_read));
    if p.excluded_ids.is_empty() {
        out.push_str(&format!(
            "- Excluded (dominant-hand score <= {}): none\n",
            p.min_dominant_taps
        ));
    } else {
        out.push_str(&format!(
            "- Excluded (dominant-hand score <= {}): {} ({})\n",
            p.min_dominant_taps,
            p.excluded_ids.len(),
            p.excluded_ids.join(", ")
        ));
    }
    out.push_str(&format!("- Participants analysed: {}\n", p.participants_analysed));
    out.push_str(&format!(
        "- Significance level: {}; confidence level: {}; figure seed: {}\n",
        p.significance_level, p.confidence_level, p.jitter_seed
    ));
    out.push_str(&format!("- Generated by: {}\n\n", p.generator));

    // Descriptives
    let d = &report.descriptives;
    out.push_str("## Descriptive statistics\n\n");
    out.push_str(&gender_split_sentence(d));
    out.push_str("\n\n");
    let mut rows = Vec::new();
    for row in &d.rows {
        for (stratum, cell) in d.strata.iter().zip(&row.cells) {
            rows.push(vec![
                row.label.to_string(),
                stratum.to_string(),
                cell.n.to_string(),
                fmt_opt(cell.mean),
                fmt_opt(cell.sd),
                fmt_opt(cell.min),
                fmt_opt(cell.max),
            ]);
        }
    }
    out.push_str(&table(
        &["Variable", "Group", "n", "Mean", "SD", "Min", "Max"],
        &rows,
    ));

    // Hand comparison
    let c = &report.hand_comparison;
    out.push_str("## Preliminary analysis: dominant versus non-dominant hand\n\n");
    for sentence in comparison_sentences(c) {
        out.push_str(&sentence);
        out.push(' ');
    }
    out.push_str("\n\n");
    let hand_row = |s: &HandSummary| {
        vec![
            s.hand.label().to_string(),
            s.n.to_string(),
            fmt2(s.mean),
            fmt2(s.sd),
            fmt2(s.median),
        ]
    };
    out.push_str(&table(
        &["Hand", "n", "Mean", "SD", "Median"],
        &[hand_row(&c.dominant), hand_row(&c.non_dominant)],
    ));
    for f in report.figures_for_section(None) {
        figure_number += 1;
        figure(&mut out, f, figure_number, figure_stem);
    }

    // Correlations
    let m = &report.correlations;
    out.push_str("## Correlations\n\n");
    let mut headers: Vec<String> = vec!["Variable".to_string()];
    headers.extend((1..m.variables.len()).map(|i| i.to_string()));
    let mut rows = Vec::new();
    for (i, v) in m.variables.iter().enumerate() {
        let mut row = vec![format!("{}. {}", i + 1, v.label())];
        for j in 0..m.variables.len().saturating_sub(1) {
            row.push(match m.rows[i].get(j) {
                Some(r) => format!("{}{}", fmt2(r.coefficient), significance_stars(r.pvalue)),
                None if j == i => "-".to_string(),
                None => String::new(),
            });
        }
        rows.push(row);
    }
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    out.push_str(&table(&header_refs, &rows));
    out.push_str(
        "Spearman's rho; gender coded 0 = male, 1 = female. \
         \\* p < .05, \\*\\* p < .01, \\*\\*\\* p < .001.\n\n",
    );

    // Primary regression
    let alpha = p.significance_level;
    out.push_str("## Regression: AQ-10 \u{d7} age moderation\n\n");
    for models in report.models() {
        primary_section(&mut out, models, alpha)?;
        for f in report.figures_for_section(Some(models.hand)) {
            figure_number += 1;
            figure(&mut out, f, figure_number, figure_stem);
        }
    }

    // Exploratory regression
    out.push_str("## Exploratory regression: AQ-10 \u{d7} gender\n\n");
    for models in report.models() {
        exploratory_section(&mut out, models, alpha)?;
    }

    // Consistency
    out.push_str("## Consistency checks\n\n");
    if report.warnings.is_empty() {
        out.push_str("All narrative values above are taken from the fitted models; ");
        out.push_str("no stated value disagrees with them.\n");
    } else {
        for w in &report.warnings {
            out.push_str(&format!("- **Warning:** {}\n", w.message));
        }
    }

    Ok(out)
}

fn coefficient_table(fit: &OlsFit) -> String {
    let level = format!("{:.0}% CI", fit.confidence_level * 100.0);
    let rows: Vec<Vec<String>> = fit
        .coefficients
        .iter()
        .map(|c| {
            vec![
                term_label(&c.term),
                fmt2(c.estimate),
                fmt2(c.std_error),
                fmt_opt(c.std_beta),
                format!("[{}, {}]", fmt2(c.ci_lower), fmt2(c.ci_upper)),
                fmt2(c.t),
                format_p(c.pvalue),
            ]
        })
        .collect();
    table(&["Term", "b", "SE", "\u{3b2}", level.as_str(), "t", "p"], &rows)
}

fn slopes_table(slopes: &[SimpleSlope], moderator: &str) -> String {
    let rows: Vec<Vec<String>> = slopes
        .iter()
        .map(|s| {
            vec![
                s.level.clone(),
                fmt2(s.moderator_value),
                fmt2(s.slope),
                fmt2(s.std_error),
                format!("[{}, {}]", fmt2(s.ci_lower), fmt2(s.ci_upper)),
                fmt2(s.t),
                format_p(s.pvalue),
                fmt2(s.std_slope),
            ]
        })
        .collect();
    table(
        &["Level", moderator, "Slope", "SE", "CI", "t", "p", "\u{3b2}"],
        &rows,
    )
}

fn diagnostics_text(out: &mut String, diagnostics: &Diagnostics) {
    let vif: Vec<String> = diagnostics
        .vif
        .iter()
        .map(|(term, v)| format!("{} {}", term_label(term), fmt2(*v)))
        .collect();
    out.push_str(&format!(
        "Assumption checks: residual Shapiro-Wilk W = {}, p = {}; Breusch-Pagan = {}, p = {}; VIF: {}.\n\n",
        fmt2(diagnostics.residual_normality.w),
        format_p(diagnostics.residual_normality.pvalue),
        fmt2(diagnostics.breusch_pagan.statistic),
        format_p(diagnostics.breusch_pagan.pvalue),
        vif.join(", ")
    ));
    for note in &diagnostics.notes {
        out.push_str(&format!("> Note: {}\n", note));
    }
    if !diagnostics.notes.is_empty() {
        out.push('\n');
    }
}

fn model_heading(out: &mut String, model: &FittedModel, heading: &str) {
    out.push_str(&format!("### {}\n\n", heading));
    out.push_str(&format!("`{}` (n = {})\n\n", model.name, model.fit.n));
}

fn primary_section(out: &mut String, models: &HandModels, alpha: f64) -> Result<(), RenderError> {
    let model = &models.primary;
    let outcome = outcome_label(models.hand);
    model_heading(out, model, &format!("{} hand", models.hand.label()));
    out.push_str(&model_fit_sentence(&model.fit, outcome)?);
    out.push(' ');
    let aq = coefficient(&model.fit, Predictor::Aq.name())?;
    out.push_str(&format!(
        "At mean age, each AQ-10 point was associated with a change of {} taps ({}).",
        fmt2(aq.estimate),
        super::p_clause(aq.pvalue)
    ));
    out.push(' ');
    out.push_str(&interaction_sentence(
        &model.fit,
        &format!("{}:{}", Predictor::Aq.name(), Predictor::Age.name()),
        "AQ-10 \u{d7} age",
        alpha,
    )?);
    out.push_str("\n\n");
    out.push_str(&coefficient_table(&model.fit));
    out.push_str("Simple slopes of AQ-10 at three ages:\n\n");
    out.push_str(&slopes_table(&models.age_slopes, "Age"));
    out.push_str(&johnson_neyman_sentence(&models.johnson_neyman));
    out.push_str("\n\n");
    diagnostics_text(out, &models.diagnostics);
    Ok(())
}

fn exploratory_section(
    out: &mut String,
    models: &HandModels,
    alpha: f64,
) -> Result<(), RenderError> {
    let model = &models.exploratory;
    model_heading(out, model, &format!("{} hand", models.hand.label()));
    out.push_str(&model_fit_sentence(&model.fit, outcome_label(models.hand))?);
    out.push(' ');
    out.push_str(&interaction_sentence(
        &model.fit,
        &format!("{}:{}", Predictor::Aq.name(), Predictor::Gender.name()),
        "AQ-10 \u{d7} gender",
        alpha,
    )?);
    out.push_str("\n\n");
    out.push_str(&coefficient_table(&model.fit));
    out.push_str("Simple slopes of AQ-10 by gender:\n\n");
    out.push_str(&slopes_table(&models.gender_slopes, "Gender code"));
    diagnostics_text(out, &models.exploratory_diagnostics);
    Ok(())
}
