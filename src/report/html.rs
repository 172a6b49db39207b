//! Standalone HTML rendering
//!
//! One self-contained file: embedded CSS and inline SVG figures.

use super::{
    coefficient, comparison_sentences, fmt2, fmt_opt, format_p, gender_split_sentence,
    interaction_sentence, johnson_neyman_sentence, model_fit_sentence, outcome_label, p_clause,
    term_label, Figure, RenderError, Report,
};
use crate::correlation::significance_stars;
use crate::moderation::{Diagnostics, FittedModel, Predictor, SimpleSlope};
use crate::stats::OlsFit;

/// Escape HTML special characters
pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Generate embedded CSS styles
fn generate_styles() -> &'static str {
    r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px auto;
            max-width: 980px;
            background-color: #f5f5f5;
            color: #222;
            line-height: 1.5;
        }
        h1, h2, h3 {
            color: #333;
        }
        table {
            border-collapse: collapse;
            width: 100%;
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }
        th, td {
            border: 1px solid #ddd;
            padding: 6px 8px;
            text-align: right;
        }
        th:first-child, td:first-child {
            text-align: left;
        }
        th {
            background-color: #4a90d9;
            color: white;
            font-weight: bold;
        }
        tr:nth-child(even) {
            background-color: #f9f9f9;
        }
        .provenance td {
            font-family: monospace;
            text-align: left;
        }
        .model {
            font-family: monospace;
            color: #555;
        }
        .note {
            border-left: 4px solid #f0ad4e;
            background-color: #fcf8e3;
            padding: 6px 10px;
        }
        .warning {
            border-left: 4px solid #d9534f;
            background-color: #f2dede;
            padding: 6px 10px;
        }
        figure {
            background-color: white;
            margin: 0 0 20px 0;
            padding: 10px;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
        }
        figcaption {
            font-size: 0.9em;
            color: #555;
        }
        .footer {
            margin-top: 20px;
            font-size: 0.8em;
            color: #888;
            text-align: center;
        }
        "#
}

fn table(class: Option<&str>, headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut html = String::new();
    match class {
        Some(c) => html.push_str(&format!("    <table class=\"{}\">\n", c)),
        None => html.push_str("    <table>\n"),
    }
    let header_cells: Vec<String> = headers
        .iter()
        .map(|h| format!("<th>{}</th>", escape_html(h)))
        .collect();
    html.push_str(&format!("        <tr>{}</tr>\n", header_cells.join("")));
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .map(|c| format!("<td>{}</td>", escape_html(c)))
            .collect();
        html.push_str(&format!("        <tr>{}</tr>\n", cells.join("")));
    }
    html.push_str("    </table>\n");
    html
}

fn paragraph(text: &str) -> String {
    format!("    <p>{}</p>\n", escape_html(text))
}

fn figure(html: &mut String, figure: &Figure, number: usize) {
    html.push_str(&format!("    <figure id=\"{}\">\n", escape_html(&figure.id)));
    html.push_str(&figure.svg);
    html.push_str(&format!(
        "    <figcaption><strong>Figure {}.</strong> {}</figcaption>\n",
        number,
        escape_html(&figure.caption)
    ));
    html.push_str("    </figure>\n");
}

/// Render the report as a standalone HTML document
pub fn render_html(report: &Report) -> Result<String, RenderError> {
    let mut html = String::new();
    let mut figure_number = 0;

    html.push_str("<!DOCTYPE html>\n");
    html.push_str("<html lang=\"en\">\n");
    html.push_str("<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str(&format!("    <title>{}</title>\n", escape_html(&report.title)));
    html.push_str("    <style>");
    html.push_str(generate_styles());
    html.push_str("</style>\n");
    html.push_str("</head>\n");
    html.push_str("<body>\n");
    html.push_str(&format!("    <h1>{}</h1>\n", escape_html(&report.title)));

    // Provenance
    let p = &report.provenance;
    html.push_str("    <h2>Data and provenance</h2>\n");
    let excluded = if p.excluded_ids.is_empty() {
        "none".to_string()
    } else {
        format!("{} ({})", p.excluded_ids.len(), p.excluded_ids.join(", "))
    };
    let rows = vec![
        vec!["Input".to_string(), p.source.clone()],
        vec!["SHA-256".to_string(), p.sha256.clone()],
        vec!["Rows read".to_string(), p.rows_read.to_string()],
        vec![
            format!("Excluded (dominant-hand score <= {})", p.min_dominant_taps),
            excluded,
        ],
        vec![
            "Participants analysed".to_string(),
            p.participants_analysed.to_string(),
        ],
        vec![
            "Significance / confidence level".to_string(),
            format!("{} / {}", p.significance_level, p.confidence_level),
        ],
        vec!["Figure seed".to_string(), p.jitter_seed.to_string()],
    ];
    html.push_str(&table(Some("provenance"), &["Item", "Value"], &rows));

    // Descriptives
    let d = &report.descriptives;
    html.push_str("    <h2>Descriptive statistics</h2>\n");
    html.push_str(&paragraph(&gender_split_sentence(d)));
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
    html.push_str(&table(
        None,
        &["Variable", "Group", "n", "Mean", "SD", "Min", "Max"],
        &rows,
    ));

    // Hand comparison
    let c = &report.hand_comparison;
    html.push_str("    <h2>Preliminary analysis: dominant versus non-dominant hand</h2>\n");
    html.push_str(&paragraph(&comparison_sentences(c).join(" ")));
    let rows: Vec<Vec<String>> = [&c.dominant, &c.non_dominant]
        .iter()
        .map(|s| {
            vec![
                s.hand.label().to_string(),
                s.n.to_string(),
                fmt2(s.mean),
                fmt2(s.sd),
                fmt2(s.median),
            ]
        })
        .collect();
    html.push_str(&table(None, &["Hand", "n", "Mean", "SD", "Median"], &rows));
    for f in report.figures_for_section(None) {
        figure_number += 1;
        figure(&mut html, f, figure_number);
    }

    // Correlations
    let m = &report.correlations;
    html.push_str("    <h2>Correlations</h2>\n");
    let mut headers: Vec<String> = vec!["Variable".to_string()];
    headers.extend((1..m.variables.len()).map(|i| i.to_string()));
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    let rows: Vec<Vec<String>> = m
        .variables
        .iter()
        .enumerate()
        .map(|(i, v)| {
            std::iter::once(format!("{}. {}", i + 1, v.label()))
                .chain((0..m.variables.len().saturating_sub(1)).map(|j| {
                    match m.rows[i].get(j) {
                        Some(r) => {
                            format!("{}{}", fmt2(r.coefficient), significance_stars(r.pvalue))
                        }
                        None if j == i => "-".to_string(),
                        None => String::new(),
                    }
                }))
                .collect()
        })
        .collect();
    html.push_str(&table(None, &header_refs, &rows));
    html.push_str(&paragraph(
        "Spearman's rho; gender coded 0 = male, 1 = female. \
         * p < .05, ** p < .01, *** p < .001.",
    ));

    // Primary regression
    let alpha = p.significance_level;
    html.push_str("    <h2>Regression: AQ-10 \u{d7} age moderation</h2>\n");
    for models in report.models() {
        let model = &models.primary;
        model_heading(&mut html, model, models.hand.label());
        let aq = coefficient(&model.fit, Predictor::Aq.name())?;
        let text = [
            model_fit_sentence(&model.fit, outcome_label(models.hand))?,
            format!(
                "At mean age, each AQ-10 point was associated with a change of {} taps ({}).",
                fmt2(aq.estimate),
                p_clause(aq.pvalue)
            ),
            interaction_sentence(
                &model.fit,
                &format!("{}:{}", Predictor::Aq.name(), Predictor::Age.name()),
                "AQ-10 \u{d7} age",
                alpha,
            )?,
        ];
        html.push_str(&paragraph(&text.join(" ")));
        html.push_str(&coefficient_table(&model.fit));
        html.push_str("    <h4>Simple slopes of AQ-10 at three ages</h4>\n");
        html.push_str(&slopes_table(&models.age_slopes, "Age"));
        html.push_str(&paragraph(&johnson_neyman_sentence(&models.johnson_neyman)));
        diagnostics(&mut html, &models.diagnostics);
        for f in report.figures_for_section(Some(models.hand)) {
            figure_number += 1;
            figure(&mut html, f, figure_number);
        }
    }

    // Exploratory regression
    html.push_str("    <h2>Exploratory regression: AQ-10 \u{d7} gender</h2>\n");
    for models in report.models() {
        let model = &models.exploratory;
        model_heading(&mut html, model, models.hand.label());
        let text = [
            model_fit_sentence(&model.fit, outcome_label(models.hand))?,
            interaction_sentence(
                &model.fit,
                &format!("{}:{}", Predictor::Aq.name(), Predictor::Gender.name()),
                "AQ-10 \u{d7} gender",
                alpha,
            )?,
        ];
        html.push_str(&paragraph(&text.join(" ")));
        html.push_str(&coefficient_table(&model.fit));
        html.push_str("    <h4>Simple slopes of AQ-10 by gender</h4>\n");
        html.push_str(&slopes_table(&models.gender_slopes, "Gender code"));
        diagnostics(&mut html, &models.exploratory_diagnostics);
    }

    // Consistency
    html.push_str("    <h2>Consistency checks</h2>\n");
    if report.warnings.is_empty() {
        html.push_str(&paragraph(
            "All narrative values above are taken from the fitted models; \
             no stated value disagrees with them.",
        ));
    } else {
        for w in &report.warnings {
            html.push_str(&format!(
                "    <p class=\"warning\">{}</p>\n",
                escape_html(&w.message)
            ));
        }
    }

    html.push_str("    <div class=\"footer\">\n");
    html.push_str(&format!("        Generated by {}\n", escape_html(&p.generator)));
    html.push_str("    </div>\n");
    html.push_str("</body>\n");
    html.push_str("</html>\n");

    Ok(html)
}

fn model_heading(html: &mut String, model: &FittedModel, hand: &str) {
    html.push_str(&format!("    <h3>{} hand</h3>\n", escape_html(hand)));
    html.push_str(&format!(
        "    <p class=\"model\">{} (n = {})</p>\n",
        escape_html(&model.name),
        model.fit.n
    ));
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
    table(
        None,
        &["Term", "b", "SE", "\u{3b2}", level.as_str(), "t", "p"],
        &rows,
    )
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
        None,
        &["Level", moderator, "Slope", "SE", "CI", "t", "p", "\u{3b2}"],
        &rows,
    )
}

fn diagnostics(html: &mut String, diagnostics: &Diagnostics) {
    let vif: Vec<String> = diagnostics
        .vif
        .iter()
        .map(|(term, v)| format!("{} {}", term_label(term), fmt2(*v)))
        .collect();
    html.push_str(&paragraph(&format!(
        "Assumption checks: residual Shapiro-Wilk W = {}, p = {}; Breusch-Pagan = {}, p = {}; VIF: {}.",
        fmt2(diagnostics.residual_normality.w),
        format_p(diagnostics.residual_normality.pvalue),
        fmt2(diagnostics.breusch_pagan.statistic),
        format_p(diagnostics.breusch_pagan.pvalue),
        vif.join(", ")
    )));
    for note in &diagnostics.notes {
        html.push_str(&format!("    <p class=\"note\">{}</p>\n", escape_html(note)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a&b"), "a&amp;b");
        assert_eq!(escape_html("\"test\""), "&quot;test&quot;");
        assert_eq!(escape_html("'test'"), "&#39;test&#39;");
    }

    #[test]
    fn test_table_escapes_cells() {
        let html = table(None, &["a"], &[vec!["<b>".to_string()]]);
        assert!(html.contains("<td>&lt;b&gt;</td>"));
        assert!(html.contains("<th>a</th>"));
    }
}
