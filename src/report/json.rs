//! JSON output: the full structured results
//!
//! Figures appear by id and caption only; their SVG is not embedded.

use super::{RenderError, Report};
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    #[serde(flatten)]
    report: &'a Report,
}

/// Serialize the report as pretty-printed JSON
pub fn render_json(report: &Report) -> Result<String, RenderError> {
    let wrapped = JsonReport {
        version: "1.0",
        report,
    };
    let mut json = serde_json::to_string_pretty(&wrapped)?;
    json.push('\n');
    Ok(json)
}
