use anyhow::{Context, Result};
use aqtap::cli::{Cli, OutputFormat};
use aqtap::config::AnalysisConfig;
use aqtap::pipeline;
use aqtap::report::{render_html, render_json, render_markdown, Report};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; warnings only unless --debug
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the configuration file (if any) and apply command-line overrides
fn load_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    args.apply_overrides(&mut config);
    config
        .validate()
        .context("Invalid configuration after command-line overrides")?;
    Ok(config)
}

/// Write each figure as `<stem>_<figure-id>.svg` next to the document
fn write_figures(report: &Report, document: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    let dir = document.parent().unwrap_or_else(|| Path::new(""));
    let mut written = Vec::with_capacity(report.figures.len());
    for figure in &report.figures {
        let path = dir.join(figure.file_name(stem));
        std::fs::write(&path, &figure.svg)
            .with_context(|| format!("Failed to write figure {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn run(args: &Cli) -> Result<()> {
    let config = load_config(args)?;
    let stem = match args.output.as_deref() {
        Some(path) => Some(
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .with_context(|| format!("Output path {} has no file name", path.display()))?,
        ),
        None => None,
    };

    let report = pipeline::run_file(&args.input, &config)
        .with_context(|| format!("Analysis of {} failed", args.input.display()))?;

    let document = match args.format {
        OutputFormat::Markdown => render_markdown(&report, stem.as_deref()),
        OutputFormat::Html => render_html(&report),
        OutputFormat::Json => render_json(&report),
    }
    .context("Failed to render report")?;

    match args.output.as_deref().zip(stem.as_deref()) {
        Some((path, stem)) => {
            std::fs::write(path, &document)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            if args.format == OutputFormat::Markdown {
                let figures = write_figures(&report, path, stem)?;
                info!(figures = figures.len(), "figures written");
            }
            info!(path = %path.display(), "report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(document.as_bytes())
                .context("Failed to write report to stdout")?;
        }
    }
    Ok(())
}

fn main() {
    let args = Cli::parse();
    init_tracing(args.debug);

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
