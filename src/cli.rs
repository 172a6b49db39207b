//! CLI argument parsing for aqtap

use crate::config::AnalysisConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format of the rendered report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Markdown document with linked SVG figures (default)
    Markdown,
    /// Standalone HTML with inline figures
    Html,
    /// Structured results for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "aqtap")]
#[command(version)]
#[command(
    about = "Statistical report on autistic-trait scores, age, gender and finger-tapping performance",
    long_about = None
)]
pub struct Cli {
    /// Delimited participant file (one row per participant)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "markdown")]
    pub format: OutputFormat,

    /// TOML analysis configuration
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Drop rows whose dominant-hand score is at or below this value
    #[arg(long = "min-taps", value_name = "N")]
    pub min_taps: Option<f64>,

    /// Significance level for test choice and Johnson-Neyman bounds
    #[arg(long = "alpha", value_name = "P")]
    pub alpha: Option<f64>,

    /// Field delimiter of the input file
    #[arg(long = "delimiter", value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Seed for the jitter in figures
    #[arg(long = "seed", value_name = "N")]
    pub seed: Option<u64>,

    /// Enable debug tracing output (trace-level logs on stderr)
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut AnalysisConfig) {
        if let Some(min_taps) = self.min_taps {
            config.min_dominant_taps = min_taps;
        }
        if let Some(alpha) = self.alpha {
            config.significance_level = alpha;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if let Some(seed) = self.seed {
            config.jitter_seed = seed;
        }
    }
}
