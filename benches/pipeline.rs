//! Analysis pipeline benchmark
//!
//! Measures loading, the full analysis and rendering on the bundled
//! 32-row participant file, plus model fitting on larger synthetic samples.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench pipeline
//! ```

use aqtap::config::AnalysisConfig;
use aqtap::dataset::{load_bytes, Dataset, Gender, Hand, LoadSummary, Participant};
use aqtap::moderation::analyze_hand;
use aqtap::pipeline;
use aqtap::report::{render_html, render_markdown};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const FIXTURE: &[u8] = include_bytes!("../tests/fixtures/participants.csv");

/// Deterministic synthetic sample of `n` participants
fn synthetic(n: u32) -> Vec<Participant> {
    (0..n)
        .map(|i| {
            let aq = f64::from(i % 11);
            let age = 18 + (i * 13) % 50;
            let jitter = f64::from((i * 29) % 19) - 9.0;
            Participant {
                id: format!("B{:05}", i),
                age,
                gender: if (i / 2) % 2 == 0 {
                    Gender::Male
                } else {
                    Gender::Female
                },
                aq_score: (i % 11) as u8,
                platform: "desktop".to_string(),
                dominant: 60.0 + 0.4 * aq - 0.2 * f64::from(age) + jitter,
                non_dominant: 52.0 + 0.3 * aq - 0.15 * f64::from(age) + jitter * 0.6
                    + f64::from((i * 7) % 5),
            }
        })
        .collect()
}

fn bench_load(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    c.bench_function("load_fixture", |b| {
        b.iter(|| load_bytes(black_box(FIXTURE), "participants.csv", &config))
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let data = match load_bytes(FIXTURE, "participants.csv", &config) {
        Ok(data) => data,
        Err(e) => panic!("fixture failed to load: {}", e),
    };

    c.bench_function("pipeline_fixture", |b| {
        b.iter(|| pipeline::run(black_box(&data), &config))
    });

    let report = match pipeline::run(&data, &config) {
        Ok(report) => report,
        Err(e) => panic!("fixture analysis failed: {}", e),
    };
    c.bench_function("render_markdown", |b| {
        b.iter(|| render_markdown(black_box(&report), Some("report")))
    });
    c.bench_function("render_html", |b| b.iter(|| render_html(black_box(&report))));
}

fn bench_moderation_scaling(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let mut group = c.benchmark_group("moderation_models");

    for n in [50u32, 500, 5000] {
        let participants = synthetic(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &participants, |b, p| {
            b.iter(|| analyze_hand(black_box(p), Hand::Dominant, &config))
        });
    }

    group.finish();
}

fn bench_synthetic_report(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let participants = synthetic(400);
    let data = Dataset {
        summary: LoadSummary {
            source: "synthetic".to_string(),
            sha256: String::new(),
            rows_read: participants.len(),
            excluded_ids: Vec::new(),
            min_dominant_taps: config.min_dominant_taps,
        },
        participants,
    };

    c.bench_function("pipeline_synthetic_400", |b| {
        b.iter(|| pipeline::run(black_box(&data), &config))
    });
}

criterion_group!(
    benches,
    bench_load,
    bench_full_pipeline,
    bench_moderation_scaling,
    bench_synthetic_report
);
criterion_main!(benches);
