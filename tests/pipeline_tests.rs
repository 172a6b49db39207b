// End-to-end tests of the analysis pipeline through the library API

use aqtap::config::AnalysisConfig;
use aqtap::dataset::{load_bytes, Gender, Hand};
use aqtap::descriptives::{describe, Stratum, Variable};
use aqtap::hand_comparison::PairedTest;
use aqtap::pipeline::{self, AnalysisError};
use aqtap::stats::StatsError;
use std::path::PathBuf;

const TEN_ROWS: &str = "\
participant_id,gender,age,aq_score,platform,ftt_dominant,ftt_nondominant
m1,1,20,1,desktop,50,45
m2,1,22,3,desktop,52,47
m3,1,24,5,mobile,54,49
m4,1,26,7,desktop,56,51
m5,1,28,9,mobile,58,53
f1,2,30,2,desktop,40,35
f2,2,30,2,mobile,45,40
f3,2,35,4,desktop,50,45
f4,2,40,6,mobile,55,50
f5,2,40,6,desktop,60,55
";

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/participants.csv")
}

fn close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("statistic should be defined");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn test_descriptives_match_hand_computation() {
    let data = load_bytes(TEN_ROWS.as_bytes(), "ten.csv", &AnalysisConfig::default()).unwrap();
    assert_eq!(data.len(), 10);
    let table = describe(&data.participants, &Variable::DEFAULT);

    let age = table.cell(Variable::Age, Stratum::Overall).unwrap();
    assert_eq!(age.n, 10);
    close(age.mean, 29.5);
    close(age.sd, (442.5f64 / 9.0).sqrt());
    close(age.min, 20.0);
    close(age.max, 40.0);

    let male_age = table
        .cell(Variable::Age, Stratum::Gender(Gender::Male))
        .unwrap();
    close(male_age.mean, 24.0);
    close(male_age.sd, 10f64.sqrt());

    let female_age = table
        .cell(Variable::Age, Stratum::Gender(Gender::Female))
        .unwrap();
    close(female_age.mean, 35.0);
    close(female_age.sd, 5.0);

    let aq = table.cell(Variable::AqScore, Stratum::Overall).unwrap();
    close(aq.mean, 4.5);

    let dom = Variable::Tapping(Hand::Dominant);
    let male_dom = table.cell(dom, Stratum::Gender(Gender::Male)).unwrap();
    close(male_dom.mean, 54.0);
    close(male_dom.sd, 10f64.sqrt());
    let female_dom = table.cell(dom, Stratum::Gender(Gender::Female)).unwrap();
    close(female_dom.mean, 50.0);
    close(female_dom.sd, 62.5f64.sqrt());

    let non_dom = table
        .cell(Variable::Tapping(Hand::NonDominant), Stratum::Overall)
        .unwrap();
    close(non_dom.mean, 47.0);

    assert_eq!(table.n_total, 10);
    for share in &table.gender_split {
        assert_eq!(share.n, 5);
        assert!((share.percent - 50.0).abs() < 1e-12);
    }
}

#[test]
fn test_constant_hand_difference_fails_loudly() {
    // Every participant is exactly 5 taps faster with the dominant hand,
    // so the normality check on the differences is undefined
    let data = load_bytes(TEN_ROWS.as_bytes(), "ten.csv", &AnalysisConfig::default()).unwrap();
    let err = pipeline::run(&data, &AnalysisConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Stats(StatsError::ZeroVariance { .. })
    ));
}

#[test]
fn test_fixture_runs_end_to_end() {
    let report = pipeline::run_file(fixture(), &AnalysisConfig::default()).unwrap();

    assert_eq!(report.provenance.rows_read, 32);
    assert_eq!(report.provenance.excluded_ids, vec!["S017"]);
    assert_eq!(report.provenance.participants_analysed, 31);
    assert_eq!(report.hand_comparison.n_pairs, 31);

    let rejects = report
        .hand_comparison
        .normality
        .rejects_normality(report.hand_comparison.alpha);
    match &report.hand_comparison.test {
        PairedTest::Wilcoxon(_) => assert!(rejects),
        PairedTest::TTest(_) => assert!(!rejects),
    }

    for models in report.models() {
        assert_eq!(models.primary.fit.n, 31);
        assert_eq!(models.age_slopes.len(), 3);
        assert_eq!(models.gender_slopes.len(), 2);
        assert!(models.primary.fit.coefficient("aq_c:age_c").is_some());
        assert!(models.exploratory.fit.coefficient("aq_c:gender").is_some());
    }
    assert_eq!(report.figures.len(), 5);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_fixture_is_reproducible() {
    let config = AnalysisConfig::default();
    let a = pipeline::run_file(fixture(), &config).unwrap();
    let b = pipeline::run_file(fixture(), &config).unwrap();
    assert_eq!(a.provenance.sha256, b.provenance.sha256);
    for (x, y) in a.figures.iter().zip(&b.figures) {
        assert_eq!(x.svg, y.svg);
    }
}

#[test]
fn test_invalid_config_rejected_before_loading() {
    let config = AnalysisConfig {
        confidence_level: 1.0,
        ..AnalysisConfig::default()
    };
    let err = pipeline::run_file("no-such-file.csv", &config).unwrap_err();
    assert!(matches!(err, AnalysisError::Config(_)));
}
