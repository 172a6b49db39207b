//! Dominant vs non-dominant hand comparison
//!
//! The within-participant difference is tested for normality first; that
//! single decision picks the paired test:
//! - normality rejected (p < alpha): Wilcoxon signed-rank
//! - otherwise: paired t-test
//!
//! A difference distribution on which Shapiro-Wilk is undefined (all zero,
//! constant, fewer than three pairs) aborts the comparison.

use crate::dataset::{pair_by_participant, Hand, LongObservation};
use crate::stats::{
    self, median, paired_t_test, shapiro_wilk, wilcoxon_signed_rank, PairedTTest, ShapiroWilk,
    StatsError, WilcoxonSignedRank,
};
use serde::Serialize;
use tracing::{debug, info};

/// The paired test that was selected and its outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum PairedTest {
    Wilcoxon(WilcoxonSignedRank),
    TTest(PairedTTest),
}

impl PairedTest {
    pub fn name(&self) -> &'static str {
        match self {
            PairedTest::Wilcoxon(_) => "Wilcoxon signed-rank test",
            PairedTest::TTest(_) => "paired t-test",
        }
    }

    pub fn pvalue(&self) -> f64 {
        match self {
            PairedTest::Wilcoxon(w) => w.pvalue,
            PairedTest::TTest(t) => t.pvalue,
        }
    }

    /// True when the dominant hand scored higher on the test's own scale
    pub fn favors_dominant(&self) -> bool {
        match self {
            PairedTest::Wilcoxon(w) => w.z > 0.0,
            PairedTest::TTest(t) => t.mean_difference > 0.0,
        }
    }
}

/// Per-hand location summary shown next to the test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandSummary {
    pub hand: Hand,
    pub n: usize,
    pub mean: f64,
    pub sd: f64,
    pub median: f64,
}

/// Full result of the preliminary hand comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandComparison {
    pub n_pairs: usize,
    pub normality: ShapiroWilk,
    pub alpha: f64,
    pub test: PairedTest,
    pub dominant: HandSummary,
    pub non_dominant: HandSummary,
}

impl HandComparison {
    pub fn is_significant(&self) -> bool {
        self.test.pvalue() < self.alpha
    }

    pub fn summary(&self, hand: Hand) -> &HandSummary {
        match hand {
            Hand::Dominant => &self.dominant,
            Hand::NonDominant => &self.non_dominant,
        }
    }
}

fn summarize(hand: Hand, scores: &[f64]) -> Result<HandSummary, StatsError> {
    Ok(HandSummary {
        hand,
        n: scores.len(),
        mean: stats::mean(scores),
        sd: stats::sample_sd(scores),
        median: median(scores)?,
    })
}

/// Compare hands on long-form observations
///
/// Observations are paired back by participant id; the tested difference is
/// dominant minus non-dominant.
pub fn compare_hands(
    observations: &[LongObservation],
    alpha: f64,
    confidence: f64,
) -> Result<HandComparison, StatsError> {
    let pairs = pair_by_participant(observations)?;
    let dominant: Vec<f64> = pairs.iter().map(|p| p.dominant).collect();
    let non_dominant: Vec<f64> = pairs.iter().map(|p| p.non_dominant).collect();
    let differences: Vec<f64> = pairs.iter().map(|p| p.dominant - p.non_dominant).collect();

    if differences.iter().all(|d| *d == 0.0) {
        return Err(StatsError::AllDifferencesZero {
            test: "Shapiro-Wilk",
        });
    }
    let normality = shapiro_wilk(&differences)?;
    debug!(
        w = normality.w,
        p = normality.pvalue,
        "normality of hand differences"
    );

    let test = if normality.rejects_normality(alpha) {
        PairedTest::Wilcoxon(wilcoxon_signed_rank(&dominant, &non_dominant)?)
    } else {
        PairedTest::TTest(paired_t_test(&dominant, &non_dominant, confidence)?)
    };
    info!(
        test = test.name(),
        p = test.pvalue(),
        n_pairs = pairs.len(),
        "hand comparison complete"
    );

    Ok(HandComparison {
        n_pairs: pairs.len(),
        normality,
        alpha,
        test,
        dominant: summarize(Hand::Dominant, &dominant)?,
        non_dominant: summarize(Hand::NonDominant, &non_dominant)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{to_long, Gender, Participant};

    fn participant(id: usize, dominant: f64, non_dominant: f64) -> Participant {
        Participant {
            id: format!("p{}", id),
            age: 20 + id as u32,
            gender: if id % 2 == 0 { Gender::Male } else { Gender::Female },
            aq_score: (id % 11) as u8,
            platform: "web".to_string(),
            dominant,
            non_dominant,
        }
    }

    #[test]
    fn test_skewed_differences_use_wilcoxon() {
        // Mostly small differences with a few very large ones
        let participants: Vec<Participant> = (0..30)
            .map(|i| {
                let diff = if i % 10 == 0 { 40.0 } else { 1.0 + (i % 3) as f64 * 0.5 };
                participant(i, 50.0 + diff + i as f64, 50.0 + i as f64)
            })
            .collect();
        let result = compare_hands(&to_long(&participants), 0.05, 0.95).unwrap();
        assert!(result.normality.rejects_normality(0.05));
        assert!(matches!(result.test, PairedTest::Wilcoxon(_)));
        assert!(result.is_significant());
        assert!(result.test.favors_dominant());
        assert_eq!(result.n_pairs, 30);
    }

    #[test]
    fn test_normal_differences_use_t_test() {
        // Differences are evenly spread around 4, which Shapiro-Wilk accepts
        let participants: Vec<Participant> = (0..20)
            .map(|i| {
                let diff = 4.0 + (i as f64 - 9.5) * 0.3;
                participant(i, 40.0 + diff + (i % 4) as f64, 40.0 + (i % 4) as f64)
            })
            .collect();
        let result = compare_hands(&to_long(&participants), 0.05, 0.95).unwrap();
        assert!(!result.normality.rejects_normality(0.05));
        match &result.test {
            PairedTest::TTest(t) => {
                assert!((t.mean_difference - 4.0).abs() < 1e-9);
                assert!(t.pvalue < 0.001);
            }
            other => panic!("expected t-test, got {:?}", other),
        }
    }

    #[test]
    fn test_constant_difference_fails_loudly() {
        let participants: Vec<Participant> =
            (0..10).map(|i| participant(i, 45.0 + i as f64, 40.0 + i as f64)).collect();
        let err = compare_hands(&to_long(&participants), 0.05, 0.95).unwrap_err();
        assert!(matches!(err, StatsError::ZeroVariance { test: "Shapiro-Wilk", .. }));
    }

    #[test]
    fn test_all_zero_difference_fails_loudly() {
        let participants: Vec<Participant> =
            (0..10).map(|i| participant(i, 40.0 + i as f64, 40.0 + i as f64)).collect();
        let err = compare_hands(&to_long(&participants), 0.05, 0.95).unwrap_err();
        assert!(matches!(err, StatsError::AllDifferencesZero { .. }));
    }

    #[test]
    fn test_too_few_pairs() {
        let participants = vec![participant(0, 50.0, 40.0), participant(1, 52.0, 45.0)];
        let err = compare_hands(&to_long(&participants), 0.05, 0.95).unwrap_err();
        assert!(matches!(err, StatsError::TooFewObservations { .. }));
    }

    #[test]
    fn test_unpaired_long_data_is_error() {
        let participants: Vec<Participant> =
            (0..5).map(|i| participant(i, 50.0 + i as f64, 40.0)).collect();
        let mut long = to_long(&participants);
        long.remove(3);
        let err = compare_hands(&long, 0.05, 0.95).unwrap_err();
        assert!(matches!(err, StatsError::Pairing(_)));
    }

    #[test]
    fn test_hand_summaries() {
        let participants: Vec<Participant> = (0..9)
            .map(|i| participant(i, 50.0 + i as f64 * 2.0 + (i % 2) as f64, 45.0 + i as f64))
            .collect();
        let result = compare_hands(&to_long(&participants), 0.05, 0.95).unwrap();
        assert_eq!(result.dominant.n, 9);
        assert_eq!(result.non_dominant.median, 49.0);
        assert_eq!(result.summary(Hand::NonDominant).mean, 49.0);
    }
}
