//! Consistency of prose claims with computed results
//!
//! Narrative values are always generated from the fitted models. When the
//! configuration states what an accompanying text claims (for example
//! "the model explained 22% of the variance"), each claim is compared with
//! the computed value and a mismatch becomes a warning. Warnings never
//! fail the run.

use crate::config::NarrativeClaims;
use crate::dataset::Hand;
use crate::moderation::HandModels;
use serde::Serialize;
use tracing::warn;

/// A claimed value that disagrees with the computed one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyWarning {
    pub subject: String,
    pub claimed_percent: f64,
    pub computed_percent: f64,
    pub message: String,
}

/// Compare configured R² claims against the primary models
pub fn check_claims(claims: &NarrativeClaims, models: &[&HandModels]) -> Vec<ConsistencyWarning> {
    let mut warnings = Vec::new();
    for m in models {
        let claimed = match m.hand {
            Hand::Dominant => claims.dominant_r2_percent,
            Hand::NonDominant => claims.nondominant_r2_percent,
        };
        let Some(claimed) = claimed else { continue };

        let computed = m.primary.fit.r_squared * 100.0;
        if (claimed - computed).abs() > claims.tolerance_percent {
            let subject = format!("R\u{b2} of the {} model", super::outcome_label(m.hand));
            let message = format!(
                "The text claims {}% for the {} but the fitted model gives {:.1}%.",
                claimed, subject, computed
            );
            warn!(
                hand = m.hand.label(),
                claimed,
                computed,
                "narrative value disagrees with fitted model"
            );
            warnings.push(ConsistencyWarning {
                subject,
                claimed_percent: claimed,
                computed_percent: computed,
                message,
            });
        }
    }
    warnings
}
