//! Spearman correlation matrix with significance stars

use crate::dataset::Participant;
use crate::stats::{spearman, Correlation, StatsError};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CorrelationVariable {
    Age,
    Gender,
    AqScore,
    Dominant,
    NonDominant,
}

impl CorrelationVariable {
    pub const ALL: [CorrelationVariable; 5] = [
        CorrelationVariable::Age,
        CorrelationVariable::Gender,
        CorrelationVariable::AqScore,
        CorrelationVariable::Dominant,
        CorrelationVariable::NonDominant,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CorrelationVariable::Age => "Age",
            CorrelationVariable::Gender => "Gender",
            CorrelationVariable::AqScore => "AQ-10",
            CorrelationVariable::Dominant => "FTT dominant",
            CorrelationVariable::NonDominant => "FTT non-dominant",
        }
    }

    fn value(self, p: &Participant) -> f64 {
        match self {
            CorrelationVariable::Age => f64::from(p.age),
            CorrelationVariable::Gender => f64::from(p.gender.dummy()),
            CorrelationVariable::AqScore => f64::from(p.aq_score),
            CorrelationVariable::Dominant => p.dominant,
            CorrelationVariable::NonDominant => p.non_dominant,
        }
    }
}

/// Stars for p < .05, .01 and .001
pub fn significance_stars(pvalue: f64) -> &'static str {
    if pvalue < 0.001 {
        "***"
    } else if pvalue < 0.01 {
        "**"
    } else if pvalue < 0.05 {
        "*"
    } else {
        ""
    }
}

/// Lower-triangular correlation matrix
///
/// `rows[i]` holds the correlations of variable `i` with variables `0..i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub variables: Vec<CorrelationVariable>,
    pub rows: Vec<Vec<Correlation>>,
}

impl CorrelationMatrix {
    /// Correlation between two distinct variables, in either order
    pub fn get(&self, a: CorrelationVariable, b: CorrelationVariable) -> Option<&Correlation> {
        let i = self.variables.iter().position(|v| *v == a)?;
        let j = self.variables.iter().position(|v| *v == b)?;
        match i.cmp(&j) {
            std::cmp::Ordering::Greater => self.rows[i].get(j),
            std::cmp::Ordering::Less => self.rows[j].get(i),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Pairwise Spearman correlations over `variables`
pub fn spearman_matrix(
    participants: &[Participant],
    variables: &[CorrelationVariable],
) -> Result<CorrelationMatrix, StatsError> {
    let columns: Vec<Vec<f64>> = variables
        .iter()
        .map(|v| participants.iter().map(|p| v.value(p)).collect())
        .collect();

    let mut rows = Vec::with_capacity(variables.len());
    for i in 0..variables.len() {
        let mut row = Vec::with_capacity(i);
        for j in 0..i {
            let c = spearman(&columns[i], &columns[j]).map_err(|e| match e {
                StatsError::ZeroVariance { test, .. } => StatsError::ZeroVariance {
                    test,
                    what: format!(
                        "{} or {}",
                        variables[i].label(),
                        variables[j].label()
                    ),
                },
                other => other,
            })?;
            debug!(
                a = variables[i].label(),
                b = variables[j].label(),
                rho = c.coefficient,
                p = c.pvalue,
                "spearman correlation"
            );
            row.push(c);
        }
        rows.push(row);
    }

    Ok(CorrelationMatrix {
        variables: variables.to_vec(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Gender;

    fn participants() -> Vec<Participant> {
        (0..12)
            .map(|i| Participant {
                id: format!("p{}", i),
                age: 20 + i,
                gender: if i % 3 == 0 { Gender::Female } else { Gender::Male },
                aq_score: (i % 5) as u8,
                platform: "web".to_string(),
                dominant: 40.0 + f64::from(i) * 2.0,
                non_dominant: 70.0 - f64::from(i),
            })
            .collect()
    }

    #[test]
    fn test_stars() {
        assert_eq!(significance_stars(0.0005), "***");
        assert_eq!(significance_stars(0.001), "**");
        assert_eq!(significance_stars(0.009), "**");
        assert_eq!(significance_stars(0.01), "*");
        assert_eq!(significance_stars(0.049), "*");
        assert_eq!(significance_stars(0.05), "");
        assert_eq!(significance_stars(0.5), "");
    }

    #[test]
    fn test_matrix_shape_and_lookup() {
        let m = spearman_matrix(&participants(), &CorrelationVariable::ALL).unwrap();
        assert_eq!(m.rows.len(), 5);
        for (i, row) in m.rows.iter().enumerate() {
            assert_eq!(row.len(), i);
        }

        let age_dom = m
            .get(CorrelationVariable::Dominant, CorrelationVariable::Age)
            .unwrap();
        assert!((age_dom.coefficient - 1.0).abs() < 1e-12);
        let age_nd = m
            .get(CorrelationVariable::Age, CorrelationVariable::NonDominant)
            .unwrap();
        assert!((age_nd.coefficient + 1.0).abs() < 1e-12);
        assert!(m
            .get(CorrelationVariable::Age, CorrelationVariable::Age)
            .is_none());
    }

    #[test]
    fn test_constant_variable_names_pair() {
        let mut ps = participants();
        for p in &mut ps {
            p.gender = Gender::Male;
        }
        let err = spearman_matrix(&ps, &CorrelationVariable::ALL).unwrap_err();
        assert!(err.to_string().contains("Gender"));
    }
}
