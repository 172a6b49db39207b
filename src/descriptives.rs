//! Gender-stratified descriptive statistics

use crate::dataset::{Gender, Hand, Participant};
use crate::stats::{mean, sample_sd};
use serde::Serialize;
use std::fmt;

/// Variables summarised in the descriptive table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Variable {
    Age,
    AqScore,
    Tapping(Hand),
}

impl Variable {
    /// Default row order of the descriptive table
    pub const DEFAULT: [Variable; 4] = [
        Variable::Age,
        Variable::AqScore,
        Variable::Tapping(Hand::Dominant),
        Variable::Tapping(Hand::NonDominant),
    ];

    pub fn label(self) -> &'static str {
        match self {
            Variable::Age => "Age (years)",
            Variable::AqScore => "AQ-10 score",
            Variable::Tapping(Hand::Dominant) => "FTT dominant hand",
            Variable::Tapping(Hand::NonDominant) => "FTT non-dominant hand",
        }
    }

    pub fn value(self, p: &Participant) -> f64 {
        match self {
            Variable::Age => f64::from(p.age),
            Variable::AqScore => f64::from(p.aq_score),
            Variable::Tapping(hand) => p.score(hand),
        }
    }
}

/// Column of the descriptive table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stratum {
    Overall,
    Gender(Gender),
}

impl Stratum {
    pub fn includes(self, p: &Participant) -> bool {
        match self {
            Stratum::Overall => true,
            Stratum::Gender(g) => p.gender == g,
        }
    }
}

impl fmt::Display for Stratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stratum::Overall => f.write_str("Overall"),
            Stratum::Gender(g) => write!(f, "{}", g),
        }
    }
}

/// n, mean, SD, min and max of one variable in one stratum
///
/// Statistics that are undefined for the stratum size are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellStats {
    pub n: usize,
    pub mean: Option<f64>,
    pub sd: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl CellStats {
    fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        Self {
            n,
            mean: (n > 0).then(|| mean(values)),
            sd: (n > 1).then(|| sample_sd(values)),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveRow {
    pub variable: Variable,
    pub label: &'static str,
    pub cells: Vec<CellStats>,
}

/// Count and share of one gender in the sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderShare {
    pub gender: Gender,
    pub n: usize,
    pub percent: f64,
}

/// The descriptive table: one row per variable, one cell per stratum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveTable {
    pub strata: Vec<Stratum>,
    pub rows: Vec<DescriptiveRow>,
    pub gender_split: Vec<GenderShare>,
    pub n_total: usize,
}

impl DescriptiveTable {
    pub fn cell(&self, variable: Variable, stratum: Stratum) -> Option<&CellStats> {
        let col = self.strata.iter().position(|s| *s == stratum)?;
        self.rows
            .iter()
            .find(|r| r.variable == variable)
            .and_then(|r| r.cells.get(col))
    }
}

/// Summarise `variables` overall and per gender
pub fn describe(participants: &[Participant], variables: &[Variable]) -> DescriptiveTable {
    let strata: Vec<Stratum> = std::iter::once(Stratum::Overall)
        .chain(Gender::ALL.into_iter().map(Stratum::Gender))
        .collect();

    let rows = variables
        .iter()
        .map(|&variable| DescriptiveRow {
            variable,
            label: variable.label(),
            cells: strata
                .iter()
                .map(|&stratum| {
                    let values: Vec<f64> = participants
                        .iter()
                        .filter(|p| stratum.includes(p))
                        .map(|p| variable.value(p))
                        .collect();
                    CellStats::from_values(&values)
                })
                .collect(),
        })
        .collect();

    let n_total = participants.len();
    let gender_split = Gender::ALL
        .into_iter()
        .map(|gender| {
            let n = participants.iter().filter(|p| p.gender == gender).count();
            GenderShare {
                gender,
                n,
                percent: if n_total > 0 {
                    100.0 * n as f64 / n_total as f64
                } else {
                    0.0
                },
            }
        })
        .collect();

    DescriptiveTable {
        strata,
        rows,
        gender_split,
        n_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: &str, gender: Gender, age: u32, aq: u8, dom: f64) -> Participant {
        Participant {
            id: id.to_string(),
            age,
            gender,
            aq_score: aq,
            platform: "web".to_string(),
            dominant: dom,
            non_dominant: dom - 5.0,
        }
    }

    #[test]
    fn test_describe_by_gender() {
        let participants = vec![
            participant("a", Gender::Male, 20, 2, 50.0),
            participant("b", Gender::Male, 30, 4, 60.0),
            participant("c", Gender::Female, 40, 6, 40.0),
        ];
        let table = describe(&participants, &Variable::DEFAULT);
        assert_eq!(table.strata.len(), 3);
        assert_eq!(table.rows.len(), 4);

        let age_all = table.cell(Variable::Age, Stratum::Overall).unwrap();
        assert_eq!(age_all.n, 3);
        assert_eq!(age_all.mean, Some(30.0));
        assert_eq!(age_all.sd, Some(10.0));
        assert_eq!(age_all.min, Some(20.0));
        assert_eq!(age_all.max, Some(40.0));

        let age_male = table.cell(Variable::Age, Stratum::Gender(Gender::Male)).unwrap();
        assert_eq!(age_male.mean, Some(25.0));

        let nd_female = table
            .cell(Variable::Tapping(Hand::NonDominant), Stratum::Gender(Gender::Female))
            .unwrap();
        assert_eq!(nd_female.n, 1);
        assert_eq!(nd_female.mean, Some(35.0));
        assert_eq!(nd_female.sd, None);
    }

    #[test]
    fn test_empty_stratum() {
        let participants = vec![participant("a", Gender::Male, 20, 2, 50.0)];
        let table = describe(&participants, &[Variable::AqScore]);
        let female = table
            .cell(Variable::AqScore, Stratum::Gender(Gender::Female))
            .unwrap();
        assert_eq!(female.n, 0);
        assert_eq!(female.mean, None);
        assert_eq!(female.min, None);
    }

    #[test]
    fn test_gender_split() {
        let participants = vec![
            participant("a", Gender::Male, 20, 2, 50.0),
            participant("b", Gender::Female, 30, 4, 60.0),
            participant("c", Gender::Female, 40, 6, 40.0),
            participant("d", Gender::Female, 40, 6, 40.0),
        ];
        let table = describe(&participants, &Variable::DEFAULT);
        assert_eq!(table.gender_split[0].n, 1);
        assert_eq!(table.gender_split[0].percent, 25.0);
        assert_eq!(table.gender_split[1].percent, 75.0);
        assert_eq!(table.n_total, 4);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Variable::AqScore.label(), "AQ-10 score");
        assert_eq!(Stratum::Gender(Gender::Female).to_string(), "Female");
        assert_eq!(Stratum::Overall.to_string(), "Overall");
    }
}
