//! Participant data loading, cleaning and reshaping
//!
//! Turns a delimited participant file into validated [`Participant`] records:
//! rows with too few dominant-hand taps are dropped, the 1/2 gender code is
//! recoded to a 0/1 dummy, and only the analysis columns are kept.

use crate::config::{AnalysisConfig, ColumnNames};
use crate::delimited::{self, DelimitedError, Record, Table};
use crate::stats;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Upper bound of the AQ-10 screening score
pub const AQ10_MAX: u8 = 10;

/// Input errors: all fatal, no partial recovery
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot read input file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Input is not valid UTF-8 text")]
    Encoding,

    #[error("Input is not valid delimited data: {0}")]
    Malformed(#[from] DelimitedError),

    #[error("Required column '{column}' (for {field}) not found in header [{found}]")]
    MissingColumn {
        field: &'static str,
        column: String,
        found: String,
    },

    #[error("Line {line}, column '{column}': {reason} (value: {value:?})")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
        reason: String,
    },

    #[error("Line {line}: duplicate participant id '{id}'")]
    DuplicateParticipant { line: usize, id: String },

    #[error("No participants left after excluding dominant-hand scores <= {threshold}")]
    NoParticipants { threshold: f64 },
}

/// Gender exactly as coded in the source file (1 or 2)
///
/// Only this type can be recoded, so a value that was already recoded to
/// 0/1 cannot pass through recoding again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawGenderCode(u8);

impl RawGenderCode {
    pub fn new(code: u8) -> Option<Self> {
        matches!(code, 1 | 2).then_some(Self(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }

    /// Recode 1 -> Male (0), 2 -> Female (1)
    pub fn recode(self) -> Gender {
        match self.0 {
            1 => Gender::Male,
            _ => Gender::Female,
        }
    }
}

/// Recoded gender with its 0/1 dummy value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Dummy coding used in the regression models
    pub fn dummy(self) -> u8 {
        match self {
            Gender::Male => 0,
            Gender::Female => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which hand a tapping score belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Hand {
    Dominant,
    NonDominant,
}

impl Hand {
    pub const ALL: [Hand; 2] = [Hand::Dominant, Hand::NonDominant];

    pub fn label(self) -> &'static str {
        match self {
            Hand::Dominant => "Dominant",
            Hand::NonDominant => "Non-dominant",
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One retained participant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub id: String,
    pub age: u32,
    pub gender: Gender,
    pub aq_score: u8,
    pub platform: String,
    pub dominant: f64,
    pub non_dominant: f64,
}

impl Participant {
    pub fn score(&self, hand: Hand) -> f64 {
        match hand {
            Hand::Dominant => self.dominant,
            Hand::NonDominant => self.non_dominant,
        }
    }

    /// Within-participant difference (dominant minus non-dominant)
    pub fn hand_difference(&self) -> f64 {
        self.dominant - self.non_dominant
    }
}

/// One row per participant and hand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongObservation {
    pub participant_id: String,
    pub hand: Hand,
    pub score: f64,
    pub age: u32,
    pub gender: Gender,
    pub aq_score: u8,
}

/// Dominant and non-dominant scores paired back by participant
#[derive(Debug, Clone, PartialEq)]
pub struct PairedScores {
    pub participant_id: String,
    pub dominant: f64,
    pub non_dominant: f64,
}

/// Provenance of a loaded dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    pub source: String,
    pub sha256: String,
    pub rows_read: usize,
    pub excluded_ids: Vec<String>,
    pub min_dominant_taps: f64,
}

impl LoadSummary {
    pub fn rows_excluded(&self) -> usize {
        self.excluded_ids.len()
    }
}

/// Cleaned participant set plus provenance
#[derive(Debug, Clone)]
pub struct Dataset {
    pub participants: Vec<Participant>,
    pub summary: LoadSummary,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn mean_age(&self) -> f64 {
        let ages: Vec<f64> = self.participants.iter().map(|p| f64::from(p.age)).collect();
        stats::mean(&ages)
    }

    pub fn mean_aq(&self) -> f64 {
        let scores: Vec<f64> = self.participants.iter().map(|p| f64::from(p.aq_score)).collect();
        stats::mean(&scores)
    }

    /// Ages centered at the sample mean
    pub fn centered_ages(&self) -> Vec<f64> {
        let m = self.mean_age();
        self.participants
            .iter()
            .map(|p| f64::from(p.age) - m)
            .collect()
    }

    /// AQ-10 scores centered at the sample mean
    pub fn centered_aq(&self) -> Vec<f64> {
        let m = self.mean_aq();
        self.participants
            .iter()
            .map(|p| f64::from(p.aq_score) - m)
            .collect()
    }

    pub fn scores(&self, hand: Hand) -> Vec<f64> {
        self.participants.iter().map(|p| p.score(hand)).collect()
    }

    pub fn to_long(&self) -> Vec<LongObservation> {
        to_long(&self.participants)
    }
}

/// Load and clean a participant file from disk
pub fn load_file<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_bytes(&bytes, &path.display().to_string(), config)
}

/// Load and clean participant data held in memory
///
/// `source` only labels the data in the load summary.
pub fn load_bytes(bytes: &[u8], source: &str, config: &AnalysisConfig) -> Result<Dataset, LoadError> {
    let text = std::str::from_utf8(bytes).map_err(|_| LoadError::Encoding)?;
    let table = delimited::parse(text, config.delimiter)?;
    let columns = resolve_columns(&table, &config.columns)?;

    let mut participants = Vec::with_capacity(table.records.len());
    let mut excluded_ids = Vec::new();
    let mut seen = HashSet::new();

    for record in &table.records {
        let participant = parse_record(record, &columns)?;
        if !seen.insert(participant.id.clone()) {
            return Err(LoadError::DuplicateParticipant {
                line: record.line,
                id: participant.id,
            });
        }

        if participant.dominant <= config.min_dominant_taps {
            debug!(
                id = %participant.id,
                dominant = participant.dominant,
                "excluding participant below tap threshold"
            );
            excluded_ids.push(participant.id);
            continue;
        }
        participants.push(participant);
    }

    if participants.is_empty() {
        return Err(LoadError::NoParticipants {
            threshold: config.min_dominant_taps,
        });
    }

    let summary = LoadSummary {
        source: source.to_string(),
        sha256: hex::encode(Sha256::digest(bytes)),
        rows_read: table.records.len(),
        excluded_ids,
        min_dominant_taps: config.min_dominant_taps,
    };

    info!(
        rows_read = summary.rows_read,
        retained = participants.len(),
        excluded = summary.rows_excluded(),
        "loaded participant data"
    );

    Ok(Dataset {
        participants,
        summary,
    })
}

/// Header positions for each required field
struct ColumnMap {
    id: (usize, String),
    gender: (usize, String),
    age: (usize, String),
    aq: (usize, String),
    platform: (usize, String),
    dominant: (usize, String),
    non_dominant: (usize, String),
}

fn resolve_columns(table: &Table, names: &ColumnNames) -> Result<ColumnMap, LoadError> {
    let find = |field: &'static str, name: &str| {
        table
            .column_index(name)
            .map(|idx| (idx, name.to_string()))
            .ok_or_else(|| LoadError::MissingColumn {
                field,
                column: name.to_string(),
                found: table.headers.join(", "),
            })
    };

    Ok(ColumnMap {
        id: find("participant_id", &names.participant_id)?,
        gender: find("gender", &names.gender)?,
        age: find("age", &names.age)?,
        aq: find("aq_score", &names.aq_score)?,
        platform: find("platform", &names.platform)?,
        dominant: find("dominant", &names.dominant)?,
        non_dominant: find("non_dominant", &names.non_dominant)?,
    })
}

fn parse_record(record: &Record, columns: &ColumnMap) -> Result<Participant, LoadError> {
    let field = |(idx, _): &(usize, String)| record.fields[*idx].trim();
    let invalid = |(_, name): &(usize, String), value: &str, reason: &str| LoadError::InvalidValue {
        line: record.line,
        column: name.clone(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let id = field(&columns.id);
    if id.is_empty() {
        return Err(invalid(&columns.id, id, "participant id is empty"));
    }

    let raw_age = field(&columns.age);
    let age: u32 = raw_age
        .parse()
        .map_err(|_| invalid(&columns.age, raw_age, "age must be a non-negative integer"))?;

    let raw_gender = field(&columns.gender);
    let gender = raw_gender
        .parse::<u8>()
        .ok()
        .and_then(RawGenderCode::new)
        .ok_or_else(|| invalid(&columns.gender, raw_gender, "gender code must be 1 or 2"))?
        .recode();

    let raw_aq = field(&columns.aq);
    let aq_score = raw_aq
        .parse::<u8>()
        .ok()
        .filter(|aq| *aq <= AQ10_MAX)
        .ok_or_else(|| invalid(&columns.aq, raw_aq, "AQ-10 score must be an integer in 0..=10"))?;

    let parse_score = |col: &(usize, String)| {
        let raw = field(col);
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(col, raw, "tapping score must be a finite number"))
    };

    Ok(Participant {
        id: id.to_string(),
        age,
        gender,
        aq_score,
        platform: field(&columns.platform).to_string(),
        dominant: parse_score(&columns.dominant)?,
        non_dominant: parse_score(&columns.non_dominant)?,
    })
}

/// Unpivot participants into one observation per hand
pub fn to_long(participants: &[Participant]) -> Vec<LongObservation> {
    participants
        .iter()
        .flat_map(|p| {
            Hand::ALL.into_iter().map(move |hand| LongObservation {
                participant_id: p.id.clone(),
                hand,
                score: p.score(hand),
                age: p.age,
                gender: p.gender,
                aq_score: p.aq_score,
            })
        })
        .collect()
}

/// Pair long-form observations back into one row per participant
///
/// Participants come back in order of first appearance. Fails with the
/// offending id when a participant lacks a hand or repeats one.
pub fn pair_by_participant(
    observations: &[LongObservation],
) -> Result<Vec<PairedScores>, PairingError> {
    let mut order = Vec::new();
    let mut slots: BTreeMap<&str, (Option<f64>, Option<f64>)> = BTreeMap::new();

    for obs in observations {
        let entry = slots.entry(obs.participant_id.as_str()).or_insert_with(|| {
            order.push(obs.participant_id.as_str());
            (None, None)
        });
        let slot = match obs.hand {
            Hand::Dominant => &mut entry.0,
            Hand::NonDominant => &mut entry.1,
        };
        if slot.replace(obs.score).is_some() {
            return Err(PairingError::DuplicateHand {
                participant_id: obs.participant_id.clone(),
                hand: obs.hand,
            });
        }
    }

    order
        .into_iter()
        .map(|id| match slots[id] {
            (Some(dominant), Some(non_dominant)) => Ok(PairedScores {
                participant_id: id.to_string(),
                dominant,
                non_dominant,
            }),
            (None, _) => Err(PairingError::MissingHand {
                participant_id: id.to_string(),
                hand: Hand::Dominant,
            }),
            (_, None) => Err(PairingError::MissingHand {
                participant_id: id.to_string(),
                hand: Hand::NonDominant,
            }),
        })
        .collect()
}

/// Long-form data that cannot be paired by participant
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PairingError {
    #[error("Participant '{participant_id}' has no {hand} observation")]
    MissingHand { participant_id: String, hand: Hand },

    #[error("Participant '{participant_id}' has more than one {hand} observation")]
    DuplicateHand { participant_id: String, hand: Hand },
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "participant_id,gender,age,aq_score,platform,ftt_dominant,ftt_nondominant";

    fn load(text: &str) -> Result<Dataset, LoadError> {
        load_bytes(text.as_bytes(), "test.csv", &AnalysisConfig::default())
    }

    #[test]
    fn test_load_basic() {
        let data = format!("{HEADER}\np1,1,25,4,web,60.5,55\np2,2,31,7,app,52,49.5\n");
        let ds = load(&data).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.participants[0].gender, Gender::Male);
        assert_eq!(ds.participants[1].gender, Gender::Female);
        assert_eq!(ds.participants[1].non_dominant, 49.5);
        assert_eq!(ds.summary.rows_read, 2);
        assert_eq!(ds.summary.sha256.len(), 64);
    }

    #[test]
    fn test_load_excludes_low_tap_counts() {
        let data = format!(
            "{HEADER}\np1,1,25,4,web,3,10\np2,2,31,7,app,3.5,2\np3,1,40,2,web,0,0\n"
        );
        let ds = load(&data).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.participants[0].id, "p2");
        assert_eq!(ds.summary.excluded_ids, vec!["p1", "p3"]);
    }

    #[test]
    fn test_load_all_excluded_is_error() {
        let data = format!("{HEADER}\np1,1,25,4,web,2,10\n");
        assert!(matches!(load(&data), Err(LoadError::NoParticipants { .. })));
    }

    #[test]
    fn test_missing_column() {
        let data = "participant_id,gender,age,platform,ftt_dominant,ftt_nondominant\np1,1,20,web,40,30\n";
        match load(data) {
            Err(LoadError::MissingColumn { field, .. }) => assert_eq!(field, "aq_score"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_columns_in_any_order_with_extras() {
        let data = "ftt_nondominant,extra,AQ_SCORE,platform,age,gender,ftt_dominant,participant_id\n30,x,5,web,20,2,40,p9\n";
        let ds = load(data).unwrap();
        let p = &ds.participants[0];
        assert_eq!(p.id, "p9");
        assert_eq!(p.aq_score, 5);
        assert_eq!(p.dominant, 40.0);
        assert_eq!(p.non_dominant, 30.0);
    }

    #[test]
    fn test_already_recoded_gender_rejected() {
        let data = format!("{HEADER}\np1,0,25,4,web,60,55\n");
        match load(&data) {
            Err(LoadError::InvalidValue { line, column, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "gender");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_aq_out_of_range_rejected() {
        let data = format!("{HEADER}\np1,1,25,11,web,60,55\n");
        assert!(matches!(load(&data), Err(LoadError::InvalidValue { .. })));
    }

    #[test]
    fn test_non_numeric_score_rejected() {
        let data = format!("{HEADER}\np1,1,25,4,web,fast,55\n");
        let err = load(&data).unwrap_err();
        assert!(err.to_string().contains("ftt_dominant"));
    }

    #[test]
    fn test_nan_score_rejected() {
        let data = format!("{HEADER}\np1,1,25,4,web,NaN,55\n");
        assert!(matches!(load(&data), Err(LoadError::InvalidValue { .. })));
    }

    #[test]
    fn test_duplicate_participant_rejected() {
        let data = format!("{HEADER}\np1,1,25,4,web,60,55\np1,2,30,3,web,50,45\n");
        assert!(matches!(
            load(&data),
            Err(LoadError::DuplicateParticipant { line: 3, .. })
        ));
    }

    #[test]
    fn test_not_utf8() {
        let err = load_bytes(&[0xff, 0xfe, 0x00], "bin", &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::Encoding));
    }

    #[test]
    fn test_raw_gender_code_guard() {
        assert!(RawGenderCode::new(0).is_none());
        assert!(RawGenderCode::new(3).is_none());
        assert_eq!(RawGenderCode::new(1).map(RawGenderCode::recode), Some(Gender::Male));
        assert_eq!(RawGenderCode::new(2).map(RawGenderCode::recode), Some(Gender::Female));
        assert_eq!(Gender::Male.dummy(), 0);
        assert_eq!(Gender::Female.dummy(), 1);
    }

    #[test]
    fn test_recoded_dummy_cannot_be_recoded_again() {
        // A dummy value fed back as a raw code is either rejected (0) or
        // detectably maps elsewhere than its original gender (1 -> Male)
        assert!(RawGenderCode::new(Gender::Male.dummy()).is_none());
        let female_again = RawGenderCode::new(Gender::Female.dummy()).map(RawGenderCode::recode);
        assert_ne!(female_again, Some(Gender::Female));
    }

    #[test]
    fn test_centering() {
        let data = format!("{HEADER}\na,1,20,2,web,50,40\nb,2,30,6,web,50,40\n");
        let ds = load(&data).unwrap();
        assert_eq!(ds.mean_age(), 25.0);
        assert_eq!(ds.centered_ages(), vec![-5.0, 5.0]);
        assert_eq!(ds.centered_aq(), vec![-2.0, 2.0]);
    }

    #[test]
    fn test_long_roundtrip() {
        let data = format!("{HEADER}\na,1,20,2,web,50,40\nb,2,30,6,web,45.5,47\n");
        let ds = load(&data).unwrap();
        let long = ds.to_long();
        assert_eq!(long.len(), 4);
        assert_eq!(long[0].hand, Hand::Dominant);
        assert_eq!(long[1].hand, Hand::NonDominant);

        let paired = pair_by_participant(&long).unwrap();
        assert_eq!(paired.len(), 2);
        for (pair, p) in paired.iter().zip(&ds.participants) {
            assert_eq!(pair.participant_id, p.id);
            assert_eq!(pair.dominant, p.dominant);
            assert_eq!(pair.non_dominant, p.non_dominant);
        }
    }

    #[test]
    fn test_pairing_missing_hand() {
        let data = format!("{HEADER}\na,1,20,2,web,50,40\n");
        let ds = load(&data).unwrap();
        let mut long = ds.to_long();
        long.pop();
        assert_eq!(
            pair_by_participant(&long),
            Err(PairingError::MissingHand {
                participant_id: "a".to_string(),
                hand: Hand::NonDominant
            })
        );
    }

    #[test]
    fn test_pairing_duplicate_hand() {
        let data = format!("{HEADER}\na,1,20,2,web,50,40\n");
        let ds = load(&data).unwrap();
        let mut long = ds.to_long();
        long.push(long[0].clone());
        assert!(matches!(
            pair_by_participant(&long),
            Err(PairingError::DuplicateHand { .. })
        ));
    }
}
