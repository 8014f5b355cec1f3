//! Grading engine - derives the average and letter grade of a marks row
//!
//! Score input is permissive: anything that does not read as a finite number
//! counts as zero rather than failing the write.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Number of subjects every marks row carries
pub const SUBJECT_COUNT: usize = 5;

/// Letter grade, evaluated high to low against the average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// Average of 90 or more
    #[serde(rename = "A+")]
    APlus,
    /// Average of 75 or more
    #[serde(rename = "A")]
    A,
    /// Average of 60 or more
    #[serde(rename = "B")]
    B,
    /// Everything below 60
    #[serde(rename = "C")]
    C,
}

impl Grade {
    /// Get the string representation of the grade
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        }
    }

    /// Grade for an already rounded average
    pub fn for_average(avg: f64) -> Self {
        if avg >= 90.0 {
            Grade::APlus
        } else if avg >= 75.0 {
            Grade::A
        } else if avg >= 60.0 {
            Grade::B
        } else {
            Grade::C
        }
    }
}

impl FromStr for Grade {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "A+" => Ok(Grade::APlus),
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            _ => Err(Error::Validation(format!("Unknown grade: {}", s))),
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived values of a marks row
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradeSummary {
    pub avg: f64,
    pub grade: Grade,
}

/// Compute the average (2 decimals) and grade of five subject scores.
///
/// Non-finite scores count as 0.
pub fn compute_grade(tamil: f64, english: f64, maths: f64, science: f64, social: f64) -> GradeSummary {
    let sum: f64 = [tamil, english, maths, science, social]
        .into_iter()
        .map(|s| if s.is_finite() { s } else { 0.0 })
        .sum();
    let avg = round2(sum / SUBJECT_COUNT as f64);

    GradeSummary {
        avg,
        grade: Grade::for_average(avg),
    }
}

/// Round half away from zero to two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Coerce a loosely typed score to a finite number.
///
/// Numbers pass through, strings are parsed after trimming, booleans are
/// 1/0, everything else (including unparsable strings) is 0.
pub fn coerce_score(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() { 0.0 } else { s.parse::<f64>().unwrap_or(0.0) }
        }
        Value::Bool(b) => {
            if *b { 1.0 } else { 0.0 }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    };

    if n.is_finite() { n } else { 0.0 }
}

/// The five subject scores as they are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub tamil: i64,
    pub english: i64,
    pub maths: i64,
    pub science: i64,
    pub social: i64,
}

impl Scores {
    pub fn new(tamil: i64, english: i64, maths: i64, science: i64, social: i64) -> Self {
        Self { tamil, english, maths, science, social }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Average and grade of these scores
    pub fn summary(&self) -> GradeSummary {
        compute_grade(
            self.tamil as f64,
            self.english as f64,
            self.maths as f64,
            self.science as f64,
            self.social as f64,
        )
    }
}

/// Scores as they arrive from a caller: any JSON value per subject, absent
/// subjects default to null.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawScores {
    pub tamil: Value,
    pub english: Value,
    pub maths: Value,
    pub science: Value,
    pub social: Value,
}

impl RawScores {
    /// Coerce every subject and round to the nearest whole mark.
    ///
    /// Grading runs on the rounded marks, so a fractional input near a
    /// threshold can grade differently than its unrounded average would:
    /// `89.6, 90, 90, 90, 89.6` stores as all 90s and grades `A+`.
    pub fn coerce(&self) -> Scores {
        let whole = |v: &Value| coerce_score(v).round() as i64;
        Scores {
            tamil: whole(&self.tamil),
            english: whole(&self.english),
            maths: whole(&self.maths),
            science: whole(&self.science),
            social: whole(&self.social),
        }
    }
}

impl From<Scores> for RawScores {
    fn from(scores: Scores) -> Self {
        Self {
            tamil: Value::from(scores.tamil),
            english: Value::from(scores.english),
            maths: Value::from(scores.maths),
            science: Value::from(scores.science),
            social: Value::from(scores.social),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_average_and_grade() {
        let summary = compute_grade(85.0, 92.0, 88.0, 79.0, 90.0);
        assert_eq!(summary.avg, 86.8);
        assert_eq!(summary.grade, Grade::A);

        let summary = compute_grade(95.0, 91.0, 93.0, 89.0, 94.0);
        assert_eq!(summary.avg, 92.4);
        assert_eq!(summary.grade, Grade::APlus);
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(Grade::for_average(90.0), Grade::APlus);
        assert_eq!(Grade::for_average(89.99), Grade::A);
        assert_eq!(Grade::for_average(75.0), Grade::A);
        assert_eq!(Grade::for_average(74.99), Grade::B);
        assert_eq!(Grade::for_average(60.0), Grade::B);
        assert_eq!(Grade::for_average(59.99), Grade::C);
        assert_eq!(Grade::for_average(0.0), Grade::C);
    }

    #[test]
    fn test_non_finite_counts_as_zero() {
        let summary = compute_grade(f64::NAN, 100.0, 100.0, 100.0, 100.0);
        assert_eq!(summary.avg, 80.0);
        assert_eq!(summary.grade, Grade::A);

        let summary = compute_grade(f64::INFINITY, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(summary.avg, 0.0);
        assert_eq!(summary.grade, Grade::C);
    }

    #[test]
    fn test_rounds_to_two_decimals() {
        let summary = compute_grade(33.333, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(summary.avg, 6.67);
    }

    #[test]
    fn test_missing_score_coerces_to_zero() {
        let raw: RawScores = serde_json::from_value(json!({
            "english": 100, "maths": 100, "science": 100, "social": 100
        }))
        .unwrap();
        let scores = raw.coerce();
        assert_eq!(scores.tamil, 0);

        let summary = scores.summary();
        assert_eq!(summary.avg, 80.0);
        assert_eq!(summary.grade, Grade::A);
    }

    #[test]
    fn test_coerce_score_values() {
        assert_eq!(coerce_score(&json!(85)), 85.0);
        assert_eq!(coerce_score(&json!(" 72 ")), 72.0);
        assert_eq!(coerce_score(&json!("")), 0.0);
        assert_eq!(coerce_score(&json!("abc")), 0.0);
        assert_eq!(coerce_score(&json!("NaN")), 0.0);
        assert_eq!(coerce_score(&json!(true)), 1.0);
        assert_eq!(coerce_score(&json!(null)), 0.0);
        assert_eq!(coerce_score(&json!([1, 2])), 0.0);
    }

    #[test]
    fn test_raw_scores_round_to_whole_marks() {
        let raw: RawScores = serde_json::from_value(json!({
            "tamil": 84.6, "english": "91.2", "maths": 88, "science": 79, "social": 90
        }))
        .unwrap();
        assert_eq!(raw.coerce(), Scores::new(85, 91, 88, 79, 90));
    }

    #[test]
    fn test_fractional_scores_grade_on_whole_marks() {
        let raw: RawScores = serde_json::from_value(json!({
            "tamil": 89.6, "english": 90, "maths": 90, "science": 90, "social": 89.6
        }))
        .unwrap();
        let scores = raw.coerce();
        assert_eq!(scores, Scores::new(90, 90, 90, 90, 90));

        let summary = scores.summary();
        assert_eq!(summary, GradeSummary { avg: 90.0, grade: Grade::APlus });
    }

    #[test]
    fn test_grade_strings() {
        assert_eq!("a+".parse::<Grade>().unwrap(), Grade::APlus);
        assert_eq!(Grade::B.to_string(), "B");
        assert!("D".parse::<Grade>().is_err());
        assert_eq!(serde_json::to_value(Grade::APlus).unwrap(), json!("A+"));
    }
}
