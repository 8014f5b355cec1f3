//! Entity types
//!
//! `Student` is the aggregate root. `Marks`, `Parents` and `Message` rows are
//! keyed by the student's roll number and never outlive it.

use crate::grading::{Grade, GradeSummary, Scores};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Status every accepted message is stored with
pub const STATUS_DELIVERED: &str = "delivered";

/// Read a text field that callers may send as a JSON string or number.
///
/// Null and absent read as `None`; booleans, arrays and objects are rejected.
pub fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

/// A student row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Roll number, unique and immutable once assigned
    pub rollno: String,
    pub name: String,
    /// Class label, e.g. "10"
    pub class: String,
    pub section: String,
    /// Date of birth as entered by the caller
    #[serde(rename = "DOB")]
    pub dob: String,
    pub handlingfaculty: String,
}

/// Input for creating a student. Only `rollno` and `name` are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStudent {
    #[serde(default, deserialize_with = "lenient_text")]
    pub rollno: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub class: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub section: Option<String>,
    #[serde(default, rename = "DOB", deserialize_with = "lenient_text")]
    pub dob: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub handlingfaculty: Option<String>,
}

impl NewStudent {
    pub fn new(rollno: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            rollno: Some(rollno.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn dob(mut self, dob: impl Into<String>) -> Self {
        self.dob = Some(dob.into());
        self
    }

    pub fn handlingfaculty(mut self, faculty: impl Into<String>) -> Self {
        self.handlingfaculty = Some(faculty.into());
        self
    }
}

/// Partial update of a student. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StudentPatch {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub class: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub section: Option<String>,
    #[serde(default, rename = "DOB", deserialize_with = "lenient_text")]
    pub dob: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub handlingfaculty: Option<String>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.class.is_none()
            && self.section.is_none()
            && self.dob.is_none()
            && self.handlingfaculty.is_none()
    }
}

/// A marks row. Scores, average and grade are fixed together by
/// [`Marks::graded`] and are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marks {
    pub rollno: String,
    #[serde(flatten)]
    scores: Scores,
    avg: f64,
    grade: Grade,
}

impl Marks {
    /// Build a marks row, deriving average and grade from `scores`
    pub fn graded(rollno: impl Into<String>, scores: Scores) -> Self {
        let GradeSummary { avg, grade } = scores.summary();
        Self {
            rollno: rollno.into(),
            scores,
            avg,
            grade,
        }
    }

    /// Rebuild a row read back from storage
    pub(crate) fn restored(rollno: String, scores: Scores, avg: f64, grade: Grade) -> Self {
        Self { rollno, scores, avg, grade }
    }

    pub fn scores(&self) -> &Scores {
        &self.scores
    }

    pub fn avg(&self) -> f64 {
        self.avg
    }

    pub fn grade(&self) -> Grade {
        self.grade
    }

    pub fn summary(&self) -> GradeSummary {
        GradeSummary {
            avg: self.avg,
            grade: self.grade,
        }
    }
}

/// Guardian contact row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parents {
    pub rollno: String,
    pub parentsname: String,
    pub phonenumber: String,
    pub emailid: String,
    pub address: String,
}

/// Guardian fields as supplied by a caller; absent fields store as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ParentsInput {
    #[serde(default, deserialize_with = "lenient_text")]
    pub parentsname: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phonenumber: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub emailid: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: Option<String>,
}

impl ParentsInput {
    pub fn into_parents(self, rollno: &str) -> Parents {
        Parents {
            rollno: rollno.to_string(),
            parentsname: self.parentsname.unwrap_or_default(),
            phonenumber: self.phonenumber.unwrap_or_default(),
            emailid: self.emailid.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
        }
    }
}

/// A stored message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: i64,
    pub rollno: String,
    pub fromid: String,
    pub toid: String,
    pub content: String,
    pub status: String,
    pub phonenumber: Option<String>,
    /// ISO-8601 UTC, server assigned
    pub timestamp: String,
}

/// Message fields validated and ready to append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub rollno: String,
    pub fromid: String,
    pub toid: String,
    pub content: String,
    pub phonenumber: Option<String>,
}

/// A student with its dependent rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub student: Student,
    pub marks: Option<Marks>,
    pub parents: Option<Parents>,
}

/// Listing row: a student left-joined with its marks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentOverview {
    #[serde(flatten)]
    pub student: Student,
    pub marks: Option<Marks>,
}

/// Listing row for the marks sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkSheetRow {
    pub rollno: String,
    pub name: String,
    pub class: String,
    pub section: String,
    pub marks: Option<Marks>,
}
