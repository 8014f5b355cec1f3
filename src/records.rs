//! Record service - compound student writes
//!
//! Every operation that touches more than one table runs inside a single
//! store transaction, so a failure part way leaves nothing behind.

use crate::grading::{GradeSummary, RawScores, Scores};
use crate::model::{
    MarkSheetRow, Marks, NewStudent, ParentsInput, Student, StudentOverview, StudentPatch,
    StudentRecord,
};
use crate::storage::{SqliteStore, WriteMode};
use crate::{Error, Result};

/// Orchestrates student, marks and parents writes over a store
pub struct RecordService<'s> {
    store: &'s mut SqliteStore,
}

impl<'s> RecordService<'s> {
    pub fn new(store: &'s mut SqliteStore) -> Self {
        Self { store }
    }

    /// Create a student with zeroed marks and optional parents.
    pub fn create_student_record(
        &mut self,
        input: NewStudent,
        parents: Option<ParentsInput>,
    ) -> Result<()> {
        let rollno = required(input.rollno, "rollno")?;
        let name = required(input.name, "name")?;

        let student = Student {
            rollno,
            name,
            class: input.class.unwrap_or_default(),
            section: input.section.unwrap_or_default(),
            dob: input.dob.unwrap_or_default(),
            handlingfaculty: input.handlingfaculty.unwrap_or_default(),
        };

        self.store.transaction(|entities| {
            entities.create_student(&student)?;

            if entities.get_marks(&student.rollno)?.is_none() {
                entities.put_marks(&Marks::graded(&student.rollno, Scores::zero()), WriteMode::Insert)?;
            }

            if let Some(parents) = parents {
                entities.put_parents(&parents.into_parents(&student.rollno), WriteMode::Upsert)?;
            }
            Ok(())
        })?;

        tracing::info!(rollno = %student.rollno, "created student record");
        Ok(())
    }

    /// Student with its marks and parents
    pub fn get_student_record(&self, rollno: &str) -> Result<StudentRecord> {
        let entities = self.store.entities();
        let student = entities.get_student(rollno)?;
        Ok(StudentRecord {
            marks: entities.get_marks(rollno)?,
            parents: entities.get_parents(rollno)?,
            student,
        })
    }

    pub fn list_students(&self) -> Result<Vec<StudentOverview>> {
        self.store.entities().list_students()
    }

    pub fn list_mark_sheets(&self) -> Result<Vec<MarkSheetRow>> {
        self.store.entities().list_mark_sheets()
    }

    /// Apply a partial update and optionally replace the parents row.
    pub fn update_student_record(
        &mut self,
        rollno: &str,
        patch: StudentPatch,
        parents: Option<ParentsInput>,
    ) -> Result<()> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(Error::Validation("name must not be empty".to_string()));
        }

        self.store.transaction(|entities| {
            if !entities.student_exists(rollno)? {
                return Err(Error::NotFound(format!("Student not found: {}", rollno)));
            }
            if !patch.is_empty() {
                entities.update_student_fields(rollno, &patch)?;
            }
            if let Some(parents) = parents {
                entities.put_parents(&parents.into_parents(rollno), WriteMode::Upsert)?;
            }
            Ok(())
        })?;

        tracing::info!(rollno, "updated student record");
        Ok(())
    }

    /// Delete a student and everything it owns
    pub fn delete_student_record(&mut self, rollno: &str) -> Result<()> {
        self.store.transaction(|entities| entities.delete_student(rollno))?;
        tracing::info!(rollno, "deleted student record");
        Ok(())
    }

    /// Grade raw scores and replace the student's marks row.
    pub fn upsert_marks_record(&mut self, rollno: &str, raw: &RawScores) -> Result<GradeSummary> {
        if rollno.trim().is_empty() {
            return Err(Error::Validation("rollno is required".to_string()));
        }

        let marks = Marks::graded(rollno, raw.coerce());
        self.store.transaction(|entities| {
            if !entities.student_exists(rollno)? {
                return Err(Error::NotFound(format!("Student not found: {}", rollno)));
            }
            entities.put_marks(&marks, WriteMode::Upsert)
        })?;

        tracing::debug!(rollno, avg = marks.avg(), grade = %marks.grade(), "graded marks");
        Ok(marks.summary())
    }
}

/// A required text field: present and not blank
fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Validation(format!("{} is required", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::Grade;
    use crate::model::NewMessage;
    use serde_json::json;

    fn parents_input(name: &str) -> ParentsInput {
        ParentsInput {
            parentsname: Some(name.to_string()),
            phonenumber: Some("9876543210".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_initializes_zero_marks() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut service = RecordService::new(&mut store);

        service.create_student_record(NewStudent::new("S100", "Kavya"), None).unwrap();

        let record = service.get_student_record("S100").unwrap();
        assert_eq!(record.student.name, "Kavya");
        assert_eq!(record.student.class, "");
        assert!(record.parents.is_none());

        let marks = record.marks.unwrap();
        assert_eq!(*marks.scores(), Scores::zero());
        assert_eq!(marks.avg(), 0.0);
        assert_eq!(marks.grade(), Grade::C);
        assert_eq!(store.stats().unwrap().marks, 1);
    }

    #[test]
    fn test_create_with_parents() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut service = RecordService::new(&mut store);

        service
            .create_student_record(
                NewStudent::new("S001", "Arun").class("10").section("A"),
                Some(parents_input("Kumar Family")),
            )
            .unwrap();

        let parents = service.get_student_record("S001").unwrap().parents.unwrap();
        assert_eq!(parents.parentsname, "Kumar Family");
        assert_eq!(parents.emailid, "");
    }

    #[test]
    fn test_create_requires_rollno_and_name() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut service = RecordService::new(&mut store);

        let err = service
            .create_student_record(NewStudent { name: Some("X".into()), ..Default::default() }, None)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = service.create_student_record(NewStudent::new("S001", "  "), None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.stats().unwrap().students, 0);
    }

    #[test]
    fn test_duplicate_create_conflicts_without_mutation() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut service = RecordService::new(&mut store);

        service.create_student_record(NewStudent::new("S001", "Arun"), None).unwrap();
        let err = service
            .create_student_record(NewStudent::new("S001", "Impostor"), Some(parents_input("Other")))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let record = service.get_student_record("S001").unwrap();
        assert_eq!(record.student.name, "Arun");
        assert!(record.parents.is_none());
    }

    #[test]
    fn test_failed_step_rolls_back_whole_unit() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .entities()
            .create_student(&Student {
                rollno: "S001".into(),
                name: "Arun".into(),
                class: String::new(),
                section: String::new(),
                dob: String::new(),
                handlingfaculty: String::new(),
            })
            .unwrap();

        let result: Result<()> = store.transaction(|entities| {
            entities.create_student(&Student {
                rollno: "S002".into(),
                name: "Priya".into(),
                class: String::new(),
                section: String::new(),
                dob: String::new(),
                handlingfaculty: String::new(),
            })?;
            entities.put_marks(&Marks::graded("S002", Scores::zero()), WriteMode::Insert)?;
            entities.append_message(
                &NewMessage {
                    rollno: "S404".into(),
                    fromid: "a".into(),
                    toid: "b".into(),
                    content: "c".into(),
                    phonenumber: None,
                },
                "2026-01-01T00:00:00.000Z",
            )?;
            Ok(())
        });
        assert!(matches!(result, Err(Error::NotFound(_))));

        let stats = store.stats().unwrap();
        assert_eq!(stats.students, 1);
        assert_eq!(stats.marks, 0);
    }

    #[test]
    fn test_update_partial_and_parents() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut service = RecordService::new(&mut store);
        service
            .create_student_record(
                NewStudent::new("S001", "Arun")
                    .class("10")
                    .section("A")
                    .dob("2010-05-12")
                    .handlingfaculty("Mrs. Lakshmi"),
                Some(parents_input("Kumar Family")),
            )
            .unwrap();

        let patch = StudentPatch {
            section: Some("B".to_string()),
            ..Default::default()
        };
        service
            .update_student_record("S001", patch, Some(parents_input("Kumar Household")))
            .unwrap();

        let record = service.get_student_record("S001").unwrap();
        assert_eq!(record.student.section, "B");
        assert_eq!(record.student.name, "Arun");
        assert_eq!(record.student.class, "10");
        assert_eq!(record.student.dob, "2010-05-12");
        assert_eq!(record.student.handlingfaculty, "Mrs. Lakshmi");
        assert_eq!(record.parents.unwrap().parentsname, "Kumar Household");
    }

    #[test]
    fn test_update_missing_student() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut service = RecordService::new(&mut store);

        let err = service
            .update_student_record("S404", StudentPatch::default(), Some(parents_input("X")))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        service.create_student_record(NewStudent::new("S001", "Arun"), None).unwrap();
        let blank = StudentPatch {
            name: Some(String::new()),
            ..Default::default()
        };
        let err = service.update_student_record("S001", blank, None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_upsert_marks_grades_and_replaces() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut service = RecordService::new(&mut store);
        service.create_student_record(NewStudent::new("S001", "Arun"), None).unwrap();

        let raw: RawScores = serde_json::from_value(json!({
            "tamil": 85, "english": "92", "maths": 88, "science": 79, "social": 90
        }))
        .unwrap();
        let summary = service.upsert_marks_record("S001", &raw).unwrap();
        assert_eq!(summary.avg, 86.8);
        assert_eq!(summary.grade, Grade::A);

        let raw: RawScores = serde_json::from_value(json!({
            "tamil": null, "english": 100, "maths": 100, "science": 100, "social": 100
        }))
        .unwrap();
        let summary = service.upsert_marks_record("S001", &raw).unwrap();
        assert_eq!(summary.avg, 80.0);

        let marks = service.get_student_record("S001").unwrap().marks.unwrap();
        assert_eq!(*marks.scores(), Scores::new(0, 100, 100, 100, 100));
        assert_eq!(marks.grade(), Grade::A);
    }

    #[test]
    fn test_upsert_marks_unknown_student() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut service = RecordService::new(&mut store);

        let err = service
            .upsert_marks_record("S404", &RawScores::from(Scores::new(90, 90, 90, 90, 90)))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = service.upsert_marks_record("", &RawScores::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.stats().unwrap().marks, 0);
    }

    #[test]
    fn test_delete_removes_dependents() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut service = RecordService::new(&mut store);
        service
            .create_student_record(NewStudent::new("S001", "Arun"), Some(parents_input("Kumar")))
            .unwrap();

        service.delete_student_record("S001").unwrap();
        assert!(matches!(service.get_student_record("S001"), Err(Error::NotFound(_))));
        assert!(matches!(service.delete_student_record("S001"), Err(Error::NotFound(_))));

        let stats = store.stats().unwrap();
        assert_eq!(stats.students + stats.marks + stats.parents, 0);
    }
}
