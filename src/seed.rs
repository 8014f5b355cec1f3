//! Sample data for empty databases

use crate::grading::Scores;
use crate::model::{Marks, Parents, Student};
use crate::storage::{SqliteStore, WriteMode};
use crate::Result;

struct SampleStudent {
    rollno: &'static str,
    name: &'static str,
    class: &'static str,
    section: &'static str,
    dob: &'static str,
    faculty: &'static str,
    scores: Scores,
    parents: [&'static str; 4],
}

const SAMPLES: &[SampleStudent] = &[
    SampleStudent {
        rollno: "S001",
        name: "Arun Kumar",
        class: "10",
        section: "A",
        dob: "2010-05-12",
        faculty: "Mrs. Lakshmi",
        scores: Scores { tamil: 85, english: 92, maths: 88, science: 79, social: 90 },
        parents: ["Kumar Family", "9876543210", "kumar.parent@example.com", "12 Gandhi St, Chennai"],
    },
    SampleStudent {
        rollno: "S002",
        name: "Priya Sharma",
        class: "10",
        section: "B",
        dob: "2010-08-20",
        faculty: "Mr. Rajesh",
        scores: Scores { tamil: 95, english: 91, maths: 93, science: 89, social: 94 },
        parents: ["Sharma Family", "9876501234", "sharma.parent@example.com", "34 Anna Nagar, Chennai"],
    },
];

/// Insert the sample students if the store has none.
///
/// All samples go in under one transaction: either every sample row is
/// written or none is. Returns whether anything was inserted.
pub fn seed_sample_data(store: &mut SqliteStore) -> Result<bool> {
    let seeded = store.transaction(|entities| {
        if !entities.list_students()?.is_empty() {
            return Ok(false);
        }

        for sample in SAMPLES {
            let [parentsname, phonenumber, emailid, address] = sample.parents;
            entities.create_student(&Student {
                rollno: sample.rollno.to_string(),
                name: sample.name.to_string(),
                class: sample.class.to_string(),
                section: sample.section.to_string(),
                dob: sample.dob.to_string(),
                handlingfaculty: sample.faculty.to_string(),
            })?;
            entities.put_marks(&Marks::graded(sample.rollno, sample.scores), WriteMode::Insert)?;
            entities.put_parents(
                &Parents {
                    rollno: sample.rollno.to_string(),
                    parentsname: parentsname.to_string(),
                    phonenumber: phonenumber.to_string(),
                    emailid: emailid.to_string(),
                    address: address.to_string(),
                },
                WriteMode::Insert,
            )?;
        }
        Ok(true)
    })?;

    if seeded {
        tracing::info!(count = SAMPLES.len(), "seeded sample students");
    } else {
        tracing::debug!("store already has students, skipping sample data");
    }
    Ok(seeded)
}
