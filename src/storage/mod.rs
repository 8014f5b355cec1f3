//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - student(rollno, name, class, section, dob, handlingfaculty)
//! - student_marks(rollno, tamil, english, maths, science, social, avg, grade)
//! - parents(rollno, parentsname, phonenumber, emailid, address)
//! - messenger(id, rollno, fromid, toid, content, status, phonenumber, timestamp)
//!
//! Every dependent table references `student(rollno)` with `ON DELETE CASCADE`.

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, Entities, SqliteStore, WriteMode};
