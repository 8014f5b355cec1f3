//! SQLite storage implementation

use std::path::Path;
use rusqlite::{ffi, params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use crate::{Result, Error};
use crate::grading::{Grade, Scores};
use crate::model::{
    MarkSheetRow, Marks, Message, NewMessage, Parents, Student, StudentOverview, StudentPatch,
    STATUS_DELIVERED,
};
use super::schema;

/// How a keyed dependent row is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Plain insert; an existing row for the roll number is a conflict
    Insert,
    /// Replace whatever row exists for the roll number
    Upsert,
}

/// SQLite-backed storage for student records
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(schema::PRAGMAS)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Entity operations outside any explicit transaction (single statements)
    pub fn entities(&self) -> Entities<'_> {
        Entities { conn: &self.conn }
    }

    /// Run `f` as one unit of work.
    ///
    /// Commits when `f` returns `Ok`; any error rolls every statement back.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Entities<'_>) -> Result<T>,
    {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&Entities { conn: &tx })?;
        tx.commit()?;
        Ok(out)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let entities = self.entities();
        Ok(DbStats {
            students: entities.count("student")?,
            marks: entities.count("student_marks")?,
            parents: entities.count("parents")?,
            messages: entities.count("messenger")?,
        })
    }
}

/// Entity operations bound to a connection or an open transaction.
pub struct Entities<'c> {
    conn: &'c Connection,
}

impl Entities<'_> {
    // ========== Student Operations ==========

    /// Insert a new student. Fails with `Conflict` if the roll number exists.
    pub fn create_student(&self, student: &Student) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO student (rollno, name, class, section, dob, handlingfaculty)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    student.rollno,
                    student.name,
                    student.class,
                    student.section,
                    student.dob,
                    student.handlingfaculty,
                ],
            )
            .map_err(|e| classify(e, &student.rollno))?;
        Ok(())
    }

    pub fn student_exists(&self, rollno: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM student WHERE rollno = ?1", [rollno], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Get a student by roll number
    pub fn get_student(&self, rollno: &str) -> Result<Student> {
        self.conn
            .query_row(
                "SELECT rollno, name, class, section, dob, handlingfaculty FROM student WHERE rollno = ?1",
                [rollno],
                row_to_student,
            )
            .optional()?
            .ok_or_else(|| student_not_found(rollno))
    }

    /// All students left-joined with their marks, by roll number
    pub fn list_students(&self) -> Result<Vec<StudentOverview>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.rollno, s.name, s.class, s.section, s.dob, s.handlingfaculty,
                   m.rollno, m.tamil, m.english, m.maths, m.science, m.social, m.avg, m.grade
            FROM student s
            LEFT JOIN student_marks m ON m.rollno = s.rollno
            ORDER BY s.rollno ASC
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(StudentOverview {
                    student: row_to_student(row)?,
                    marks: row_to_joined_marks(row, 6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Marks sheet: identifying student columns with their marks
    pub fn list_mark_sheets(&self) -> Result<Vec<MarkSheetRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.rollno, s.name, s.class, s.section,
                   m.rollno, m.tamil, m.english, m.maths, m.science, m.social, m.avg, m.grade
            FROM student s
            LEFT JOIN student_marks m ON m.rollno = s.rollno
            ORDER BY s.rollno ASC
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(MarkSheetRow {
                    rollno: row.get(0)?,
                    name: row.get(1)?,
                    class: row.get(2)?,
                    section: row.get(3)?,
                    marks: row_to_joined_marks(row, 4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Update only the supplied fields of a student
    pub fn update_student_fields(&self, rollno: &str, patch: &StudentPatch) -> Result<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE student SET
                name = COALESCE(?1, name),
                class = COALESCE(?2, class),
                section = COALESCE(?3, section),
                dob = COALESCE(?4, dob),
                handlingfaculty = COALESCE(?5, handlingfaculty)
            WHERE rollno = ?6
            "#,
            params![
                patch.name,
                patch.class,
                patch.section,
                patch.dob,
                patch.handlingfaculty,
                rollno,
            ],
        )?;

        if changed == 0 {
            return Err(student_not_found(rollno));
        }
        Ok(())
    }

    /// Delete a student; marks, parents and messages go with it
    pub fn delete_student(&self, rollno: &str) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM student WHERE rollno = ?1", [rollno])?;
        if changed == 0 {
            return Err(student_not_found(rollno));
        }
        Ok(())
    }

    // ========== Marks Operations ==========

    /// Write a graded marks row
    pub fn put_marks(&self, marks: &Marks, mode: WriteMode) -> Result<()> {
        if mode == WriteMode::Upsert {
            self.conn.execute("DELETE FROM student_marks WHERE rollno = ?1", [&marks.rollno])?;
        }

        let s = marks.scores();
        self.conn
            .execute(
                r#"
                INSERT INTO student_marks (rollno, tamil, english, maths, science, social, avg, grade)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    marks.rollno,
                    s.tamil,
                    s.english,
                    s.maths,
                    s.science,
                    s.social,
                    marks.avg(),
                    marks.grade().as_str(),
                ],
            )
            .map_err(|e| classify(e, &marks.rollno))?;
        Ok(())
    }

    pub fn get_marks(&self, rollno: &str) -> Result<Option<Marks>> {
        self.conn
            .query_row(
                "SELECT rollno, tamil, english, maths, science, social, avg, grade FROM student_marks WHERE rollno = ?1",
                [rollno],
                |row| row_to_marks(row, 0),
            )
            .optional()
            .map_err(Into::into)
    }

    // ========== Parents Operations ==========

    pub fn put_parents(&self, parents: &Parents, mode: WriteMode) -> Result<()> {
        if mode == WriteMode::Upsert {
            self.conn.execute("DELETE FROM parents WHERE rollno = ?1", [&parents.rollno])?;
        }

        self.conn
            .execute(
                r#"
                INSERT INTO parents (rollno, parentsname, phonenumber, emailid, address)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    parents.rollno,
                    parents.parentsname,
                    parents.phonenumber,
                    parents.emailid,
                    parents.address,
                ],
            )
            .map_err(|e| classify(e, &parents.rollno))?;
        Ok(())
    }

    pub fn get_parents(&self, rollno: &str) -> Result<Option<Parents>> {
        self.conn
            .query_row(
                "SELECT rollno, parentsname, phonenumber, emailid, address FROM parents WHERE rollno = ?1",
                [rollno],
                |row| {
                    Ok(Parents {
                        rollno: row.get(0)?,
                        parentsname: row.get(1)?,
                        phonenumber: row.get(2)?,
                        emailid: row.get(3)?,
                        address: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    // ========== Messenger Operations ==========

    /// Append a message with status `delivered`, returning its id
    pub fn append_message(&self, message: &NewMessage, timestamp: &str) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO messenger (rollno, fromid, toid, content, status, phonenumber, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    message.rollno,
                    message.fromid,
                    message.toid,
                    message.content,
                    STATUS_DELIVERED,
                    message.phonenumber,
                    timestamp,
                ],
            )
            .map_err(|e| classify(e, &message.rollno))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Messages for a roll number, oldest first; ties keep insertion order
    pub fn list_messages(&self, rollno: &str) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, rollno, fromid, toid, content, status, phonenumber, timestamp
            FROM messenger
            WHERE rollno = ?1
            ORDER BY timestamp ASC, id ASC
            "#,
        )?;

        let messages = stmt
            .query_map([rollno], |row| {
                Ok(Message {
                    id: row.get(0)?,
                    rollno: row.get(1)?,
                    fromid: row.get(2)?,
                    toid: row.get(3)?,
                    content: row.get(4)?,
                    status: row.get(5)?,
                    phonenumber: row.get(6)?,
                    timestamp: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(messages)
    }

    /// Greatest timestamp in the log, if any
    pub fn latest_message_timestamp(&self) -> Result<Option<String>> {
        let latest: Option<String> =
            self.conn
                .query_row("SELECT MAX(timestamp) FROM messenger", [], |row| row.get(0))?;
        Ok(latest)
    }

    fn count(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Map constraint failures onto the error taxonomy
fn classify(err: rusqlite::Error, rollno: &str) -> Error {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                return Error::Conflict(format!("Record already exists for {}", rollno));
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return student_not_found(rollno),
            _ => {}
        }
    }
    Error::Storage(err)
}

fn student_not_found(rollno: &str) -> Error {
    Error::NotFound(format!("Student not found: {}", rollno))
}

fn row_to_student(row: &rusqlite::Row) -> rusqlite::Result<Student> {
    Ok(Student {
        rollno: row.get(0)?,
        name: row.get(1)?,
        class: row.get(2)?,
        section: row.get(3)?,
        dob: row.get(4)?,
        handlingfaculty: row.get(5)?,
    })
}

/// Read eight marks columns starting at `base` (rollno first)
fn row_to_marks(row: &rusqlite::Row, base: usize) -> rusqlite::Result<Marks> {
    let grade_str: String = row.get(base + 7)?;
    let grade: Grade = grade_str.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(base + 7, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Marks::restored(
        row.get(base)?,
        Scores::new(
            row.get(base + 1)?,
            row.get(base + 2)?,
            row.get(base + 3)?,
            row.get(base + 4)?,
            row.get(base + 5)?,
        ),
        row.get(base + 6)?,
        grade,
    ))
}

/// Marks columns of a LEFT JOIN; a NULL roll number means no row
fn row_to_joined_marks(row: &rusqlite::Row, base: usize) -> rusqlite::Result<Option<Marks>> {
    let rollno: Option<String> = row.get(base)?;
    match rollno {
        Some(_) => row_to_marks(row, base).map(Some),
        None => Ok(None),
    }
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub students: usize,
    pub marks: usize,
    pub parents: usize,
    pub messages: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Students: {}", self.students)?;
        writeln!(f, "  Marks: {}", self.marks)?;
        writeln!(f, "  Parents: {}", self.parents)?;
        writeln!(f, "  Messages: {}", self.messages)
    }
}
