//! Database schema definitions

/// Connection-level pragmas; foreign keys are off by default in SQLite
pub const PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// SQL to create the student table
pub const CREATE_STUDENT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS student (
    rollno TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    class TEXT NOT NULL DEFAULT '',
    section TEXT NOT NULL DEFAULT '',
    dob TEXT NOT NULL DEFAULT '',
    handlingfaculty TEXT NOT NULL DEFAULT ''
)
"#;

/// SQL to create the marks table (1:1 with student)
pub const CREATE_MARKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS student_marks (
    rollno TEXT PRIMARY KEY,
    tamil INTEGER NOT NULL DEFAULT 0,
    english INTEGER NOT NULL DEFAULT 0,
    maths INTEGER NOT NULL DEFAULT 0,
    science INTEGER NOT NULL DEFAULT 0,
    social INTEGER NOT NULL DEFAULT 0,
    avg REAL NOT NULL DEFAULT 0,
    grade TEXT NOT NULL DEFAULT 'C',
    FOREIGN KEY (rollno) REFERENCES student(rollno) ON DELETE CASCADE
)
"#;

/// SQL to create the parents table (optional 1:1 with student)
pub const CREATE_PARENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS parents (
    rollno TEXT PRIMARY KEY,
    parentsname TEXT NOT NULL DEFAULT '',
    phonenumber TEXT NOT NULL DEFAULT '',
    emailid TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    FOREIGN KEY (rollno) REFERENCES student(rollno) ON DELETE CASCADE
)
"#;

/// SQL to create the messenger table (append-only log)
pub const CREATE_MESSENGER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS messenger (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rollno TEXT NOT NULL,
    fromid TEXT NOT NULL,
    toid TEXT NOT NULL,
    content TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'delivered',
    phonenumber TEXT,
    timestamp TEXT NOT NULL,
    FOREIGN KEY (rollno) REFERENCES student(rollno) ON DELETE CASCADE
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_messenger_rollno_ts ON messenger(rollno, timestamp, id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_STUDENT_TABLE,
        CREATE_MARKS_TABLE,
        CREATE_PARENTS_TABLE,
        CREATE_MESSENGER_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
