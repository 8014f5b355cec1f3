//! # Rollbook - student records backend
//!
//! Rollbook keeps students, their marks, guardian contacts and a message log
//! in SQLite and guards the rules that tie them together.
//!
//! Rollbook provides:
//! - An entity store with foreign-key cascades rooted at the student
//! - A grading engine deriving average and letter grade from five scores
//! - A record service running compound writes as single transactions
//! - An append-only messaging log ordered by server-assigned timestamps
//! - An axum HTTP layer and a CLI over the same operations

pub mod grading;
pub mod model;
pub mod storage;
pub mod records;
pub mod messaging;
pub mod seed;
pub mod server;
pub mod output;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use grading::{Grade, GradeSummary, RawScores, Scores};
pub use model::{Marks, Message, NewStudent, Parents, ParentsInput, Student, StudentPatch, StudentRecord};
pub use storage::SqliteStore;
pub use records::RecordService;
pub use messaging::{MessageLog, SendMessage};

/// Result type alias for Rollbook operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds surfaced by every core operation.
///
/// Callers map these onto their own transport; a failed operation reports
/// exactly one kind and never leaves a compound write half applied.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed required input. Nothing was written.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced student does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate key on create.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other database failure; the enclosing transaction was rolled back.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::Storage(_) => "storage",
        }
    }
}
