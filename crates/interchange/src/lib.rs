//! CSV interchange for the student and course tables.
//!
//! Files are plain RFC 4180 CSV with a header row:
//!
//! ```text
//! id,name,dob,email,phone
//! id,code,title,credits
//! ```
//!
//! Import is lenient about shape (short rows are skipped, blank ids get a
//! fresh id) and strict about values (a bad date or credit count fails the
//! whole file). Nothing here touches the store: callers receive plain
//! records and decide how to apply them.

mod reader;
mod writer;

pub use reader::{
    COURSE_COLUMNS, DEFAULT_CREDITS, STUDENT_COLUMNS, import_courses, import_students,
    read_courses, read_students,
};
pub use writer::{export_courses, export_students, write_courses, write_students};

/// Errors from CSV import and export.
#[derive(Debug, thiserror::Error)]
pub enum InterchangeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: invalid {field} {value:?}: {reason}")]
    InvalidField {
        line: u64,
        field: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, InterchangeError>;
