//! Shared value types for the registrar.
//!
//! # Invariants
//! - Student, course and enrollment ids live in separate typed spaces.
//! - An id is fixed at construction; only descriptive fields are mutable.

mod grade;
mod ids;
mod types;

pub use grade::{Grade, ParseGradeError};
pub use ids::{CourseId, EnrollmentId, StudentId};
pub use types::{Course, Enrollment, MAX_CREDITS, MIN_CREDITS, Student};
