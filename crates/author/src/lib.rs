//! Registrar authoring: reversible commands, undo/redo, and the service layer.
//!
//! # Invariants
//! - Every mutation of the store is a [`Command`] submitted through [`History`].
//! - Commands capture full before/after values at construction.
//! - Undo and redo follow strict stack order; a new submit clears redo.
//! - Removing a student or course removes its enrollments in the same command.

pub mod command;
pub mod error;
pub mod history;
pub mod queries;
pub mod service;

pub use command::{Command, Parent};
pub use error::{ErrorKind, RegistrarError, Result};
pub use history::History;
pub use queries::{CourseOrder, CoursePopularity, StudentGpa, StudentOrder, Transcript, TranscriptLine};
pub use service::{CoursePatch, Registrar, StudentPatch};
