use registrar_common::{CourseId, StudentId};
use registrar_interchange::InterchangeError;
use registrar_kernel::Record;
use registrar_persist::PersistError;
use thiserror::Error;

/// Result type alias using [`RegistrarError`].
pub type Result<T> = std::result::Result<T, RegistrarError>;

/// Coarse classification of a [`RegistrarError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Io,
}

/// Errors returned by the registrar service. None of them leave the store
/// partially mutated: every check runs before a command is built.
#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("{kind} #{id} not found")]
    NotFound { kind: &'static str, id: u32 },

    #[error("student #{student} is already enrolled in course #{course}")]
    DuplicateEnrollment { student: StudentId, course: CourseId },

    #[error("conflict: {reason}")]
    Conflict { reason: String },

    #[error("no {kind} ids left to assign")]
    IdsExhausted { kind: &'static str },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("CSV error: {0}")]
    Interchange(#[from] InterchangeError),

    #[error("snapshot error: {0}")]
    Persist(#[from] PersistError),
}

impl RegistrarError {
    /// Classify the error for callers that only branch on its kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateEnrollment { .. } | Self::Conflict { .. } | Self::IdsExhausted { .. } => {
                ErrorKind::Conflict
            }
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Interchange(InterchangeError::InvalidField { .. }) => ErrorKind::Validation,
            Self::Interchange(_) | Self::Persist(_) => ErrorKind::Io,
        }
    }

    /// A missing record of kind `R`.
    pub fn not_found<R: Record>(id: R::Id) -> Self {
        Self::NotFound {
            kind: R::KIND,
            id: id.into(),
        }
    }

    pub(crate) fn ids_exhausted<R: Record>() -> Self {
        Self::IdsExhausted { kind: R::KIND }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}
