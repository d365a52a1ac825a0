//! Persistence: point-in-time binary snapshots of the whole store.
//!
//! # Invariants
//! - The on-disk image types are owned here and mapped to and from the
//!   kernel types, so the in-memory model can change without touching the
//!   file format.
//! - Every file carries a schema version and a SHA-256 of its payload.
//! - Loading for startup never fails: a missing or damaged file yields an
//!   empty store and a warning.

mod file;
mod snapshot;

pub use file::{
    PersistError, SNAPSHOT_MAGIC, SNAPSHOT_SCHEMA_VERSION, decode, encode, load, load_or_fresh,
    save,
};
pub use snapshot::{CourseRow, EnrollmentRow, NextIdsRow, StoreImage, StudentRow};
