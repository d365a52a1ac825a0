//! Developer tooling: read-only store inspection.
//!
//! # Invariants
//! - Tools never mutate the store.

pub mod inspector;

pub use inspector::{DanglingReference, EnrollmentInfo, StoreInspector, StoreSummary};
