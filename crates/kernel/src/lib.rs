//! Registrar kernel: the authoritative in-memory entity store.
//!
//! # Invariants
//! - The store is a passive container. Integrity checks live with the single
//!   writer (the service layer); the store never validates foreign keys.
//! - Each table preserves insertion order; replace keeps a record's position.
//! - Id allocators only move forward.

pub mod allocator;
pub mod store;
pub mod table;

pub use allocator::{IdAllocator, MAX_ID};
pub use store::{EntityStore, NextIds, Record};
pub use table::Table;
