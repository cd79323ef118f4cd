//! Revise Core Library
//!
//! Domain types, store ports, and the revision reconciliation engine for the
//! Revise practice tracker.

pub mod error;
pub mod memory;
pub mod ports;
pub mod reconcile;
pub mod title;
pub mod types;

pub use error::{Result, TrackerError};
pub use memory::MemoryStore;
pub use ports::{KeyValueStore, ProblemStore};
pub use reconcile::{RevisionRecorder, RevisionRequest, RECENT_SOLVED_CAP};
pub use title::derive_title;
pub use types::*;
