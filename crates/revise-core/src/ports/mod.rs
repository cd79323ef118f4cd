//! Store ports consumed by the reconciliation engine

pub mod kv;
pub mod problems;

pub use kv::KeyValueStore;
pub use problems::ProblemStore;
