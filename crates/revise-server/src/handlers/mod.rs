//! HTTP handlers

pub mod dashboard;
pub mod health;
pub mod revisions;
pub mod selection;

pub use health::health;
