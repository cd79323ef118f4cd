//! Request extractors

pub mod token;

pub use token::{CronSecret, SecretToken};
