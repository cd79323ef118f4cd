//! Storage layer
//!
//! SQLite (embedded) holds the problem catalog and revision counts.
//! Redis holds the daily selection and recently-solved list, with the
//! in-memory store from `revise-core` standing in when no Redis is configured.

pub mod db;
pub mod cache;

pub use db::Database;
pub use cache::RedisStore;
