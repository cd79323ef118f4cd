//! Key-value store with TTLs and sorted sets

use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read several string keys at once; missing keys come back as `None`.
    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<String>>>;

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.mget(&[key]).await?.into_iter().next().flatten())
    }

    /// Remaining time-to-live. `None` when the key is missing, expired, or
    /// has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Write a string value. `None` makes the key persistent.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Remove keys of any type. Returns how many existed.
    async fn del(&self, keys: &[&str]) -> Result<u64>;

    /// Add or re-score a sorted-set member.
    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()>;

    async fn zcard(&self, key: &str) -> Result<u64>;

    /// Remove members by inclusive rank range, lowest score first. Negative
    /// ranks count from the end. Returns the number removed.
    async fn zremrangebyrank(&self, key: &str, start: i64, stop: i64) -> Result<u64>;

    /// Members by inclusive rank range, lowest score first.
    async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>>;
}
