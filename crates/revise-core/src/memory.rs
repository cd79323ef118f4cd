//! In-memory key-value store using DashMap (stands in for Redis)

use crate::ports::KeyValueStore;
use crate::{Result, TrackerError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// In-memory store with per-key TTL and sorted sets
pub struct MemoryStore {
    data: Arc<DashMap<String, StoreEntry>>,
}

struct StoreEntry {
    value: StoreValue,
    expires_at: Option<Instant>,
}

enum StoreValue {
    Text(String),
    /// Kept sorted by (score, member)
    Sorted(Vec<(f64, String)>),
}

impl StoreEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|expires| now >= expires).unwrap_or(false)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = Self {
            data: Arc::new(DashMap::new()),
        };

        // Start cleanup task
        store.start_cleanup_task();

        store
    }

    /// Drop the key if its TTL has passed
    fn evict_if_expired(&self, key: &str) {
        let now = Instant::now();
        self.data.remove_if(key, |_, entry| entry.is_expired(now));
    }

    fn start_cleanup_task(&self) {
        // Without a runtime (plain unit tests) expiry is still enforced lazily
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let data = Arc::downgrade(&self.data);
        handle.spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;

                let Some(data) = data.upgrade() else {
                    break;
                };
                let now = Instant::now();
                data.retain(|_, entry| !entry.is_expired(now));
            }
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn wrong_type(key: &str) -> TrackerError {
    TrackerError::Cache(format!(
        "WRONGTYPE operation against key holding the wrong kind of value: {}",
        key
    ))
}

/// Resolve an inclusive Redis-style rank range against `len` members.
fn rank_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        Ok(keys
            .iter()
            .map(|key| {
                self.evict_if_expired(key);
                self.data.get(*key).and_then(|entry| match &entry.value {
                    StoreValue::Text(v) => Some(v.clone()),
                    StoreValue::Sorted(_) => None,
                })
            })
            .collect())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.evict_if_expired(key);
        let now = Instant::now();
        Ok(self.data.get(key).and_then(|entry| {
            entry
                .expires_at
                .map(|expires| expires.saturating_duration_since(now))
                .filter(|remaining| !remaining.is_zero())
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.data.insert(
            key.to_string(),
            StoreEntry {
                value: StoreValue::Text(value.to_string()),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn del(&self, keys: &[&str]) -> Result<u64> {
        let removed = keys
            .iter()
            .filter(|key| {
                self.evict_if_expired(key);
                self.data.remove(**key).is_some()
            })
            .count();
        Ok(removed as u64)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()> {
        self.evict_if_expired(key);
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| StoreEntry {
                value: StoreValue::Sorted(Vec::new()),
                expires_at: None,
            });

        let StoreValue::Sorted(members) = &mut entry.value else {
            return Err(wrong_type(key));
        };

        members.retain(|(_, m)| m != member);
        let pos = members.partition_point(|(s, m)| {
            s.total_cmp(&score).then_with(|| m.as_str().cmp(member)).is_lt()
        });
        members.insert(pos, (score, member.to_string()));
        Ok(())
    }

    async fn zcard(&self, key: &str) -> Result<u64> {
        self.evict_if_expired(key);
        match self.data.get(key) {
            None => Ok(0),
            Some(entry) => match &entry.value {
                StoreValue::Sorted(members) => Ok(members.len() as u64),
                StoreValue::Text(_) => Err(wrong_type(key)),
            },
        }
    }

    async fn zremrangebyrank(&self, key: &str, start: i64, stop: i64) -> Result<u64> {
        self.evict_if_expired(key);
        let Some(mut entry) = self.data.get_mut(key) else {
            return Ok(0);
        };
        let StoreValue::Sorted(members) = &mut entry.value else {
            return Err(wrong_type(key));
        };

        let Some((from, to)) = rank_range(members.len(), start, stop) else {
            return Ok(0);
        };
        let removed = members.drain(from..=to).count() as u64;
        let now_empty = members.is_empty();
        drop(entry);

        if now_empty {
            self.data.remove(key);
        }
        Ok(removed)
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        self.evict_if_expired(key);
        let Some(entry) = self.data.get(key) else {
            return Ok(Vec::new());
        };
        let StoreValue::Sorted(members) = &entry.value else {
            return Err(wrong_type(key));
        };

        Ok(rank_range(members.len(), start, stop)
            .map(|(from, to)| members[from..=to].iter().map(|(_, m)| m.clone()).collect())
            .unwrap_or_default())
    }
}
