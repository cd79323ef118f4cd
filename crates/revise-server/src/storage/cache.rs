//! Redis-backed key-value store

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use revise_core::{KeyValueStore, Result, TrackerError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

/// Key-value store on a shared Redis connection.
///
/// The connection is opened on first use and reused for the life of the
/// process; concurrent first callers wait on the same connect.
pub struct RedisStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
}

impl RedisStore {
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(redis_error)?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                info!("Connecting to Redis...");
                ConnectionManager::new(self.client.clone()).await
            })
            .await
            .map_err(redis_error)?;
        Ok(conn.clone())
    }
}

fn redis_error(e: redis::RedisError) -> TrackerError {
    TrackerError::Cache(e.to_string())
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        redis::cmd("MGET")
            .arg(keys)
            .query_async::<_, Vec<Option<String>>>(&mut conn)
            .await
            .map_err(redis_error)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.connection().await?;
        // -2 missing, -1 no expiry
        let millis: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        Ok((millis > 0).then(|| Duration::from_millis(millis as u64)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }
        cmd.query_async::<_, ()>(&mut conn)
            .await
            .map_err(redis_error)
    }

    async fn del(&self, keys: &[&str]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(redis_error)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("ZADD")
            .arg(key)
            .arg(score)
            .arg(member)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(redis_error)
    }

    async fn zcard(&self, key: &str) -> Result<u64> {
        let mut conn = self.connection().await?;
        redis::cmd("ZCARD")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(redis_error)
    }

    async fn zremrangebyrank(&self, key: &str, start: i64, stop: i64) -> Result<u64> {
        let mut conn = self.connection().await?;
        redis::cmd("ZREMRANGEBYRANK")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await
            .map_err(redis_error)
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        redis::cmd("ZRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await
            .map_err(redis_error)
    }
}
