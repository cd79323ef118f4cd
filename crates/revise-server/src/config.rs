//! Server configuration loaded from the environment

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_LEETCODE_GRAPHQL_URL: &str = "https://leetcode.com/graphql";
pub const DEFAULT_EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub database_path: String,
    /// Redis connection URL; the in-memory store is used when unset
    pub redis_url: Option<String>,
    /// Shared secret for `?token=` protected endpoints
    pub secret_token: Option<String>,
    /// Bearer secret for the cron trigger
    pub cron_secret: Option<String>,
    /// Lifetime of the daily selection keys
    pub selection_ttl_secs: u64,

    pub leetcode_username: Option<String>,
    pub leetcode_graphql_url: String,

    pub emailjs_endpoint: String,
    pub emailjs_service_id: Option<String>,
    pub emailjs_template_id: Option<String>,
    pub emailjs_user_id: Option<String>,
    pub emailjs_private_key: Option<String>,
    pub notify_email: Option<String>,
}

impl ServerConfig {
    /// Load from process environment variables
    pub fn load() -> Result<Self> {
        Self::build(config::Environment::default())
    }

    /// Load from an explicit variable map instead of the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::build(config::Environment::default().source(Some(vars)))
    }

    fn build(env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("bind_address", "0.0.0.0:8080")?
            .set_default("database_path", "data/revise.db")?
            .set_default("selection_ttl_secs", 86_400_i64)?
            .set_default("leetcode_graphql_url", DEFAULT_LEETCODE_GRAPHQL_URL)?
            .set_default("emailjs_endpoint", DEFAULT_EMAILJS_ENDPOINT)?
            .add_source(env)
            .build()
            .context("Failed to read configuration")?;

        let config: ServerConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.warn_missing();
        Ok(config)
    }

    fn warn_missing(&self) {
        if self.secret_token.is_none() {
            warn!("SECRET_TOKEN not set, token-protected endpoints will reject every request");
        }
        if self.cron_secret.is_none() {
            warn!("CRON_SECRET not set, cron trigger is disabled");
        }
    }

    pub fn selection_ttl(&self) -> Duration {
        Duration::from_secs(self.selection_ttl_secs)
    }
}
