//! Imports recently accepted submissions from LeetCode into the catalog

use crate::config::ServerConfig;
use crate::storage::Database;
use anyhow::{Context, Result};
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

const RECENT_SUBMISSION_LIMIT: u32 = 10;

const RECENT_AC_QUERY: &str = r#"
query recentAcSubmissions($username: String!, $limit: Int!) {
    recentAcSubmissionList(username: $username, limit: $limit) {
        title
        titleSlug
        timestamp
    }
}
"#;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub title: String,
    pub title_slug: String,
    pub timestamp: Option<String>,
}

impl Submission {
    pub fn problem_url(&self) -> String {
        format!("https://leetcode.com/problems/{}/", self.title_slug)
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<RecentAcData>,
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentAcData {
    recent_ac_submission_list: Option<Vec<Submission>>,
}

pub struct CatalogSync {
    db: Arc<Database>,
    http: ReqwestClient,
    endpoint: String,
    username: String,
}

impl CatalogSync {
    /// `None` unless a LeetCode username is configured
    pub fn from_config(db: Arc<Database>, config: &ServerConfig) -> Option<Self> {
        Some(Self {
            db,
            http: ReqwestClient::new(),
            endpoint: config.leetcode_graphql_url.clone(),
            username: config.leetcode_username.clone()?,
        })
    }

    pub async fn fetch_recent(&self) -> Result<Vec<Submission>> {
        let body = self
            .http
            .post(&self.endpoint)
            .header("Referer", "https://leetcode.com")
            .json(&json!({
                "query": RECENT_AC_QUERY,
                "variables": {
                    "username": self.username,
                    "limit": RECENT_SUBMISSION_LIMIT,
                },
            }))
            .send()
            .await
            .context("Failed to reach LeetCode")?
            .error_for_status()
            .context("LeetCode returned an error status")?
            .text()
            .await?;

        parse_submissions(&body)
    }

    /// Insert every recent submission not yet in the catalog; returns how
    /// many were added
    pub async fn run(&self) -> Result<usize> {
        let submissions = self.fetch_recent().await?;
        debug!("Fetched {} recent accepted submissions", submissions.len());

        let mut inserted = 0;
        for submission in &submissions {
            let url = submission.problem_url();
            if self.db.insert_problem_if_absent(&url).await? {
                info!("Imported {} ({})", submission.title, url);
                inserted += 1;
            }
        }

        Ok(inserted)
    }
}

fn parse_submissions(body: &str) -> Result<Vec<Submission>> {
    let response: GraphQlResponse =
        serde_json::from_str(body).context("Failed to parse LeetCode response")?;

    if let Some(errors) = response.errors {
        anyhow::bail!("GraphQL errors: {}", errors);
    }

    Ok(response
        .data
        .and_then(|d| d.recent_ac_submission_list)
        .unwrap_or_default())
}
