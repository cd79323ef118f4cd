//! Read-only dashboard and today views

use crate::storage::db::{DistributionBucket, RevisionMetrics};
use crate::storage::Database;
use anyhow::Result;
use revise_core::{derive_title, keys, DailySelection, KeyValueStore, Problem, RecentSolved};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

const TOP_LIMIT: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct TopProblem {
    pub id: i64,
    pub url: String,
    pub numberofrevision: i64,
    pub title: String,
}

impl From<Problem> for TopProblem {
    fn from(p: Problem) -> Self {
        Self {
            title: derive_title(&p.url, p.id),
            id: p.id,
            url: p.url,
            numberofrevision: p.revision_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub questions: Vec<Problem>,
    pub metrics: RevisionMetrics,
    pub top5: Vec<TopProblem>,
    pub revision_distribution: Vec<DistributionBucket>,
    /// Newest first
    pub recent_solved: Vec<RecentSolved>,
}

pub struct DashboardService {
    db: Arc<Database>,
    cache: Arc<dyn KeyValueStore>,
}

impl DashboardService {
    pub fn new(db: Arc<Database>, cache: Arc<dyn KeyValueStore>) -> Self {
        Self { db, cache }
    }

    pub async fn dashboard(&self) -> Result<DashboardView> {
        let questions = self.db.list_problems().await?;
        let metrics = self.db.revision_metrics().await?;
        let top5 = self
            .db
            .top_by_revisions(TOP_LIMIT)
            .await?
            .into_iter()
            .map(TopProblem::from)
            .collect();
        let revision_distribution = self.db.revision_distribution().await?;
        let recent_solved = self.recent_solved().await;

        Ok(DashboardView {
            questions,
            metrics,
            top5,
            revision_distribution,
            recent_solved,
        })
    }

    /// Today's selection straight from the key-value store
    pub async fn today(&self) -> revise_core::Result<DailySelection> {
        let values = self.cache.mget(&keys::DAILY_SELECTION).await?;
        Ok(DailySelection::from_values(values))
    }

    /// Best-effort read of the recently-solved list; the cache is only a view
    async fn recent_solved(&self) -> Vec<RecentSolved> {
        let members = match self.cache.zrange(keys::RECENT_SOLVED, 0, -1).await {
            Ok(members) => members,
            Err(e) => {
                warn!("Failed to read recently solved list: {}", e);
                return Vec::new();
            }
        };

        members
            .iter()
            .rev()
            .filter_map(|m| match serde_json::from_str(m) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping malformed recently solved entry: {}", e);
                    None
                }
            })
            .collect()
    }
}
