//! Daily selection job
//!
//! Picks the next two problems to revise, publishes them to the key-value
//! store for the day, emails them, and imports newly solved problems.

use crate::services::{CatalogSync, EmailNotifier};
use crate::storage::Database;
use anyhow::Result;
use revise_core::{keys, KeyValueStore, SelectedProblem};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const PICKS_PER_DAY: i64 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct SelectionOutcome {
    pub questions: Vec<SelectedProblem>,
    /// Problems added to the catalog by the upstream import
    pub imported: usize,
}

pub struct SelectionJob {
    db: Arc<Database>,
    cache: Arc<dyn KeyValueStore>,
    ttl: Duration,
    notifier: Option<EmailNotifier>,
    catalog_sync: Option<CatalogSync>,
}

impl SelectionJob {
    pub fn new(db: Arc<Database>, cache: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            db,
            cache,
            ttl,
            notifier: None,
            catalog_sync: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Option<EmailNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_catalog_sync(mut self, catalog_sync: Option<CatalogSync>) -> Self {
        self.catalog_sync = catalog_sync;
        self
    }

    pub async fn run(&self) -> Result<SelectionOutcome> {
        let questions: Vec<SelectedProblem> = self
            .db
            .select_least_revised(PICKS_PER_DAY)
            .await?
            .into_iter()
            .map(SelectedProblem::from)
            .collect();
        info!(
            "Selected problems: {:?}",
            questions.iter().map(|q| q.id).collect::<Vec<_>>()
        );

        let ids: Vec<_> = questions.iter().map(|q| q.id).collect();
        self.db.mark_sent(&ids).await?;
        self.publish(&questions).await?;

        match (&self.notifier, questions.as_slice()) {
            (Some(notifier), [first, second, ..]) => notifier.send(first, second).await?,
            (Some(_), _) => warn!("Not enough questions to send ({})", questions.len()),
            (None, _) => info!("Email notifier not configured, skipping email"),
        }

        let imported = match &self.catalog_sync {
            Some(sync) => sync.run().await?,
            None => 0,
        };

        Ok(SelectionOutcome {
            questions,
            imported,
        })
    }

    /// Write today's picks with a fresh TTL and clear both solved flags.
    /// A slot without a pick is emptied so no earlier selection survives.
    async fn publish(&self, questions: &[SelectedProblem]) -> Result<()> {
        let slots = [
            (
                keys::FIRST_QUESTION_ID,
                keys::FIRST_QUESTION_URL,
                keys::FIRST_QUESTION_SOLVED,
            ),
            (
                keys::SECOND_QUESTION_ID,
                keys::SECOND_QUESTION_URL,
                keys::SECOND_QUESTION_SOLVED,
            ),
        ];

        for (i, (id_key, url_key, solved_key)) in slots.iter().enumerate() {
            match questions.get(i) {
                Some(question) => {
                    let ttl = Some(self.ttl);
                    self.cache.set(id_key, &question.id.to_string(), ttl).await?;
                    self.cache.set(url_key, &question.url, ttl).await?;
                    self.cache.set(solved_key, "false", ttl).await?;
                }
                None => {
                    self.cache.del(&[*id_key, *url_key, *solved_key]).await?;
                }
            }
        }

        Ok(())
    }
}
