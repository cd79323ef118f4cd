//! SQLite database layer (embedded, no external dependencies)

use anyhow::{Context, Result};
use async_trait::async_trait;
use revise_core::{Problem, ProblemId, ProblemStore, TrackerError};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

pub struct Database {
    pool: Arc<SqlitePool>,
}

/// Aggregate revision metrics for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionMetrics {
    pub total: i64,
    pub average_revisions: f64,
    pub never_revised: i64,
    pub needing_practice: i64,
    pub well_practiced: i64,
    pub practiced: i64,
    pub mastered: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DistributionBucket {
    pub bucket: String,
    pub count: i64,
}

impl Database {
    pub async fn new(database_path: &str) -> Result<Self> {
        tracing::info!("Opening SQLite database at: {}", database_path);

        // Create parent directory if needed
        if let Some(parent) = std::path::Path::new(database_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to SQLite database at: {}", database_path)
            })?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database on a single connection
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        tracing::info!("SQLite connection established, running migrations...");

        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database initialization complete");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT UNIQUE NOT NULL,
                numberofrevision INTEGER NOT NULL DEFAULT 0,
                last_sent_date DATETIME
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    // Catalog operations
    /// Insert a problem with zero revisions unless its url is already known.
    /// Returns whether a row was added.
    pub async fn insert_problem_if_absent(&self, url: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO questions (url, numberofrevision, last_sent_date)
            VALUES (?1, 0, NULL)
            "#,
        )
        .bind(url)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_problem(&self, id: ProblemId) -> Result<Option<Problem>> {
        let row: Option<ProblemRow> = sqlx::query_as(
            r#"
            SELECT id, url, numberofrevision FROM questions WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    pub async fn list_problems(&self) -> Result<Vec<Problem>> {
        let rows: Vec<ProblemRow> = sqlx::query_as(
            r#"
            SELECT id, url, numberofrevision FROM questions ORDER BY id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Random problems among those with the fewest revisions
    pub async fn select_least_revised(&self, limit: i64) -> Result<Vec<Problem>> {
        let rows: Vec<ProblemRow> = sqlx::query_as(
            r#"
            SELECT id, url, numberofrevision
            FROM questions
            WHERE numberofrevision = (
                SELECT MIN(numberofrevision) FROM questions
            )
            ORDER BY RANDOM()
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    pub async fn mark_sent(&self, ids: &[ProblemId]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query(
                r#"
                UPDATE questions SET last_sent_date = datetime('now') WHERE id = ?1
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Increment revision counters in one transaction; returns rows touched
    pub async fn increment_revision_counts(&self, ids: &[ProblemId]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let touched = match ids {
            [] => 0,
            [id] => sqlx::query(
                r#"
                UPDATE questions SET numberofrevision = numberofrevision + 1
                WHERE id = ?1
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected(),
            [first, second] => sqlx::query(
                r#"
                UPDATE questions SET numberofrevision = numberofrevision + 1
                WHERE id = ?1 OR id = ?2
                "#,
            )
            .bind(first)
            .bind(second)
            .execute(&mut *tx)
            .await?
            .rows_affected(),
            many => {
                let mut touched = 0;
                for id in many {
                    touched += sqlx::query(
                        r#"
                        UPDATE questions SET numberofrevision = numberofrevision + 1
                        WHERE id = ?1
                        "#,
                    )
                    .bind(id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
                }
                touched
            }
        };

        tx.commit().await?;
        Ok(touched)
    }

    // Dashboard aggregates
    pub async fn revision_metrics(&self) -> Result<RevisionMetrics> {
        let row: MetricsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                AVG(numberofrevision) AS avg_rev,
                COALESCE(SUM(CASE WHEN numberofrevision = 0 THEN 1 ELSE 0 END), 0)
                    AS never_revised,
                COALESCE(SUM(CASE WHEN numberofrevision BETWEEN 1 AND 2 THEN 1 ELSE 0 END), 0)
                    AS needing_practice,
                COALESCE(SUM(CASE WHEN numberofrevision >= 3 THEN 1 ELSE 0 END), 0)
                    AS well_practiced,
                COALESCE(SUM(CASE WHEN numberofrevision BETWEEN 3 AND 4 THEN 1 ELSE 0 END), 0)
                    AS practiced,
                COALESCE(SUM(CASE WHEN numberofrevision >= 5 THEN 1 ELSE 0 END), 0)
                    AS mastered
            FROM questions
            "#,
        )
        .fetch_one(&*self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn top_by_revisions(&self, limit: i64) -> Result<Vec<Problem>> {
        let rows: Vec<ProblemRow> = sqlx::query_as(
            r#"
            SELECT id, url, numberofrevision
            FROM questions
            ORDER BY numberofrevision DESC, id ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Problem counts per revision count, with everything at 6 or more
    /// folded into `6+`
    pub async fn revision_distribution(&self) -> Result<Vec<DistributionBucket>> {
        let rows: Vec<DistributionBucket> = sqlx::query_as(
            r#"
            WITH buckets AS (
                SELECT CASE
                         WHEN numberofrevision >= 6 THEN '6+'
                         ELSE CAST(numberofrevision AS TEXT)
                       END AS bucket,
                       MIN(numberofrevision, 6) AS position
                FROM questions
            )
            SELECT bucket, COUNT(*) AS count
            FROM buckets
            GROUP BY bucket, position
            ORDER BY position
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl ProblemStore for Database {
    async fn increment_revisions(&self, ids: &[ProblemId]) -> revise_core::Result<u64> {
        self.increment_revision_counts(ids)
            .await
            .map_err(|e| TrackerError::DurableWrite(format!("{:#}", e)))
    }

    async fn get_problem(&self, id: ProblemId) -> revise_core::Result<Option<Problem>> {
        self.find_problem(id)
            .await
            .map_err(|e| TrackerError::Storage(format!("{:#}", e)))
    }
}

// Helper structs for sqlx query_as
#[derive(sqlx::FromRow)]
struct ProblemRow {
    id: i64,
    url: String,
    numberofrevision: i64,
}

impl From<ProblemRow> for Problem {
    fn from(r: ProblemRow) -> Self {
        Problem {
            id: r.id,
            url: r.url,
            revision_count: r.numberofrevision,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MetricsRow {
    total: i64,
    avg_rev: Option<f64>,
    never_revised: i64,
    needing_practice: i64,
    well_practiced: i64,
    practiced: i64,
    mastered: i64,
}

impl From<MetricsRow> for RevisionMetrics {
    fn from(r: MetricsRow) -> Self {
        RevisionMetrics {
            total: r.total,
            average_revisions: r.avg_rev.unwrap_or(0.0),
            never_revised: r.never_revised,
            needing_practice: r.needing_practice,
            well_practiced: r.well_practiced,
            practiced: r.practiced,
            mastered: r.mastered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(revisions: &[i64]) -> Database {
        let db = Database::in_memory().await.unwrap();
        for (i, count) in revisions.iter().enumerate() {
            let url = format!("https://leetcode.com/problems/problem-{}/", i + 1);
            assert!(db.insert_problem_if_absent(&url).await.unwrap());
            sqlx::query("UPDATE questions SET numberofrevision = ?1 WHERE url = ?2")
                .bind(count)
                .bind(&url)
                .execute(&*db.pool)
                .await
                .unwrap();
        }
        db
    }

    async fn revisions(db: &Database) -> Vec<i64> {
        db.list_problems()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.revision_count)
            .collect()
    }

    #[tokio::test]
    async fn test_insert_if_absent_deduplicates_urls() {
        let db = Database::in_memory().await.unwrap();
        let url = "https://leetcode.com/problems/two-sum/";

        assert!(db.insert_problem_if_absent(url).await.unwrap());
        assert!(!db.insert_problem_if_absent(url).await.unwrap());

        let problems = db.list_problems().await.unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].revision_count, 0);
    }

    #[tokio::test]
    async fn test_increment_single_and_pair() {
        let db = seeded(&[0, 0, 0]).await;

        assert_eq!(db.increment_revisions(&[2]).await.unwrap(), 1);
        assert_eq!(revisions(&db).await, vec![0, 1, 0]);

        assert_eq!(db.increment_revisions(&[1, 3]).await.unwrap(), 2);
        assert_eq!(revisions(&db).await, vec![1, 1, 1]);

        // Unknown ids touch nothing
        assert_eq!(db.increment_revisions(&[42]).await.unwrap(), 0);
        assert_eq!(revisions(&db).await, vec![1, 1, 1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revise.db");
        let db = Arc::new(Database::new(path.to_str().unwrap()).await.unwrap());
        db.insert_problem_if_absent("https://leetcode.com/problems/two-sum/")
            .await
            .unwrap();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { db.increment_revisions(&[1]).await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 1);
        }

        assert_eq!(revisions(&db).await, vec![50]);
    }

    #[tokio::test]
    async fn test_select_least_revised_only_picks_minimum() {
        let db = seeded(&[2, 1, 1, 3, 1]).await;

        for _ in 0..10 {
            let picks = db.select_least_revised(2).await.unwrap();
            assert_eq!(picks.len(), 2);
            assert!(picks.iter().all(|p| p.revision_count == 1));
            assert_ne!(picks[0].id, picks[1].id);
        }
    }

    #[tokio::test]
    async fn test_metrics_and_distribution() {
        let db = seeded(&[0, 1, 2, 3, 4, 5, 7, 9]).await;

        let metrics = db.revision_metrics().await.unwrap();
        assert_eq!(metrics.total, 8);
        assert!((metrics.average_revisions - 31.0 / 8.0).abs() < 1e-9);
        assert_eq!(metrics.never_revised, 1);
        assert_eq!(metrics.needing_practice, 2);
        assert_eq!(metrics.well_practiced, 5);
        assert_eq!(metrics.practiced, 2);
        assert_eq!(metrics.mastered, 3);

        let buckets = db.revision_distribution().await.unwrap();
        let labels: Vec<&str> = buckets.iter().map(|b| b.bucket.as_str()).collect();
        assert_eq!(labels, vec!["0", "1", "2", "3", "4", "5", "6+"]);
        assert_eq!(buckets.last().unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_metrics_on_empty_catalog() {
        let db = Database::in_memory().await.unwrap();

        let metrics = db.revision_metrics().await.unwrap();
        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.average_revisions, 0.0);
        assert!(db.revision_distribution().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_top_by_revisions_breaks_ties_by_id() {
        let db = seeded(&[3, 5, 3, 0, 1, 5]).await;

        let top: Vec<ProblemId> = db
            .top_by_revisions(5)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(top, vec![2, 6, 1, 3, 5]);
    }
}
