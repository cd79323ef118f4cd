//! Revision reconciliation
//!
//! Records a revision durably in the problem store, then brings the
//! key-value view (today's solved flags and the recently-solved list) in
//! line. The problem store is authoritative: once the increment commits the
//! call succeeds, and any failure while synchronizing the key-value store is
//! logged and dropped.

use crate::ports::{KeyValueStore, ProblemStore};
use crate::title::derive_title;
use crate::types::{keys, parse_problem_id, ProblemId, RecentSolved};
use crate::{Result, TrackerError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum number of entries kept in the recently-solved list
pub const RECENT_SOLVED_CAP: u64 = 10;

/// Ids to record, as received from the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevisionRequest {
    pub first: Option<ProblemId>,
    pub second: Option<ProblemId>,
}

impl RevisionRequest {
    /// Parse raw `id1`/`id2` parameters. Empty values count as absent.
    pub fn parse(first: Option<&str>, second: Option<&str>) -> Result<Self> {
        let first = parse_param("id1", first)?;
        let second = parse_param("id2", second)?;

        if first.is_none() && second.is_none() {
            return Err(TrackerError::Validation(
                "At least one question ID (id1 or id2) is required".to_string(),
            ));
        }

        Ok(Self { first, second })
    }

    /// Distinct ids in request order
    pub fn ids(&self) -> Vec<ProblemId> {
        let mut ids = Vec::with_capacity(2);
        for id in [self.first, self.second].into_iter().flatten() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

fn parse_param(name: &str, raw: Option<&str>) -> Result<Option<ProblemId>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| {
            TrackerError::Validation(format!("{} must be an integer, got {:?}", name, v))
        }),
    }
}

pub struct RevisionRecorder {
    problems: Arc<dyn ProblemStore>,
    cache: Arc<dyn KeyValueStore>,
}

impl RevisionRecorder {
    pub fn new(problems: Arc<dyn ProblemStore>, cache: Arc<dyn KeyValueStore>) -> Self {
        Self { problems, cache }
    }

    /// Record one revision event for each requested id, solved now.
    ///
    /// Returns the distinct requested ids in request order. An id with no
    /// matching problem is still returned: the increment touches no row and
    /// no recently-solved entry is written for it.
    pub async fn record_revision(&self, request: RevisionRequest) -> Result<Vec<ProblemId>> {
        self.record_revision_at(request, Utc::now()).await
    }

    /// Record one revision event for each requested id with an explicit
    /// solve time. Not idempotent: every call adds a revision.
    pub async fn record_revision_at(
        &self,
        request: RevisionRequest,
        solved_at: DateTime<Utc>,
    ) -> Result<Vec<ProblemId>> {
        let ids = request.ids();
        if ids.is_empty() {
            return Err(TrackerError::Validation(
                "At least one question ID (id1 or id2) is required".to_string(),
            ));
        }

        let touched = self
            .problems
            .increment_revisions(&ids)
            .await
            .map_err(|e| match e {
                TrackerError::DurableWrite(_) => e,
                other => TrackerError::DurableWrite(other.to_string()),
            })?;
        info!("Recorded revision for {:?} ({} rows)", ids, touched);

        if let Err(e) = self.sync_cache(&ids, solved_at).await {
            warn!("Revision recorded for {:?} but cache sync failed: {}", ids, e);
        }

        Ok(ids)
    }

    async fn sync_cache(&self, ids: &[ProblemId], solved_at: DateTime<Utc>) -> Result<()> {
        let today = self
            .cache
            .mget(&[keys::FIRST_QUESTION_ID, keys::SECOND_QUESTION_ID])
            .await
            .map_err(cache_sync)?;
        let first_id = today.first().cloned().flatten().and_then(|v| parse_problem_id(&v));
        let second_id = today.get(1).cloned().flatten().and_then(|v| parse_problem_id(&v));

        for id in ids {
            if Some(*id) == first_id {
                self.mark_solved(keys::FIRST_QUESTION_SOLVED).await?;
            }
            if Some(*id) == second_id {
                self.mark_solved(keys::SECOND_QUESTION_SOLVED).await?;
            }
        }

        for id in ids {
            self.push_recent(*id, solved_at).await?;
        }

        self.trim_recent().await
    }

    /// Set a solved flag without touching its remaining lifetime. A key with
    /// no TTL (or no key at all) is written without one.
    async fn mark_solved(&self, key: &str) -> Result<()> {
        let ttl = self.cache.ttl(key).await.map_err(cache_sync)?;
        self.cache.set(key, "true", ttl).await.map_err(cache_sync)?;
        debug!("Marked {} solved (ttl={:?})", key, ttl);
        Ok(())
    }

    async fn push_recent(&self, id: ProblemId, solved_at: DateTime<Utc>) -> Result<()> {
        let Some(problem) = self.problems.get_problem(id).await.map_err(cache_sync)? else {
            warn!("Problem {} not found, skipping recently-solved entry", id);
            return Ok(());
        };

        let entry = RecentSolved {
            id,
            title: derive_title(&problem.url, id),
            url: problem.url,
            solved_at: solved_at.timestamp_millis(),
            revisions: problem.revision_count,
        };
        let member = serde_json::to_string(&entry).map_err(|e| cache_sync(e.into()))?;

        self.cache
            .zadd(keys::RECENT_SOLVED, entry.solved_at as f64, &member)
            .await
            .map_err(cache_sync)
    }

    async fn trim_recent(&self) -> Result<()> {
        let count = self.cache.zcard(keys::RECENT_SOLVED).await.map_err(cache_sync)?;
        if count > RECENT_SOLVED_CAP {
            let stop = (count - RECENT_SOLVED_CAP - 1) as i64;
            let removed = self
                .cache
                .zremrangebyrank(keys::RECENT_SOLVED, 0, stop)
                .await
                .map_err(cache_sync)?;
            debug!("Trimmed {} oldest recently-solved entries", removed);
        }
        Ok(())
    }
}

fn cache_sync(e: TrackerError) -> TrackerError {
    match e {
        TrackerError::CacheSync(_) => e,
        other => TrackerError::CacheSync(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::types::Problem;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct TestProblems {
        rows: Mutex<BTreeMap<ProblemId, Problem>>,
        fail_writes: bool,
    }

    impl TestProblems {
        fn seeded(n: i64) -> Self {
            let rows = (1..=n)
                .map(|id| {
                    let problem = Problem {
                        id,
                        url: format!("https://leetcode.com/problems/problem-{}/", id),
                        revision_count: 0,
                    };
                    (id, problem)
                })
                .collect();
            Self {
                rows: Mutex::new(rows),
                fail_writes: false,
            }
        }

        fn revisions(&self, id: ProblemId) -> i64 {
            self.rows.lock().unwrap()[&id].revision_count
        }
    }

    #[async_trait]
    impl ProblemStore for TestProblems {
        async fn increment_revisions(&self, ids: &[ProblemId]) -> Result<u64> {
            if self.fail_writes {
                return Err(TrackerError::Storage("connection refused".to_string()));
            }
            let mut rows = self.rows.lock().unwrap();
            let mut touched = 0;
            for id in ids {
                if let Some(row) = rows.get_mut(id) {
                    row.revision_count += 1;
                    touched += 1;
                }
            }
            Ok(touched)
        }

        async fn get_problem(&self, id: ProblemId) -> Result<Option<Problem>> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }
    }

    /// Store whose every operation fails
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn mget(&self, _keys: &[&str]) -> Result<Vec<Option<String>>> {
            Err(TrackerError::Cache("connection reset".to_string()))
        }
        async fn ttl(&self, _key: &str) -> Result<Option<Duration>> {
            Err(TrackerError::Cache("connection reset".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<()> {
            Err(TrackerError::Cache("connection reset".to_string()))
        }
        async fn del(&self, _keys: &[&str]) -> Result<u64> {
            Err(TrackerError::Cache("connection reset".to_string()))
        }
        async fn zadd(&self, _key: &str, _score: f64, _member: &str) -> Result<()> {
            Err(TrackerError::Cache("connection reset".to_string()))
        }
        async fn zcard(&self, _key: &str) -> Result<u64> {
            Err(TrackerError::Cache("connection reset".to_string()))
        }
        async fn zremrangebyrank(&self, _key: &str, _start: i64, _stop: i64) -> Result<u64> {
            Err(TrackerError::Cache("connection reset".to_string()))
        }
        async fn zrange(&self, _key: &str, _start: i64, _stop: i64) -> Result<Vec<String>> {
            Err(TrackerError::Cache("connection reset".to_string()))
        }
    }

    fn setup(n: i64) -> (Arc<TestProblems>, Arc<MemoryStore>, RevisionRecorder) {
        let problems = Arc::new(TestProblems::seeded(n));
        let cache = Arc::new(MemoryStore::new());
        let recorder = RevisionRecorder::new(problems.clone(), cache.clone());
        (problems, cache, recorder)
    }

    fn single(id: ProblemId) -> RevisionRequest {
        RevisionRequest {
            first: Some(id),
            second: None,
        }
    }

    #[test]
    fn test_parse_request() {
        let req = tokio_test::assert_ok!(RevisionRequest::parse(Some("3"), None));
        assert_eq!(req.ids(), vec![3]);

        let req = RevisionRequest::parse(Some(""), Some("4")).unwrap();
        assert_eq!(req.ids(), vec![4]);

        let req = RevisionRequest::parse(Some("5"), Some("5")).unwrap();
        assert_eq!(req.ids(), vec![5]);

        assert!(matches!(
            RevisionRequest::parse(None, None),
            Err(TrackerError::Validation(_))
        ));
        assert!(matches!(
            RevisionRequest::parse(Some(""), Some("  ")),
            Err(TrackerError::Validation(_))
        ));
        assert!(matches!(
            RevisionRequest::parse(Some("abc"), Some("2")),
            Err(TrackerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_single_id_increments_only_that_row() {
        let (problems, _cache, recorder) = setup(3);

        let ids = recorder.record_revision(single(2)).await.unwrap();

        assert_eq!(ids, vec![2]);
        assert_eq!(problems.revisions(1), 0);
        assert_eq!(problems.revisions(2), 1);
        assert_eq!(problems.revisions(3), 0);
    }

    #[tokio::test]
    async fn test_pair_increments_both_rows() {
        let (problems, _cache, recorder) = setup(3);

        let request = RevisionRequest {
            first: Some(3),
            second: Some(1),
        };
        let ids = recorder.record_revision(request).await.unwrap();

        assert_eq!(ids, vec![3, 1]);
        assert_eq!(problems.revisions(1), 1);
        assert_eq!(problems.revisions(2), 0);
        assert_eq!(problems.revisions(3), 1);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_not_idempotent() {
        let (problems, _cache, recorder) = setup(1);

        recorder.record_revision(single(1)).await.unwrap();
        recorder.record_revision(single(1)).await.unwrap();

        assert_eq!(problems.revisions(1), 2);
    }

    #[tokio::test]
    async fn test_empty_request_writes_nothing() {
        let (problems, cache, recorder) = setup(2);

        let result = recorder.record_revision(RevisionRequest::default()).await;

        assert!(matches!(result, Err(TrackerError::Validation(_))));
        assert_eq!(problems.revisions(1), 0);
        assert_eq!(problems.revisions(2), 0);
        assert_eq!(cache.zcard(keys::RECENT_SOLVED).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_matching_flag_keeps_remaining_ttl() {
        let (_problems, cache, recorder) = setup(2);
        let day = Duration::from_secs(3600);
        cache.set(keys::FIRST_QUESTION_ID, "1", Some(day)).await.unwrap();
        cache.set(keys::FIRST_QUESTION_SOLVED, "false", Some(day)).await.unwrap();
        cache.set(keys::SECOND_QUESTION_ID, "2", Some(day)).await.unwrap();
        cache.set(keys::SECOND_QUESTION_SOLVED, "false", Some(day)).await.unwrap();

        recorder.record_revision(single(1)).await.unwrap();

        assert_eq!(
            cache.get(keys::FIRST_QUESTION_SOLVED).await.unwrap().as_deref(),
            Some("true")
        );
        let ttl = cache.ttl(keys::FIRST_QUESTION_SOLVED).await.unwrap();
        assert!(matches!(ttl, Some(remaining) if remaining <= day));

        // The other flag is untouched
        assert_eq!(
            cache.get(keys::SECOND_QUESTION_SOLVED).await.unwrap().as_deref(),
            Some("false")
        );
    }

    #[tokio::test]
    async fn test_flag_without_ttl_is_written_persistent() {
        let (_problems, cache, recorder) = setup(2);
        cache
            .set(keys::SECOND_QUESTION_ID, "2", Some(Duration::from_secs(3600)))
            .await
            .unwrap();

        recorder.record_revision(single(2)).await.unwrap();

        assert_eq!(
            cache.get(keys::SECOND_QUESTION_SOLVED).await.unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(cache.ttl(keys::SECOND_QUESTION_SOLVED).await.unwrap(), None);
        assert_eq!(cache.get(keys::FIRST_QUESTION_SOLVED).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unmatched_id_leaves_flags_alone() {
        let (_problems, cache, recorder) = setup(3);
        cache.set(keys::FIRST_QUESTION_ID, "1", None).await.unwrap();

        recorder.record_revision(single(3)).await.unwrap();

        assert_eq!(cache.get(keys::FIRST_QUESTION_SOLVED).await.unwrap(), None);
        assert_eq!(cache.zcard(keys::RECENT_SOLVED).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_entry_carries_title_and_revisions() {
        let (_problems, cache, recorder) = setup(1);
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        recorder.record_revision_at(single(1), at).await.unwrap();
        recorder.record_revision_at(single(1), at + chrono::Duration::seconds(1)).await.unwrap();

        let members = cache.zrange(keys::RECENT_SOLVED, 0, -1).await.unwrap();
        assert_eq!(members.len(), 2);

        let latest: RecentSolved = serde_json::from_str(&members[1]).unwrap();
        assert_eq!(latest.id, 1);
        assert_eq!(latest.title, "problem 1");
        assert_eq!(latest.revisions, 2);
        assert_eq!(latest.solved_at, 1_700_000_001_000);
    }

    #[tokio::test]
    async fn test_recent_list_is_capped_and_evicts_oldest() {
        let (_problems, cache, recorder) = setup(12);
        let start = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        for id in 1..=12 {
            let at = start + chrono::Duration::minutes(id);
            recorder.record_revision_at(single(id), at).await.unwrap();
            assert!(cache.zcard(keys::RECENT_SOLVED).await.unwrap() <= RECENT_SOLVED_CAP);
        }

        let members = cache.zrange(keys::RECENT_SOLVED, 0, -1).await.unwrap();
        let ids: Vec<ProblemId> = members
            .iter()
            .map(|m| serde_json::from_str::<RecentSolved>(m).unwrap().id)
            .collect();
        assert_eq!(ids, (3..=12).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_unknown_id_skips_recent_entry() {
        let (_problems, cache, recorder) = setup(1);

        let ids = recorder.record_revision(single(99)).await.unwrap();

        assert_eq!(ids, vec![99]);
        assert_eq!(cache.zcard(keys::RECENT_SOLVED).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_id_is_returned_alongside_known_id() {
        let (problems, cache, recorder) = setup(2);

        let ids = recorder
            .record_revision(RevisionRequest {
                first: Some(99),
                second: Some(2),
            })
            .await
            .unwrap();

        assert_eq!(ids, vec![99, 2]);
        assert_eq!(problems.revisions(2), 1);
        let recent = cache.zrange(keys::RECENT_SOLVED, 0, -1).await.unwrap();
        assert_eq!(recent.len(), 1);
        let entry: RecentSolved = serde_json::from_str(&recent[0]).unwrap();
        assert_eq!(entry.id, 2);
    }

    #[tokio::test]
    async fn test_cache_failure_does_not_fail_call() {
        let problems = Arc::new(TestProblems::seeded(2));
        let recorder = RevisionRecorder::new(problems.clone(), Arc::new(BrokenStore));

        let ids = recorder
            .record_revision(RevisionRequest {
                first: Some(1),
                second: Some(2),
            })
            .await
            .unwrap();

        assert_eq!(ids, vec![1, 2]);
        assert_eq!(problems.revisions(1), 1);
        assert_eq!(problems.revisions(2), 1);
    }

    #[tokio::test]
    async fn test_durable_failure_skips_cache_sync() {
        let problems = Arc::new(TestProblems {
            fail_writes: true,
            ..TestProblems::seeded(1)
        });
        let cache = Arc::new(MemoryStore::new());
        cache.set(keys::FIRST_QUESTION_ID, "1", None).await.unwrap();
        let recorder = RevisionRecorder::new(problems, cache.clone());

        let result = recorder.record_revision(single(1)).await;

        assert!(matches!(result, Err(TrackerError::DurableWrite(_))));
        assert_eq!(cache.get(keys::FIRST_QUESTION_SOLVED).await.unwrap(), None);
        assert_eq!(cache.zcard(keys::RECENT_SOLVED).await.unwrap(), 0);
    }
}
