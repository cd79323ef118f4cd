//! Relational problem store

use crate::types::{Problem, ProblemId};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ProblemStore: Send + Sync {
    /// Atomically add one revision to every listed problem.
    ///
    /// Must be a single `counter = counter + 1` update at the store level so
    /// concurrent calls for the same id never lose an increment. Returns the
    /// number of rows touched.
    async fn increment_revisions(&self, ids: &[ProblemId]) -> Result<u64>;

    async fn get_problem(&self, id: ProblemId) -> Result<Option<Problem>>;
}
