//! Domain types

use serde::{Deserialize, Serialize};

pub type ProblemId = i64;

/// Fixed key-value store keys
pub mod keys {
    pub const FIRST_QUESTION_ID: &str = "first_question_id";
    pub const FIRST_QUESTION_URL: &str = "first_question_url";
    pub const FIRST_QUESTION_SOLVED: &str = "first_question_solved";
    pub const SECOND_QUESTION_ID: &str = "second_question_id";
    pub const SECOND_QUESTION_URL: &str = "second_question_url";
    pub const SECOND_QUESTION_SOLVED: &str = "second_question_solved";
    pub const RECENT_SOLVED: &str = "recent_solved";

    /// All daily selection keys, in snapshot order
    pub const DAILY_SELECTION: [&str; 6] = [
        FIRST_QUESTION_ID,
        FIRST_QUESTION_URL,
        FIRST_QUESTION_SOLVED,
        SECOND_QUESTION_ID,
        SECOND_QUESTION_URL,
        SECOND_QUESTION_SOLVED,
    ];
}

/// A catalog problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: ProblemId,
    pub url: String,
    #[serde(rename = "numberofrevision")]
    pub revision_count: i64,
}

/// A problem picked by the selection job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedProblem {
    pub id: ProblemId,
    pub url: String,
}

impl From<Problem> for SelectedProblem {
    fn from(p: Problem) -> Self {
        Self { id: p.id, url: p.url }
    }
}

/// Member of the bounded recently-solved sorted set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSolved {
    pub id: ProblemId,
    pub url: String,
    pub title: String,
    /// Milliseconds since the Unix epoch; also the sorted-set score
    pub solved_at: i64,
    pub revisions: i64,
}

/// Today's selection as held in the key-value store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySelection {
    pub first_question_id: Option<String>,
    pub first_question_url: Option<String>,
    pub first_question_solved: Option<bool>,
    pub second_question_id: Option<String>,
    pub second_question_url: Option<String>,
    pub second_question_solved: Option<bool>,
}

impl DailySelection {
    /// Build from values read with [`keys::DAILY_SELECTION`], in that order.
    pub fn from_values(values: Vec<Option<String>>) -> Self {
        let mut it = values.into_iter();
        let mut next = || it.next().flatten();
        Self {
            first_question_id: next(),
            first_question_url: next(),
            first_question_solved: next().map(|v| parse_flag(&v)),
            second_question_id: next(),
            second_question_url: next(),
            second_question_solved: next().map(|v| parse_flag(&v)),
        }
    }
}

/// Parse a stored solved flag. Anything but `true`/`1` is unsolved.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().trim_matches('"'), "true" | "1")
}

/// Parse a stored problem id, tolerating JSON-quoted values.
pub fn parse_problem_id(value: &str) -> Option<ProblemId> {
    value.trim().trim_matches('"').parse().ok()
}
