//! Problem title derivation from catalog URLs

use crate::types::ProblemId;

const PROBLEMS_SEGMENT: &str = "/problems/";

/// Derive a display title from a problem URL.
///
/// Takes the slug between `/problems/` and the next `/` and turns hyphens
/// into spaces. Case is left alone; capitalization happens at render time.
/// URLs without a usable slug fall back to `"Problem <id>"`.
pub fn derive_title(url: &str, id: ProblemId) -> String {
    url.split_once(PROBLEMS_SEGMENT)
        .map(|(_, rest)| rest.split('/').next().unwrap_or_default())
        .filter(|slug| !slug.is_empty())
        .map(|slug| slug.replace('-', " "))
        .unwrap_or_else(|| format!("Problem {}", id))
}
