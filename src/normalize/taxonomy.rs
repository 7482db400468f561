//! Merge every classification field into one ordered keyword set.

use crate::utils::collapse_whitespace;
use itertools::Itertools;

/// Trim and collapse internal whitespace. Case is left alone.
pub fn normalize_term(term: &str) -> String {
    collapse_whitespace(term)
}

/// Merge taxonomy lists in the order given.
///
/// Terms are compared case-insensitively after whitespace normalization; the
/// first occurrence (with its casing) is kept and later duplicates dropped.
/// Blank terms and empty lists contribute nothing. Multi-word variants such
/// as `"Local News"` and `"local-news"` are kept as distinct terms.
///
/// # Examples
///
/// ```ignore
/// let merged = unify([vec!["Politics", "news"], vec!["politics", "Breaking News"]]);
/// assert_eq!(merged, vec!["Politics", "news", "Breaking News"]);
/// ```
pub fn unify<I, L, S>(term_lists: I) -> Vec<String>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    term_lists
        .into_iter()
        .flatten()
        .map(|term| normalize_term(term.as_ref()))
        .filter(|term| !term.is_empty())
        .unique_by(|term| term.to_lowercase())
        .collect()
}
