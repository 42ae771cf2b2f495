//! Name similarity scoring.
//!
//! A score is an integer confidence in `0..=100` between a free-text query
//! and one entity name:
//!
//! ```text
//! score = round((S × 0.6 + P + T) × 100), clamped to 100
//! ```
//!
//! - `S`: Sørensen–Dice coefficient over character bigrams of the
//!   lower-cased strings (whitespace ignored).
//! - `P`: position bonus: `0.30` when the name starts with the query,
//!   `0.15` when it merely contains it.
//! - `T`: type bonus, constant `0.20` because the gazetteer holds a
//!   single entity type.
//!
//! Case-insensitive exact matches short-circuit to `100`. The weights add
//! up to `1.10`, so strong prefix matches overflow and are clamped.

use serde::Serialize;
use std::collections::HashMap;

pub const EXACT_MATCH_SCORE: u32 = 100;
pub const SIMILARITY_WEIGHT: f64 = 0.6;
pub const PREFIX_BONUS: f64 = 0.30;
pub const CONTAINS_BONUS: f64 = 0.15;
pub const TYPE_BONUS: f64 = 0.20;

/// Scoring breakdown for one query/name pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Bigram similarity `S` in `[0.0, 1.0]` (1.0 on exact match).
    pub similarity: f64,
    /// Prefix or containment bonus `P`.
    pub position_bonus: f64,
    /// Type bonus `T`.
    pub type_bonus: f64,
    /// Final integer score.
    pub score: u32,
    /// True when the normalized strings were identical.
    pub exact: bool,
}

/// Score `query` against `name`.
pub fn score(query: &str, name: &str) -> u32 {
    explain(query, name).score
}

/// Score `query` against `name`, keeping the individual components.
pub fn explain(query: &str, name: &str) -> ScoreBreakdown {
    let query = query.to_lowercase();
    let name = name.to_lowercase();

    if query == name {
        return ScoreBreakdown {
            similarity: 1.0,
            position_bonus: 0.0,
            type_bonus: 0.0,
            score: EXACT_MATCH_SCORE,
            exact: true,
        };
    }

    let similarity = bigram_similarity(&query, &name);

    let position_bonus = if name.starts_with(&query) {
        PREFIX_BONUS
    } else if name.contains(&query) {
        CONTAINS_BONUS
    } else {
        0.0
    };

    let total = (similarity * SIMILARITY_WEIGHT) + position_bonus + TYPE_BONUS;
    let score = (total * 100.0).round().clamp(0.0, EXACT_MATCH_SCORE as f64) as u32;

    ScoreBreakdown {
        similarity,
        position_bonus,
        type_bonus: TYPE_BONUS,
        score,
        exact: false,
    }
}

/// Sørensen–Dice similarity of two already-normalized strings.
///
/// Whitespace is ignored. Bigrams are taken over `char`s and counted as a
/// multiset, so accented names are measured the same as ASCII ones.
/// Strings shorter than two characters have no bigrams and compare by
/// equality only; empty inputs never fail.
pub fn bigram_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = b.chars().filter(|c| !c.is_whitespace()).collect();

    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut counts: HashMap<(char, char), usize> = HashMap::new();
    for pair in a.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut shared = 0usize;
    for pair in b.windows(2) {
        if let Some(n) = counts.get_mut(&(pair[0], pair[1])) {
            if *n > 0 {
                *n -= 1;
                shared += 1;
            }
        }
    }

    let total = (a.len() - 1) + (b.len() - 1);
    (2 * shared) as f64 / total as f64
}
