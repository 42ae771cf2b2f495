//! Ranking engine: score every entity for one query and keep the best.
//!
//! # Algorithm
//!
//! 1. Trim the query; an empty query returns no results without scanning.
//! 2. Score every entity name with [`scorer::score`].
//! 3. Drop candidates scoring `<= min_score`.
//! 4. Sort by score (desc). The sort is stable, so equal scores keep the
//!    order in which entities were loaded.
//! 5. Truncate to the query limit, or `default_limit` when none was given.
//!    An explicit limit of `0` returns nothing.
//! 6. Flag candidates scoring `> match_threshold` as matches.
//!
//! Every query is a full scan of the entity set; there is no index.

use crate::models::{Entity, Match, TypeRef};
use crate::scorer;

/// One reconciliation query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Free-text name to reconcile.
    pub text: String,
    /// Maximum number of results; `None` means the policy default.
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Filtering and truncation thresholds, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankPolicy {
    /// Result count when a query carries no limit.
    pub default_limit: usize,
    /// Candidates must score strictly above this to be returned.
    pub min_score: u32,
    /// Candidates scoring strictly above this are flagged `match: true`.
    pub match_threshold: u32,
}

impl Default for RankPolicy {
    fn default() -> Self {
        Self {
            default_limit: 5,
            min_score: 10,
            match_threshold: 85,
        }
    }
}

impl RankPolicy {
    /// The number of results a query is allowed to return.
    pub fn effective_limit(&self, query: &Query) -> usize {
        query.limit.unwrap_or(self.default_limit)
    }
}

/// Rank `entities` against `query`.
pub fn rank(query: &Query, entities: &[Entity], policy: &RankPolicy) -> Vec<Match> {
    let text = query.text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let limit = policy.effective_limit(query);
    if limit == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<(u32, &Entity)> = entities
        .iter()
        .map(|entity| (scorer::score(text, &entity.name), entity))
        .filter(|(score, _)| *score > policy.min_score)
        .collect();

    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    candidates.truncate(limit);

    candidates
        .into_iter()
        .map(|(score, entity)| Match {
            id: entity.id.clone(),
            name: entity.name.clone(),
            score,
            is_match: score > policy.match_threshold,
            types: vec![TypeRef::city()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cities(names: &[&str]) -> Vec<Entity> {
        names.iter().map(|n| Entity::city("", *n)).collect()
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let entities = cities(&["Toronto", "Montreal"]);
        let results = rank(&Query::new("Toronto"), &entities, &RankPolicy::default());
        assert_eq!(results[0].name, "Toronto");
        assert_eq!(results[0].score, 100);
        assert!(results[0].is_match);
        assert_eq!(results[0].types, vec![TypeRef::city()]);
    }

    #[test]
    fn test_blank_query_returns_nothing() {
        let entities = cities(&["Toronto"]);
        assert!(rank(&Query::new(""), &entities, &RankPolicy::default()).is_empty());
        assert!(rank(&Query::new("   \t"), &entities, &RankPolicy::default()).is_empty());
    }

    #[test]
    fn test_query_is_trimmed_before_scoring() {
        let entities = cities(&["Toronto"]);
        let results = rank(&Query::new("  toronto "), &entities, &RankPolicy::default());
        assert_eq!(results[0].score, 100);
    }

    #[test]
    fn test_prefix_query_is_a_match() {
        let entities = cities(&["Ottawa", "Toronto"]);
        let results = rank(&Query::new("ottaw"), &entities, &RankPolicy::default());
        assert_eq!(results[0].name, "Ottawa");
        assert!(results[0].score > 85);
        assert!(results[0].is_match);
        assert!(!results[1].is_match);
    }

    #[test]
    fn test_default_limit_is_five() {
        let entities = cities(&["Aa", "Ab", "Ac", "Ad", "Ae", "Af", "Ag"]);
        let results = rank(&Query::new("A"), &entities, &RankPolicy::default());
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn test_explicit_limit() {
        let entities = cities(&["Aa", "Ab", "Ac", "Ad", "Ae", "Af", "Ag"]);
        let policy = RankPolicy::default();
        assert_eq!(rank(&Query::new("A").with_limit(2), &entities, &policy).len(), 2);
        assert_eq!(rank(&Query::new("A").with_limit(7), &entities, &policy).len(), 7);
        assert_eq!(rank(&Query::new("A").with_limit(50), &entities, &policy).len(), 7);
    }

    #[test]
    fn test_zero_limit_returns_nothing() {
        let entities = cities(&["Toronto"]);
        let results = rank(
            &Query::new("Toronto").with_limit(0),
            &entities,
            &RankPolicy::default(),
        );
        assert!(results.is_empty());
    }

    #[test]
    fn test_min_score_filters_candidates() {
        // Unrelated names score exactly the type bonus (20).
        let entities = cities(&["Toronto", "Kelowna"]);
        let strict = RankPolicy {
            min_score: 20,
            ..RankPolicy::default()
        };
        let results = rank(&Query::new("Toronto"), &entities, &strict);
        assert_eq!(results.len(), 1);
        assert!(results.iter().all(|m| m.score > 20));

        let lenient = rank(&Query::new("Toronto"), &entities, &RankPolicy::default());
        assert_eq!(lenient.len(), 2);
        assert!(lenient.iter().all(|m| m.score > 10));
    }

    #[test]
    fn test_ties_keep_load_order() {
        let entities = vec![
            Entity::city("richmond-bc", "Richmond").with_province("British Columbia"),
            Entity::city("richmond-hill", "Richmond Hill"),
            Entity::city("richmond-qc", "Richmond").with_province("Quebec"),
            Entity::city("richmond-on", "Richmond").with_province("Ontario"),
        ];
        let results = rank(&Query::new("richmond"), &entities, &RankPolicy::default());
        let ids: Vec<&str> = results.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["richmond-bc", "richmond-qc", "richmond-on", "richmond-hill"]
        );
    }

    #[test]
    fn test_results_are_sorted_descending() {
        let entities = cities(&[
            "Sainte-Julie",
            "Saint John",
            "Saint-Jean-sur-Richelieu",
            "Saskatoon",
            "Sarnia",
            "Saint-Jérôme",
            "Sherbrooke",
        ]);
        let results = rank(
            &Query::new("Saint J").with_limit(10),
            &entities,
            &RankPolicy::default(),
        );
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_rank_is_idempotent() {
        let entities = cities(&["London", "Londonderry", "New London", "Longueuil"]);
        let q = Query::new("london");
        let first = rank(&q, &entities, &RankPolicy::default());
        let second = rank(&q, &entities, &RankPolicy::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_match_threshold_is_strict() {
        let entities = cities(&["Toronto"]);
        let policy = RankPolicy {
            match_threshold: 100,
            ..RankPolicy::default()
        };
        let results = rank(&Query::new("Toronto"), &entities, &policy);
        assert_eq!(results[0].score, 100);
        assert!(!results[0].is_match);
    }
}
