//! Ranking of vocabulary rows into suggestions
//!
//! Ranking order:
//! 1. Prefix matches before non-prefix matches
//! 2. Higher trigram similarity first
//! 3. The store's natural order as tie-breaker (the sort is stable)
//!
//! The list is then cut to `max_results`.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, error};

use crate::config::DEFAULT_MAX_SUGGESTIONS;
use crate::errors::LookupError;
use crate::metrics::{TimingGuard, metrics};
use crate::vocabulary::{VocabularyRow, VocabularyStore, prefix_pattern};

/// Criteria for ranking suggestions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingCriteria {
    /// Maximum results to return (default: 5)
    pub max_results: usize,
}

impl Default for RankingCriteria {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}

fn compare_rows(a: &VocabularyRow, b: &VocabularyRow) -> Ordering {
    b.is_prefix_match
        .cmp(&a.is_prefix_match)
        .then_with(|| b.similarity.total_cmp(&a.similarity))
}

/// Sort rows best-first and keep at most `criteria.max_results`
pub fn rank_rows(mut rows: Vec<VocabularyRow>, criteria: &RankingCriteria) -> Vec<VocabularyRow> {
    rows.sort_by(compare_rows);
    rows.truncate(criteria.max_results);
    rows
}

/// Turns a raw query into an ordered candidate list
pub struct SuggestionRanker {
    store: Arc<dyn VocabularyStore>,
    criteria: RankingCriteria,
}

impl SuggestionRanker {
    pub fn new(store: Arc<dyn VocabularyStore>, criteria: RankingCriteria) -> Self {
        Self { store, criteria }
    }

    pub fn criteria(&self) -> &RankingCriteria {
        &self.criteria
    }

    /// Rank the vocabulary for `query`.
    ///
    /// The query is trimmed first; a blank query returns no suggestions
    /// without consulting the store.
    pub async fn rank(&self, query: &str) -> Result<Vec<String>, LookupError> {
        let query = query.trim();
        if query.is_empty() {
            metrics().record_empty_query();
            return Ok(Vec::new());
        }

        metrics().record_query();
        let _timing = TimingGuard::new("rank");

        let rows = match self.store.lookup(query, &prefix_pattern(query)).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Lookup for {:?} failed in {} store: {}", query, self.store.store_name(), e);
                metrics().record_lookup_failure();
                return Err(e);
            }
        };

        let qualifying = rows.len();
        let suggestions: Vec<String> = rank_rows(rows, &self.criteria)
            .into_iter()
            .map(|row| row.word)
            .collect();

        debug!(
            "Ranked {:?}: {} qualifying, returning {:?}",
            query, qualifying, suggestions
        );
        metrics().record_suggestions(suggestions.len());

        Ok(suggestions)
    }
}
