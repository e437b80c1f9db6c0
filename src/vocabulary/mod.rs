//! Vocabulary store abstraction
//!
//! The ranker only needs one capability from the store: given a query, return
//! every word that qualifies for it together with its similarity score and
//! whether it is a case-insensitive prefix match. A word qualifies when it is
//! fuzzy-similar to the query OR matches the prefix pattern; neither condition
//! implies the other.
//!
//! [`TrigramVocabulary`] is the in-process implementation. Other stores (a
//! `pg_trgm` table, a remote service) plug in through [`VocabularyStore`].

pub mod memory;
pub mod pattern;
pub mod trigram;

pub use memory::TrigramVocabulary;
pub use pattern::LikePattern;

use crate::errors::LookupError;

/// Words served when no vocabulary file is configured
pub const SEED_WORDS: &[&str] = &[
    "merhaba", "nasılsın", "günaydın", "teşekkürler", "görüşürüz",
    "lütfen", "evet", "hayır", "hoşgeldiniz", "iyi akşamlar",
];

/// One qualifying word as reported by the store
#[derive(Debug, Clone, PartialEq)]
pub struct VocabularyRow {
    pub word: String,
    /// Trigram similarity to the query, 0.0..=1.0
    pub similarity: f32,
    pub is_prefix_match: bool,
}

impl VocabularyRow {
    pub fn new(word: impl Into<String>, similarity: f32, is_prefix_match: bool) -> Self {
        Self {
            word: word.into(),
            similarity,
            is_prefix_match,
        }
    }
}

/// Queryable source of candidate words
///
/// Implementations return qualifying rows in their natural order; the ranker
/// applies the final ordering, so the order must be deterministic for a fixed
/// store state.
#[async_trait::async_trait]
pub trait VocabularyStore: Send + Sync {
    async fn lookup(&self, query: &str, prefix_pattern: &str) -> Result<Vec<VocabularyRow>, LookupError>;

    /// Human-readable name for logging
    fn store_name(&self) -> &'static str;
}

/// `query%`, the case-insensitive prefix pattern for a query.
/// The query is not escaped, so `%` and `_` typed by the user act as wildcards.
pub fn prefix_pattern(query: &str) -> String {
    format!("{}%", query)
}
