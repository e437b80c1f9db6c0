//! In-memory trigram vocabulary
//!
//! Two indexes answer the two halves of the qualification rule:
//!
//! - **Trigram postings** (trigram -> word ids) find fuzzy candidates by
//!   counting shared trigrams, so only words sharing at least one trigram
//!   with the query are ever scored.
//! - **Sorted lowercase index** answers plain `prefix%` patterns with a range
//!   scan. Patterns containing other wildcards fall back to a full scan, which
//!   runs on rayon once the vocabulary reaches [`PARALLEL_THRESHOLD`] words.
//!
//! Word ids are insertion positions and double as the store's natural order.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use parking_lot::RwLock;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::pattern::LikePattern;
use super::trigram::{Trigram, TrigramSet, similarity, similarity_from_counts, trigrams};
use super::{SEED_WORDS, VocabularyRow, VocabularyStore};
use crate::config::{DEFAULT_SIMILARITY_THRESHOLD, ServerConfig};
use crate::errors::LookupError;

/// Vocabulary size above which wildcard scans run in parallel
pub const PARALLEL_THRESHOLD: usize = 1000;

#[derive(Debug)]
struct Entry {
    word: String,
    lowercase: String,
    trigrams: TrigramSet,
}

#[derive(Debug, Default)]
struct VocabularyIndex {
    entries: Vec<Entry>,
    ids_by_word: FxHashMap<String, usize>,
    postings: FxHashMap<Trigram, Vec<usize>>,
    ids_by_lowercase: BTreeMap<String, Vec<usize>>,
}

impl VocabularyIndex {
    fn insert(&mut self, word: &str) -> bool {
        if self.ids_by_word.contains_key(word) {
            return false;
        }

        let id = self.entries.len();
        let lowercase = word.to_lowercase();
        let word_trigrams = trigrams(word);

        for trigram in &word_trigrams {
            self.postings.entry(*trigram).or_default().push(id);
        }
        self.ids_by_lowercase.entry(lowercase.clone()).or_default().push(id);
        self.ids_by_word.insert(word.to_string(), id);
        self.entries.push(Entry {
            word: word.to_string(),
            lowercase,
            trigrams: word_trigrams,
        });

        true
    }

    /// Ids whose similarity to the query reaches the threshold, with their scores
    fn fuzzy_matches(&self, query: &TrigramSet, threshold: f32) -> FxHashMap<usize, f32> {
        // A zero threshold admits every word, shared trigrams or not
        if threshold <= 0.0 {
            return self
                .entries
                .iter()
                .enumerate()
                .map(|(id, entry)| (id, similarity(query, &entry.trigrams)))
                .collect();
        }

        let mut shared: FxHashMap<usize, usize> = FxHashMap::default();
        for trigram in query {
            if let Some(ids) = self.postings.get(trigram) {
                for &id in ids {
                    *shared.entry(id).or_default() += 1;
                }
            }
        }

        shared
            .into_iter()
            .filter_map(|(id, count)| {
                let score = similarity_from_counts(query.len(), self.entries[id].trigrams.len(), count);
                (score >= threshold).then_some((id, score))
            })
            .collect()
    }

    fn prefix_matches(&self, pattern: &LikePattern) -> Vec<usize> {
        if let Some(prefix) = pattern.literal_prefix() {
            return self
                .ids_by_lowercase
                .range(prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(prefix.as_str()))
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect();
        }

        let matching = |(id, entry): (usize, &Entry)| pattern.matches_lowercase(&entry.lowercase).then_some(id);
        if self.entries.len() >= PARALLEL_THRESHOLD {
            self.entries.par_iter().enumerate().filter_map(matching).collect()
        } else {
            self.entries.iter().enumerate().filter_map(matching).collect()
        }
    }
}

/// Thread-safe in-memory vocabulary with `pg_trgm`-style fuzzy matching
#[derive(Debug)]
pub struct TrigramVocabulary {
    index: RwLock<VocabularyIndex>,
    threshold: f32,
}

impl TrigramVocabulary {
    /// Empty vocabulary; `threshold` is clamped to 0.0..=1.0
    pub fn new(threshold: f32) -> Self {
        let threshold = if threshold.is_nan() {
            DEFAULT_SIMILARITY_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };

        Self {
            index: RwLock::new(VocabularyIndex::default()),
            threshold,
        }
    }

    /// Empty vocabulary using the server's similarity threshold
    pub fn for_server(config: &ServerConfig) -> Self {
        Self::new(config.similarity_threshold)
    }

    /// Vocabulary pre-loaded with [`SEED_WORDS`]
    pub fn with_seed_words(threshold: f32) -> Self {
        let vocabulary = Self::new(threshold);
        vocabulary.extend(SEED_WORDS.iter().copied());
        vocabulary
    }

    /// Load one word per line; blank lines and `#` comments are skipped
    pub fn from_reader<R: BufRead>(reader: R, threshold: f32) -> io::Result<Self> {
        let vocabulary = Self::new(threshold);
        for line in reader.lines() {
            let line = line?;
            let word = line.trim();
            if word.is_empty() || word.starts_with('#') {
                continue;
            }
            vocabulary.insert(word);
        }
        Ok(vocabulary)
    }

    pub fn from_path(path: &Path, threshold: f32) -> io::Result<Self> {
        let vocabulary = Self::from_reader(BufReader::new(File::open(path)?), threshold)?;
        debug!("Loaded {} words from {:?}", vocabulary.len(), path);
        Ok(vocabulary)
    }

    /// Adds a word; returns false for blanks and exact duplicates
    pub fn insert(&self, word: &str) -> bool {
        let word = word.trim();
        if word.is_empty() {
            return false;
        }
        self.index.write().insert(word)
    }

    /// Adds several words, returning how many were new
    pub fn extend<I, S>(&self, words: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        words.into_iter().filter(|word| self.insert(word.as_ref())).count()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.read().ids_by_word.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.index.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Every word that is fuzzy-similar to `query` or matches `prefix_pattern`,
    /// in insertion order
    pub fn qualifying_rows(&self, query: &str, prefix_pattern: &str) -> Result<Vec<VocabularyRow>, LookupError> {
        let pattern = LikePattern::parse(prefix_pattern)?;
        let query_trigrams = trigrams(query);
        let index = self.index.read();

        let mut scored = index.fuzzy_matches(&query_trigrams, self.threshold);
        for id in index.prefix_matches(&pattern) {
            scored
                .entry(id)
                .or_insert_with(|| similarity(&query_trigrams, &index.entries[id].trigrams));
        }

        let mut qualifying: Vec<(usize, f32)> = scored.into_iter().collect();
        qualifying.sort_unstable_by_key(|(id, _)| *id);

        Ok(qualifying
            .into_iter()
            .map(|(id, score)| {
                let entry = &index.entries[id];
                VocabularyRow::new(
                    entry.word.clone(),
                    score,
                    pattern.matches_lowercase(&entry.lowercase),
                )
            })
            .collect())
    }
}

impl Default for TrigramVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

#[async_trait::async_trait]
impl VocabularyStore for TrigramVocabulary {
    async fn lookup(&self, query: &str, prefix_pattern: &str) -> Result<Vec<VocabularyRow>, LookupError> {
        self.qualifying_rows(query, prefix_pattern)
    }

    fn store_name(&self) -> &'static str {
        "in-memory trigram"
    }
}
