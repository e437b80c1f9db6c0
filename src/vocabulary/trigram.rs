//! Trigram extraction and similarity, compatible with PostgreSQL's `pg_trgm`
//!
//! Text is lowercased and split into words on non-alphanumeric characters.
//! Each word is padded with two spaces in front and one behind, and every
//! window of three characters becomes a trigram:
//!
//! ```text
//! "kit"  ->  "  k", " ki", "kit", "it "
//! ```
//!
//! Similarity is the Jaccard index of the two trigram sets.

use rustc_hash::FxHashSet;

/// Three consecutive characters of a padded, lowercased word
pub type Trigram = [char; 3];

/// Set of distinct trigrams for a piece of text
pub type TrigramSet = FxHashSet<Trigram>;

/// Extract the trigram set of `text`
pub fn trigrams(text: &str) -> TrigramSet {
    let mut set = TrigramSet::default();
    let lowered = text.to_lowercase();

    for word in lowered.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }

        let padded: Vec<char> = [' ', ' ']
            .into_iter()
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();

        for window in padded.windows(3) {
            set.insert([window[0], window[1], window[2]]);
        }
    }

    set
}

/// Number of trigrams the two sets have in common
pub fn shared_count(a: &TrigramSet, b: &TrigramSet) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|t| large.contains(*t)).count()
}

/// Similarity from set sizes and the size of their intersection
pub fn similarity_from_counts(len_a: usize, len_b: usize, shared: usize) -> f32 {
    let union = len_a + len_b - shared;
    if union == 0 {
        0.0
    } else {
        shared as f32 / union as f32
    }
}

/// `|A ∩ B| / |A ∪ B|`, zero when either side has no trigrams
pub fn similarity(a: &TrigramSet, b: &TrigramSet) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    similarity_from_counts(a.len(), b.len(), shared_count(a, b))
}

/// Convenience wrapper over raw strings
pub fn text_similarity(a: &str, b: &str) -> f32 {
    similarity(&trigrams(a), &trigrams(b))
}
