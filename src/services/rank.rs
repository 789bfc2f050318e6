//! Concordance ranking.
//!
//! An alternative to counting spans: compare the word-frequency profile
//! of the query with that of the file and use their cosine similarity as
//! the score. Matching still decides which files are results; this only
//! decides their order.

use crate::types::{Score, SearchTerm, TermKind};
use ahash::AHashMap;

/// Score given to files that matched but share no whole word with the query.
const MIN_RELATION: f64 = 1e-6;

/// Lowercased word counts. Words are runs of alphanumerics and `_`.
#[must_use]
pub fn word_frequencies(text: &str) -> AHashMap<String, usize> {
    let mut counts = AHashMap::new();
    for word in text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
    {
        *counts.entry(word.to_lowercase()).or_insert(0) += 1;
    }
    counts
}

fn magnitude<'a>(counts: impl Iterator<Item = &'a usize>) -> f64 {
    counts.map(|&c| (c * c) as f64).sum::<f64>().sqrt()
}

/// Word profile of the query.
#[derive(Debug, Clone)]
pub struct Concordance {
    query: AHashMap<String, usize>,
    magnitude: f64,
}

impl Concordance {
    /// Builds the profile from every positive, non-regex term.
    #[must_use]
    pub fn from_terms(terms: &[SearchTerm]) -> Self {
        let text = terms
            .iter()
            .filter(|t| !t.negated && t.kind != TermKind::Regex)
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let query = word_frequencies(&text);
        let magnitude = magnitude(query.values());
        Self { query, magnitude }
    }

    /// Cosine similarity between the query and `content`, in `[0, 1]`.
    #[must_use]
    pub fn relation(&self, content: &str) -> f64 {
        if self.magnitude == 0.0 {
            return 0.0;
        }

        let counts = word_frequencies(content);
        let content_magnitude = magnitude(counts.values());
        if content_magnitude == 0.0 {
            return 0.0;
        }

        let dot: f64 = self
            .query
            .iter()
            .filter_map(|(word, &q)| counts.get(word).map(|&c| (q * c) as f64))
            .sum();
        dot / (self.magnitude * content_magnitude)
    }

    /// Ranking score for a file that already matched.
    #[must_use]
    pub fn score(&self, content: &str) -> Score {
        Score::new(self.relation(content).max(MIN_RELATION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_frequencies() {
        let counts = word_frequencies("Foo bar, foo_baz; FOO!");
        assert_eq!(counts["foo"], 2);
        assert_eq!(counts["bar"], 1);
        assert_eq!(counts["foo_baz"], 1);
    }

    #[test]
    fn test_identical_profile_is_one() {
        let concordance = Concordance::from_terms(&[SearchTerm::new("alpha", TermKind::Default)]);
        assert!((concordance.relation("alpha alpha") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_focused_file_ranks_higher() {
        let concordance = Concordance::from_terms(&[
            SearchTerm::new("parse", TermKind::Default),
            SearchTerm::new("token", TermKind::Default),
        ]);
        let focused = concordance.relation("parse token parse token");
        let noisy = concordance.relation("parse and many other unrelated words token here");
        assert!(focused > noisy);
    }

    #[test]
    fn test_negated_and_regex_terms_ignored() {
        let concordance = Concordance::from_terms(&[
            SearchTerm::new("alpha", TermKind::Default),
            SearchTerm::new("beta", TermKind::Default).negated(),
            SearchTerm::new("a.*", TermKind::Regex),
        ]);
        assert!((concordance.relation("alpha") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_shared_words_keeps_minimal_score() {
        let concordance = Concordance::from_terms(&[SearchTerm::new("alpha", TermKind::Default)]);
        assert_eq!(concordance.relation("alphabet"), 0.0);
        assert!(!concordance.score("alphabet").is_zero());
    }
}
