//! Core domain types for cs.
//!
//! A [`FileJob`] is created by the path producer, filled in by the loader,
//! scored by the match engine and finally read by the collector and
//! formatter. Ownership moves stage to stage through channel handoff.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Maximum number of bytes read from any single file.
///
/// Anything beyond this is never read or searched.
pub const MAX_READ_BYTES: u64 = 1_024_000;

/// Relevance score, never negative.
///
/// Unlike a normalized similarity this is unbounded above: the default
/// ranker accumulates raw match counts.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(f64);

impl Score {
    /// No match.
    pub const ZERO: Self = Self(0.0);

    /// Creates a new score, saturating negatives (and NaN) to zero.
    #[must_use]
    pub fn new(value: f64) -> Self {
        if value > 0.0 {
            Self(value)
        } else {
            Self::ZERO
        }
    }

    #[must_use]
    pub const fn as_f64(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    /// Adds `amount` to the score.
    #[must_use]
    pub fn add(self, amount: f64) -> Self {
        Self::new(self.0 + amount)
    }

    /// Total order used for ranking. Scores are never NaN.
    #[must_use]
    pub fn rank_cmp(self, other: Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Half-open byte range `[start, end)` into a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.end <= self.start
    }
}

/// How a term is matched against content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    /// Plain literal.
    Default,
    /// Literal taken from between quotes.
    Quoted,
    /// Regular expression, compiled per worker.
    Regex,
    /// Literal or any variant within edit distance 1.
    Fuzzy1,
    /// Literal or any variant within edit distance 2.
    Fuzzy2,
}

impl TermKind {
    /// Edit distance for fuzzy kinds.
    #[must_use]
    pub const fn fuzzy_distance(self) -> Option<u8> {
        match self {
            Self::Fuzzy1 => Some(1),
            Self::Fuzzy2 => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Quoted => write!(f, "quoted"),
            Self::Regex => write!(f, "regex"),
            Self::Fuzzy1 => write!(f, "fuzzy1"),
            Self::Fuzzy2 => write!(f, "fuzzy2"),
        }
    }
}

/// One parsed query atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTerm {
    /// Literal content with quotes, slashes and fuzzy suffixes stripped.
    pub text: String,
    pub kind: TermKind,
    /// Set when the term followed a `NOT` token.
    pub negated: bool,
}

impl SearchTerm {
    #[must_use]
    pub fn new(text: impl Into<String>, kind: TermKind) -> Self {
        Self {
            text: text.into(),
            kind,
            negated: false,
        }
    }

    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }

    /// The term that matches nothing, used for malformed queries.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(String::new(), TermKind::Default)
    }
}

/// A candidate file moving through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct FileJob {
    pub location: PathBuf,
    /// Base name, for diagnostics.
    pub filename: String,
    /// Discovery order assigned by the path producer.
    pub ordinal: u64,
    pub content: Vec<u8>,
    pub is_binary: bool,
    pub is_minified: bool,
    /// Term text to the spans it matched, one entry per matching term.
    pub match_locations: BTreeMap<String, Vec<MatchSpan>>,
    pub score: Score,
}

impl FileJob {
    /// Creates a job carrying only its location.
    #[must_use]
    pub fn new(location: impl Into<PathBuf>, ordinal: u64) -> Self {
        let location = location.into();
        let filename = location
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            location,
            filename,
            ordinal,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Content as text. Borrowed when the content is valid UTF-8.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// All spans across every term, unsorted.
    pub fn all_spans(&self) -> impl Iterator<Item = MatchSpan> + '_ {
        self.match_locations.values().flatten().copied()
    }

    /// Total number of recorded spans.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.match_locations.values().map(Vec::len).sum()
    }
}

// Compile-time assertions for thread safety.
#[cfg(test)]
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<FileJob>();
    assert_send_sync::<SearchTerm>();
    assert_send_sync::<Score>();
    assert_send_sync::<MatchSpan>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_saturates_at_zero() {
        assert_eq!(Score::new(-3.0), Score::ZERO);
        assert_eq!(Score::new(f64::NAN), Score::ZERO);
        assert_eq!(Score::new(2.5).as_f64(), 2.5);
        assert_eq!(Score::ZERO.add(3.0).add(1.0).as_f64(), 4.0);
    }

    #[test]
    fn test_score_rank_order() {
        assert_eq!(Score::new(2.0).rank_cmp(Score::new(1.0)), Ordering::Greater);
        assert_eq!(Score::ZERO.rank_cmp(Score::ZERO), Ordering::Equal);
    }

    #[test]
    fn test_file_job_filename() {
        let job = FileJob::new("src/deep/main.rs", 7);
        assert_eq!(job.filename, "main.rs");
        assert_eq!(job.ordinal, 7);
        assert!(job.content.is_empty());
        assert!(job.score.is_zero());
    }

    #[test]
    fn test_match_count_sums_terms() {
        let mut job = FileJob::new("a.txt", 0);
        job.match_locations
            .insert("foo".into(), vec![MatchSpan::new(0, 3), MatchSpan::new(4, 7)]);
        job.match_locations.insert("bar".into(), vec![MatchSpan::new(8, 11)]);
        assert_eq!(job.match_count(), 3);
        assert_eq!(job.all_spans().count(), 3);
    }

    #[test]
    fn test_fuzzy_distance() {
        assert_eq!(TermKind::Fuzzy1.fuzzy_distance(), Some(1));
        assert_eq!(TermKind::Fuzzy2.fuzzy_distance(), Some(2));
        assert_eq!(TermKind::Quoted.fuzzy_distance(), None);
    }
}
