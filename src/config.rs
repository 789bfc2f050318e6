//! Immutable run configuration.
//!
//! Built once at startup (from the CLI or by an embedder) and shared by
//! `Arc` with every pipeline stage. Worker bodies never read ambient
//! global state.

use std::fmt;
use std::str::FromStr;

/// How matching files are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rank {
    /// Score is the number of matched spans.
    #[default]
    Frequency,
    /// Score is the word-frequency relation between query and content.
    Concordance,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frequency => write!(f, "frequency"),
            Self::Concordance => write!(f, "concordance"),
        }
    }
}

impl FromStr for Rank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "frequency" => Ok(Self::Frequency),
            "concordance" => Ok(Self::Concordance),
            other => Err(format!(
                "Invalid rank: '{other}'. Valid ranks: frequency, concordance"
            )),
        }
    }
}

/// Configuration for a search run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Match literals exactly instead of with Unicode case folding
    pub case_sensitive: bool,
    /// Treat every plain term as a distance-1 fuzzy term
    pub fuzzy: bool,
    /// Maximum spans recorded per term per file (0 = unlimited)
    pub match_limit: usize,
    /// Maximum results retained by the collector (0 = unlimited)
    pub result_limit: usize,
    /// Mean line length above which a file counts as minified
    pub min_line_length: usize,
    /// Keep files containing NUL bytes
    pub include_binary: bool,
    /// Keep files whose mean line length exceeds `min_line_length`
    pub include_minified: bool,
    /// Bytes of content shown per result (0 = whole file)
    pub snippet_length: usize,
    /// Prefix scanned for NUL bytes (0 = whole content)
    pub binary_scan_bytes: usize,
    /// Longest term expanded at distance 2; longer ones fall back to distance 1
    pub fuzzy2_max_term_chars: usize,
    /// Ranking strategy
    pub rank: Rank,
    /// File reading workers (0 = auto-detect)
    pub loader_workers: usize,
    /// Matching workers (0 = auto-detect)
    pub matcher_workers: usize,
    /// Capacity of each bounded stage channel (0 = auto-detect)
    pub channel_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            fuzzy: false,
            match_limit: 0,
            result_limit: 100,
            min_line_length: 255,
            include_binary: false,
            include_minified: false,
            snippet_length: 300,
            binary_scan_bytes: 0,
            fuzzy2_max_term_chars: 12,
            rank: Rank::Frequency,
            loader_workers: 0, // Auto-detect
            matcher_workers: 0,
            channel_capacity: 0,
        }
    }
}

impl SearchConfig {
    /// Loader pool size: one worker per core unless set.
    #[must_use]
    pub fn resolved_loader_workers(&self) -> usize {
        if self.loader_workers > 0 {
            self.loader_workers
        } else {
            available_parallelism()
        }
    }

    /// Matcher pool size: four workers per core unless set.
    #[must_use]
    pub fn resolved_matcher_workers(&self) -> usize {
        if self.matcher_workers > 0 {
            self.matcher_workers
        } else {
            available_parallelism() * 4
        }
    }

    /// Bounded channel capacity: one slot per core unless set.
    #[must_use]
    pub fn resolved_channel_capacity(&self) -> usize {
        if self.channel_capacity > 0 {
            self.channel_capacity
        } else {
            available_parallelism()
        }
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get())
}
