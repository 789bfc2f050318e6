//! Match engine stage.
//!
//! For every loaded file: drop binaries and minified files, then evaluate
//! each search term in order and accumulate a score.
//!
//! # Scoring
//!
//! Every non-negated term must match (AND-like); its span count is added
//! to the score. A negated term that matches anywhere forces the score to
//! zero and stops evaluation. Files that end with a zero score are
//! dropped.
//!
//! # Sharing
//!
//! The [`QueryPlan`] (terms, fuzzy expansions and literal finders) is
//! built once per run and shared read-only. Regex terms are compiled
//! lazily into a per-worker [`RegexCache`] so workers never contend on a
//! shared compiled pattern.

use crate::config::{Rank, SearchConfig};
use crate::error::{PatternError, PatternResult};
use crate::services::fuzzy::FuzzyCache;
use crate::services::rank::Concordance;
use crate::services::search::PipelineStats;
use crate::types::{FileJob, MatchSpan, Score, SearchTerm, TermKind};
use ahash::AHashMap;
use memchr::memmem;
use rayon::prelude::*;
use regex::bytes::{Regex, RegexBuilder};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Returns true if `content` holds a NUL byte within the first
/// `scan_bytes` bytes (0 = anywhere).
#[must_use]
pub fn is_binary(content: &[u8], scan_bytes: usize) -> bool {
    let prefix = if scan_bytes == 0 {
        content
    } else {
        &content[..content.len().min(scan_bytes)]
    };
    memchr::memchr(0, prefix).is_some()
}

/// Returns true if the mean `\n`-delimited line length exceeds `threshold`.
#[must_use]
pub fn is_minified(content: &[u8], threshold: usize) -> bool {
    let newlines = memchr::memchr_iter(b'\n', content).count();
    let lines = newlines + 1;
    let line_bytes = content.len() - newlines;
    line_bytes / lines > threshold
}

/// File content plus a lazily built ASCII-lowercased copy.
///
/// ASCII lowering keeps byte offsets intact, so spans found in the
/// lowered copy index straight into the original.
pub struct Haystack<'a> {
    content: &'a [u8],
    lowered: OnceCell<Vec<u8>>,
    ascii: OnceCell<bool>,
}

impl<'a> Haystack<'a> {
    #[must_use]
    pub fn new(content: &'a [u8]) -> Self {
        Self {
            content,
            lowered: OnceCell::new(),
            ascii: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn content(&self) -> &'a [u8] {
        self.content
    }

    /// Whether the content is pure ASCII, computed once.
    #[must_use]
    pub fn is_ascii(&self) -> bool {
        *self.ascii.get_or_init(|| self.content.is_ascii())
    }

    fn lowered(&self) -> &[u8] {
        self.lowered.get_or_init(|| self.content.to_ascii_lowercase())
    }
}

/// Finds every non-overlapping occurrence of one literal.
pub struct LiteralFinder {
    needle_len: usize,
    kind: FinderKind,
}

enum FinderKind {
    /// Empty needle, matches nothing
    Never,
    /// Case-sensitive byte search
    Exact(memmem::Finder<'static>),
    /// ASCII needle lowercased, searched in the lowered haystack.
    /// `k` and `s` also fold from non-ASCII chars (KELVIN SIGN, LONG S),
    /// so such needles carry a Unicode fallback for non-ASCII content.
    AsciiFolded {
        finder: memmem::Finder<'static>,
        unicode: Option<Regex>,
    },
    /// Non-ASCII needle, Unicode simple case folding
    UnicodeFolded(Regex),
}

impl LiteralFinder {
    #[must_use]
    pub fn new(needle: &str, case_sensitive: bool) -> Self {
        let kind = if needle.is_empty() {
            FinderKind::Never
        } else if case_sensitive {
            FinderKind::Exact(memmem::Finder::new(needle.as_bytes()).into_owned())
        } else if needle.is_ascii() {
            let lowered = needle.to_ascii_lowercase();
            let unicode = lowered
                .bytes()
                .any(|b| b == b'k' || b == b's')
                .then(|| unicode_folded(needle))
                .flatten();
            FinderKind::AsciiFolded {
                finder: memmem::Finder::new(lowered.as_bytes()).into_owned(),
                unicode,
            }
        } else {
            match unicode_folded(needle) {
                Some(re) => FinderKind::UnicodeFolded(re),
                None => FinderKind::Exact(memmem::Finder::new(needle.as_bytes()).into_owned()),
            }
        };

        Self {
            needle_len: needle.len(),
            kind,
        }
    }

    /// Appends spans to `out` until `out` holds `limit` spans (0 = no limit).
    pub fn find_into(&self, haystack: &Haystack<'_>, limit: usize, out: &mut Vec<MatchSpan>) {
        let budget = remaining(limit, out.len());
        if budget == 0 {
            return;
        }

        match &self.kind {
            FinderKind::Never => {}
            FinderKind::Exact(finder) => out.extend(
                finder
                    .find_iter(haystack.content())
                    .take(budget)
                    .map(|start| MatchSpan::new(start, start + self.needle_len)),
            ),
            FinderKind::AsciiFolded {
                unicode: Some(re), ..
            } if !haystack.is_ascii() => out.extend(
                re.find_iter(haystack.content())
                    .take(budget)
                    .map(|m| MatchSpan::new(m.start(), m.end())),
            ),
            FinderKind::AsciiFolded { finder, .. } => out.extend(
                finder
                    .find_iter(haystack.lowered())
                    .take(budget)
                    .map(|start| MatchSpan::new(start, start + self.needle_len)),
            ),
            FinderKind::UnicodeFolded(re) => out.extend(
                re.find_iter(haystack.content())
                    .take(budget)
                    .map(|m| MatchSpan::new(m.start(), m.end())),
            ),
        }
    }

    /// Convenience wrapper returning a fresh span list.
    #[must_use]
    pub fn find_all(&self, content: &[u8], limit: usize) -> Vec<MatchSpan> {
        let mut out = Vec::new();
        self.find_into(&Haystack::new(content), limit, &mut out);
        out
    }
}

/// Escaped literal with Unicode simple case folding.
fn unicode_folded(needle: &str) -> Option<Regex> {
    match RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("cannot fold case for {needle:?} ({e}), matching exactly");
            None
        }
    }
}

/// Spans still allowed under `limit`, where 0 means unlimited.
fn remaining(limit: usize, used: usize) -> usize {
    if limit == 0 {
        usize::MAX
    } else {
        limit.saturating_sub(used)
    }
}

/// Builds a regex term with the run's case setting.
///
/// # Errors
///
/// Returns `PatternError::InvalidRegex` if the pattern does not compile.
pub fn compile_regex(pattern: &str, case_sensitive: bool) -> PatternResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| PatternError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Finds non-empty, non-overlapping regex matches.
///
/// A panic inside the engine is caught and reported as
/// `PatternError::EvaluationFault` instead of killing the worker.
///
/// # Errors
///
/// Returns `PatternError::EvaluationFault` if evaluation panicked.
pub fn find_regex(re: &Regex, content: &[u8], limit: usize) -> PatternResult<Vec<MatchSpan>> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        re.find_iter(content)
            .filter(|m| m.start() < m.end())
            .take(remaining(limit, 0))
            .map(|m| MatchSpan::new(m.start(), m.end()))
            .collect()
    }))
    .map_err(|_| PatternError::EvaluationFault {
        pattern: re.as_str().to_string(),
    })
}

/// Per-worker compiled regex terms, failures included.
#[derive(Default)]
pub struct RegexCache {
    compiled: AHashMap<String, PatternResult<Regex>>,
}

impl RegexCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled pattern, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns the cached `PatternError::InvalidRegex` for bad patterns.
    pub fn get(&mut self, pattern: &str, case_sensitive: bool) -> PatternResult<&Regex> {
        self.compiled
            .entry(pattern.to_string())
            .or_insert_with(|| compile_regex(pattern, case_sensitive))
            .as_ref()
            .map_err(|e| e.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// How a planned term is searched.
enum Needles {
    /// Literal and fuzzy terms: one finder per expansion
    Literals(Vec<LiteralFinder>),
    /// Compiled lazily per worker
    Regex,
}

/// A search term ready for matching.
pub struct PlannedTerm {
    pub term: SearchTerm,
    needles: Needles,
}

impl PlannedTerm {
    /// Number of literal needles searched for this term.
    #[must_use]
    pub fn needle_count(&self) -> usize {
        match &self.needles {
            Needles::Literals(finders) => finders.len(),
            Needles::Regex => 1,
        }
    }

    fn find(
        &self,
        worker: &mut MatchWorker,
        haystack: &Haystack<'_>,
        config: &SearchConfig,
    ) -> PatternResult<Vec<MatchSpan>> {
        match &self.needles {
            Needles::Literals(finders) => {
                let mut spans = Vec::new();
                for finder in finders {
                    finder.find_into(haystack, config.match_limit, &mut spans);
                }
                if finders.len() > 1 {
                    spans.sort_unstable_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
                }
                Ok(spans)
            }
            Needles::Regex => {
                let re = worker.regexes.get(&self.term.text, config.case_sensitive)?;
                find_regex(re, haystack.content(), config.match_limit)
            }
        }
    }
}

/// Terms with their fuzzy expansions and finders, built once per run.
pub struct QueryPlan {
    terms: Vec<PlannedTerm>,
}

impl QueryPlan {
    /// Prepares `terms` for matching under `config`.
    ///
    /// Fuzzy terms are expanded through a [`FuzzyCache`] so a term repeated
    /// in the query is only expanded once. Invalid regex terms are reported
    /// here, once, rather than by every worker.
    #[must_use]
    pub fn build(terms: Vec<SearchTerm>, config: &SearchConfig) -> Self {
        let mut cache = FuzzyCache::new();
        let case_sensitive = config.case_sensitive;

        let terms = terms
            .into_iter()
            .map(|term| {
                let needles = match term.kind {
                    TermKind::Regex => {
                        if let Err(e) = compile_regex(&term.text, case_sensitive) {
                            tracing::warn!("{e}; the term will not match");
                        }
                        Needles::Regex
                    }
                    _ if term.text.is_empty() => Needles::Literals(Vec::new()),
                    TermKind::Default | TermKind::Quoted => {
                        Needles::Literals(vec![LiteralFinder::new(&term.text, case_sensitive)])
                    }
                    TermKind::Fuzzy1 | TermKind::Fuzzy2 => {
                        let distance = fuzzy_distance(&term, config);
                        let base = if case_sensitive {
                            term.text.clone()
                        } else {
                            term.text.to_lowercase()
                        };
                        let variants = cache.get_or_expand(&base, distance);
                        Needles::Literals(
                            variants
                                .par_iter()
                                .map(|v| LiteralFinder::new(v, case_sensitive))
                                .collect(),
                        )
                    }
                };
                PlannedTerm { term, needles }
            })
            .collect();

        Self { terms }
    }

    #[must_use]
    pub fn terms(&self) -> &[PlannedTerm] {
        &self.terms
    }
}

/// Effective edit distance, downgrading long distance-2 terms.
fn fuzzy_distance(term: &SearchTerm, config: &SearchConfig) -> u8 {
    let distance = term.kind.fuzzy_distance().unwrap_or(1);
    let chars = term.text.chars().count();
    if distance == 2 && config.fuzzy2_max_term_chars > 0 && chars > config.fuzzy2_max_term_chars {
        tracing::warn!(
            "fuzzy term {:?} is {chars} characters long, expanding at distance 1 instead of 2",
            term.text
        );
        return 1;
    }
    distance
}

/// Worker-local match state.
#[derive(Default)]
pub struct MatchWorker {
    regexes: RegexCache,
}

impl MatchWorker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Filters and scores loaded files.
pub struct MatchEngine {
    plan: Arc<QueryPlan>,
    config: Arc<SearchConfig>,
    stats: Arc<PipelineStats>,
    concordance: Option<Concordance>,
}

impl MatchEngine {
    /// Creates the engine for one run.
    #[must_use]
    pub fn new(plan: Arc<QueryPlan>, config: Arc<SearchConfig>, stats: Arc<PipelineStats>) -> Self {
        let concordance = (config.rank == Rank::Concordance).then(|| {
            let terms: Vec<SearchTerm> = plan.terms().iter().map(|p| p.term.clone()).collect();
            Concordance::from_terms(&terms)
        });

        Self {
            plan,
            config,
            stats,
            concordance,
        }
    }

    /// Runs filters and term evaluation, forwarding only scored files.
    pub fn process(&self, worker: &mut MatchWorker, mut job: FileJob) -> Option<FileJob> {
        if !self.config.include_binary && is_binary(&job.content, self.config.binary_scan_bytes) {
            job.is_binary = true;
            self.stats.binary.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("skipping file identified as binary: {}", job.location.display());
            return None;
        }

        if !self.config.include_minified && is_minified(&job.content, self.config.min_line_length)
        {
            job.is_minified = true;
            self.stats.minified.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("skipping file identified as minified: {}", job.location.display());
            return None;
        }

        self.evaluate(worker, &mut job);
        if job.score.is_zero() {
            return None;
        }

        if let Some(concordance) = &self.concordance {
            job.score = concordance.score(&job.text());
        }

        self.stats.matched.fetch_add(1, Ordering::Relaxed);
        Some(job)
    }

    /// Evaluates every term against `job.content`, setting its score and
    /// match locations. Filters are not applied.
    pub fn evaluate(&self, worker: &mut MatchWorker, job: &mut FileJob) {
        let (score, locations) = self.score_content(worker, &job.content);
        job.score = score;
        job.match_locations = locations;
    }

    fn score_content(
        &self,
        worker: &mut MatchWorker,
        content: &[u8],
    ) -> (Score, BTreeMap<String, Vec<MatchSpan>>) {
        let haystack = Haystack::new(content);
        let mut score = Score::ZERO;
        let mut locations: BTreeMap<String, Vec<MatchSpan>> = BTreeMap::new();

        for planned in self.plan.terms() {
            let spans = match planned.find(worker, &haystack, &self.config) {
                Ok(spans) => spans,
                Err(e) => {
                    tracing::debug!("{e}");
                    Vec::new()
                }
            };

            if planned.term.negated {
                if spans.is_empty() {
                    continue;
                }
                return (Score::ZERO, BTreeMap::new());
            }

            if spans.is_empty() {
                return (Score::ZERO, BTreeMap::new());
            }

            score = score.add(spans.len() as f64);
            let entry = locations.entry(planned.term.text.clone()).or_default();
            entry.extend(spans);
            entry.sort_unstable();
            entry.dedup();
        }

        (score, locations)
    }
}
