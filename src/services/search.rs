//! Search service wiring the staged pipeline together.
//!
//! ```text
//! paths ─▶ [loader × N] ─▶ [matcher × 4N] ─▶ collector ─▶ ranked results
//! ```
//!
//! Each arrow is a bounded channel. The caller supplies the path channel
//! (from [`spawn_walker`](crate::services::walker::spawn_walker),
//! [`spawn_paths`](crate::services::walker::spawn_paths) or its own
//! producer); the collector runs on the calling thread.

use crate::config::SearchConfig;
use crate::error::Result;
use crate::query::parse_arguments;
use crate::services::collector::ResultCollector;
use crate::services::loader;
use crate::services::matcher::{MatchEngine, MatchWorker, QueryPlan};
use crate::services::pool::{spawn_stage, CancelToken};
use crate::services::walker::{spawn_walker, WalkConfig};
use crate::types::{FileJob, SearchTerm};
use crossbeam_channel::Receiver;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters shared by every stage of one run.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub files_seen: AtomicUsize,
    pub files_loaded: AtomicUsize,
    pub read_errors: AtomicUsize,
    pub binary: AtomicUsize,
    pub minified: AtomicUsize,
    pub matched: AtomicUsize,
}

impl PipelineStats {
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            files_seen: self.files_seen.load(Ordering::Relaxed),
            files_loaded: self.files_loaded.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            binary: self.binary.load(Ordering::Relaxed),
            minified: self.minified.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub files_seen: usize,
    pub files_loaded: usize,
    pub read_errors: usize,
    pub binary: usize,
    pub minified: usize,
    pub matched: usize,
}

/// Result of one search run.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Best matches, highest score first
    pub results: Vec<FileJob>,
    /// Matching files, including any beyond the result limit
    pub total_matches: usize,
    pub stats: StatsSnapshot,
}

impl SearchOutcome {
    /// Whether matching files were left out by the result limit.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.total_matches > self.results.len()
    }
}

/// Runs queries through the loader, matcher and collector stages.
#[derive(Debug, Clone)]
pub struct SearchService {
    config: Arc<SearchConfig>,
}

impl SearchService {
    #[must_use]
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Searches every job arriving on `input` until it closes.
    ///
    /// # Errors
    ///
    /// Returns a pipeline error if a worker cannot be spawned or panics.
    /// Per-file problems never fail the run.
    pub fn search(
        &self,
        terms: Vec<SearchTerm>,
        input: Receiver<FileJob>,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome> {
        let start = Instant::now();
        let config = &self.config;
        let capacity = config.resolved_channel_capacity();
        let stats = Arc::new(PipelineStats::default());

        let plan = Arc::new(QueryPlan::build(terms, config));
        tracing::debug!("query plan ready in {:?}", start.elapsed());

        let load_stats = Arc::clone(&stats);
        let (loaded, loaders) = spawn_stage(
            "loader",
            config.resolved_loader_workers(),
            capacity,
            input,
            cancel,
            |_| (),
            move |_, job: FileJob| {
                load_stats.files_seen.fetch_add(1, Ordering::Relaxed);
                loader::load(job, &load_stats)
            },
        )?;

        let engine = MatchEngine::new(plan, Arc::clone(config), Arc::clone(&stats));
        let (matched, matchers) = spawn_stage(
            "matcher",
            config.resolved_matcher_workers(),
            capacity,
            loaded,
            cancel,
            |_| MatchWorker::new(),
            move |worker: &mut MatchWorker, job: FileJob| engine.process(worker, job),
        )?;

        let collected = ResultCollector::new(config.result_limit).collect(&matched);

        loaders.join()?;
        matchers.join()?;

        let stats = stats.snapshot();
        tracing::debug!(
            "searched {} files in {:?}: {} loaded, {} unreadable, {} binary, {} minified, {} matched",
            stats.files_seen,
            start.elapsed(),
            stats.files_loaded,
            stats.read_errors,
            stats.binary,
            stats.minified,
            stats.matched
        );

        Ok(SearchOutcome {
            results: collected.results,
            total_matches: collected.total_matches,
            stats,
        })
    }

    /// Parses `query` and searches every file under `root`.
    ///
    /// # Errors
    ///
    /// Returns `CsError::Config` for an invalid walk filter, or a
    /// pipeline error if any stage fails to start or panics.
    pub fn search_dir<S: AsRef<str>>(
        &self,
        root: &Path,
        query: &[S],
        walk: &WalkConfig,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome> {
        let terms = parse_arguments(query, self.config.fuzzy);
        tracing::info!(
            "searching {} for {} term(s)",
            root.display(),
            terms.len()
        );

        let (paths, walker) =
            spawn_walker(root, walk, self.config.resolved_channel_capacity(), cancel)?;
        let outcome = self.search(terms, paths, cancel)?;
        walker.join()?;
        Ok(outcome)
    }
}
