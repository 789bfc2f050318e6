//! Path producer.
//!
//! Walks a directory tree on its own thread and feeds location-only
//! [`FileJob`]s into the pipeline. Entries are visited in file-name order
//! so discovery ordinals, and with them tie-breaks in the ranking, are
//! stable from run to run.

use crate::error::{CsError, PipelineError, Result};
use crate::services::pool::{CancelToken, StageHandle};
use crate::types::FileJob;
use ahash::AHashSet;
use crossbeam_channel::{bounded, Receiver};
use ignore::{DirEntry, WalkBuilder};
use regex::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Directory markers that identify a repository root.
const REPOSITORY_MARKERS: &[&str] = &[".git", ".hg"];

/// Which files the walker yields.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Include dot-files and dot-directories
    pub include_hidden: bool,
    /// Honor `.gitignore` files
    pub git_ignore: bool,
    /// Honor `.ignore` files
    pub ignore_files: bool,
    /// Directory names never descended into
    pub exclude_dirs: Vec<String>,
    /// Case-insensitive regexes; a file whose path matches any is skipped
    pub exclude_patterns: Vec<String>,
    /// Extensions to keep, without the dot (empty = all)
    pub include_ext: Vec<String>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            include_hidden: false,
            git_ignore: true,
            ignore_files: true,
            exclude_dirs: vec![".git".into(), ".hg".into(), ".svn".into()],
            exclude_patterns: Vec::new(),
            include_ext: Vec::new(),
        }
    }
}

/// Compiled form of the per-file filters in [`WalkConfig`].
struct PathFilter {
    exclude_dirs: AHashSet<String>,
    exclude_patterns: Vec<Regex>,
    include_ext: AHashSet<String>,
}

impl PathFilter {
    fn new(config: &WalkConfig) -> Result<Self> {
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| CsError::Config(format!("invalid exclude pattern '{p}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            exclude_dirs: config.exclude_dirs.iter().cloned().collect(),
            exclude_patterns,
            include_ext: config
                .include_ext
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        })
    }

    fn descend(&self, entry: &DirEntry) -> bool {
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        !(is_dir && self.exclude_dirs.contains(entry.file_name().to_string_lossy().as_ref()))
    }

    fn accept(&self, path: &Path) -> bool {
        if !self.include_ext.is_empty() {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if !self.include_ext.contains(&ext) {
                return false;
            }
        }

        let shown = path.to_string_lossy();
        if let Some(pattern) = self.exclude_patterns.iter().find(|re| re.is_match(&shown)) {
            tracing::debug!("skipping {shown}: matches exclude pattern {}", pattern.as_str());
            return false;
        }
        true
    }
}

/// Walks `root` on a background thread, sending jobs into a bounded
/// channel of `capacity`.
///
/// # Errors
///
/// Returns `CsError::Config` for an invalid exclude pattern, or a
/// pipeline error if the walker thread cannot be started.
pub fn spawn_walker(
    root: &Path,
    config: &WalkConfig,
    capacity: usize,
    cancel: &CancelToken,
) -> Result<(Receiver<FileJob>, StageHandle)> {
    let filter = Arc::new(PathFilter::new(config)?);
    let descend = Arc::clone(&filter);

    let walker = WalkBuilder::new(root)
        .hidden(!config.include_hidden)
        .git_ignore(config.git_ignore)
        .git_global(config.git_ignore)
        .git_exclude(config.git_ignore)
        .require_git(false)
        .ignore(config.ignore_files)
        .parents(config.git_ignore || config.ignore_files)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| descend.descend(entry))
        .build();

    let (tx, rx) = bounded(capacity.max(1));
    let cancel = cancel.clone();
    let root = root.to_path_buf();

    let handle = thread::Builder::new()
        .name("cs-walker".into())
        .spawn(move || {
            let mut ordinal = 0u64;
            for entry in walker {
                if cancel.is_cancelled() {
                    break;
                }

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::info!("walk error under {}: {e}", root.display());
                        continue;
                    }
                };

                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                if !filter.accept(entry.path()) {
                    continue;
                }

                let job = FileJob::new(entry.into_path(), ordinal);
                ordinal += 1;
                if tx.send(job).is_err() {
                    break;
                }
            }
            tracing::trace!("walker yielded {ordinal} files");
        })
        .map_err(|source| PipelineError::Spawn {
            stage: "walker",
            source,
        })?;

    Ok((rx, StageHandle::from_thread("walker", handle)))
}

/// Feeds an explicit list of paths, numbered in iteration order.
///
/// # Errors
///
/// Returns a pipeline error if the feeder thread cannot be started.
pub fn spawn_paths<I>(
    paths: I,
    capacity: usize,
    cancel: &CancelToken,
) -> Result<(Receiver<FileJob>, StageHandle)>
where
    I: IntoIterator<Item = PathBuf>,
    I::IntoIter: Send + 'static,
{
    let paths = paths.into_iter();
    let (tx, rx) = bounded(capacity.max(1));
    let cancel = cancel.clone();

    let handle = thread::Builder::new()
        .name("cs-paths".into())
        .spawn(move || {
            for (ordinal, path) in (0u64..).zip(paths) {
                if cancel.is_cancelled() || tx.send(FileJob::new(path, ordinal)).is_err() {
                    break;
                }
            }
        })
        .map_err(|source| PipelineError::Spawn {
            stage: "paths",
            source,
        })?;

    Ok((rx, StageHandle::from_thread("paths", handle)))
}

/// Nearest ancestor of `start` (inclusive) holding a `.git` or `.hg`
/// directory, or `start` itself if there is none.
#[must_use]
pub fn find_repository_root(start: &Path) -> PathBuf {
    let start = dunce::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());

    start
        .ancestors()
        .find(|dir| REPOSITORY_MARKERS.iter().any(|m| dir.join(m).exists()))
        .map_or_else(|| start.clone(), Path::to_path_buf)
}
