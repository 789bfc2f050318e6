//! File content loader stage.
//!
//! Turns a [`FileJob`] carrying only a location into one carrying the
//! file's bytes, capped at [`MAX_READ_BYTES`]. Unreadable files are
//! dropped; the run carries on.

use crate::error::LoadError;
use crate::services::search::PipelineStats;
use crate::types::{FileJob, MAX_READ_BYTES};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// Reads at most `cap` bytes of `path`.
///
/// # Errors
///
/// Returns `LoadError::Stat` if metadata cannot be read, or
/// `LoadError::Read` if opening or reading fails.
pub fn read_capped(path: &Path, cap: u64) -> Result<Vec<u8>, LoadError> {
    let metadata = fs::metadata(path).map_err(|source| LoadError::Stat {
        path: path.to_path_buf(),
        source,
    })?;

    let read_err = |source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    };

    let expected = metadata.len().min(cap);
    let file = File::open(path).map_err(read_err)?;
    let mut content = Vec::with_capacity(usize::try_from(expected).unwrap_or(0));
    file.take(cap).read_to_end(&mut content).map_err(read_err)?;
    Ok(content)
}

/// Populates `job.content`, returning `None` if the file cannot be read.
pub fn load(mut job: FileJob, stats: &PipelineStats) -> Option<FileJob> {
    let start = Instant::now();

    match read_capped(&job.location, MAX_READ_BYTES) {
        Ok(content) => {
            tracing::trace!(
                "read {} ({} bytes) in {:?}",
                job.location.display(),
                content.len(),
                start.elapsed()
            );
            stats.files_loaded.fetch_add(1, Ordering::Relaxed);
            job.content = content;
            Some(job)
        }
        Err(e) => {
            tracing::info!("skipping {}: {e}", job.filename);
            stats.read_errors.fetch_add(1, Ordering::Relaxed);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_small_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small.txt");
        fs::write(&path, "hello world").unwrap();

        let content = read_capped(&path, MAX_READ_BYTES).unwrap();
        assert_eq!(content, b"hello world");
    }

    #[test]
    fn test_read_respects_cap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, vec![b'a'; 4096]).unwrap();

        let content = read_capped(&path, 1000).unwrap();
        assert_eq!(content.len(), 1000);
    }

    #[test]
    fn test_huge_file_truncated_to_max_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.txt");
        fs::write(&path, vec![b'x'; (MAX_READ_BYTES + 10) as usize]).unwrap();

        let stats = PipelineStats::default();
        let job = load(FileJob::new(&path, 0), &stats).unwrap();
        assert_eq!(job.content.len() as u64, MAX_READ_BYTES);
    }

    #[test]
    fn test_missing_file_dropped() {
        let dir = TempDir::new().unwrap();
        let stats = PipelineStats::default();

        let job = FileJob::new(dir.path().join("missing.txt"), 0);
        assert!(load(job, &stats).is_none());
        assert_eq!(stats.read_errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.files_loaded.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_missing_file_is_stat_error() {
        let err = read_capped(Path::new("/definitely/not/here"), 10).unwrap_err();
        assert_eq!(err.code(), "STAT_ERROR");
    }
}
