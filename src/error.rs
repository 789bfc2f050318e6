//! Error types for cs.
//!
//! Uses thiserror for ergonomic error handling with proper
//! error chain propagation. Only [`CsError`] ever reaches the caller;
//! per-file errors stay inside their pipeline stage.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level run error.
#[derive(Error, Debug)]
pub enum CsError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot open output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures setting up or tearing down the staged pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to spawn {stage} worker: {source}")]
    Spawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} worker panicked")]
    WorkerPanicked { stage: &'static str },
}

/// Regex term errors. Never fatal: callers treat them as "no match".
#[derive(Error, Debug, Clone)]
pub enum PatternError {
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("Regex evaluation fault for '{pattern}'")]
    EvaluationFault { pattern: String },
}

/// Per-file load errors. The job is dropped and the run continues.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, CsError>;

/// Result type alias for regex term evaluation.
pub type PatternResult<T> = std::result::Result<T, PatternError>;

// Error code implementations for machine-readable error output
impl CsError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pipeline(e) => e.code(),
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Output { .. } => "OUTPUT_ERROR",
        }
    }
}

impl PipelineError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "SPAWN_ERROR",
            Self::WorkerPanicked { .. } => "WORKER_PANICKED",
        }
    }
}

impl PatternError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRegex { .. } => "INVALID_REGEX",
            Self::EvaluationFault { .. } => "REGEX_FAULT",
        }
    }
}

impl LoadError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Stat { .. } => "STAT_ERROR",
            Self::Read { .. } => "READ_ERROR",
        }
    }
}
