//! Common test utilities for cs integration tests.
//!
//! Provides `TestEnv` for setting up an isolated directory tree and
//! running searches over it.

#![allow(dead_code)] // Test utilities may not all be used in every test file

use cs::{CancelToken, FileJob, SearchConfig, SearchOutcome, SearchService, WalkConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A temporary directory tree to search.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    /// Creates a new empty test environment.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Writes a file to the test directory.
    pub fn write_file(&self, name: &str, content: &str) {
        self.write_bytes(name, content.as_bytes());
    }

    /// Writes raw bytes to the test directory.
    pub fn write_bytes(&self, name: &str, content: &[u8]) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&path, content).expect("Failed to write test file");
    }

    /// Gets the full path to a file in the test directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Searches the whole tree with `config`.
    pub fn search_with(&self, query: &[&str], config: SearchConfig) -> SearchOutcome {
        SearchService::new(config)
            .search_dir(
                self.dir.path(),
                query,
                &WalkConfig::default(),
                &CancelToken::new(),
            )
            .expect("Search failed")
    }

    /// Searches the whole tree with default settings.
    pub fn search(&self, query: &[&str]) -> SearchOutcome {
        self.search_with(query, SearchConfig::default())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// File names of the results, in rank order.
pub fn names(results: &[FileJob]) -> Vec<&str> {
    results.iter().map(|j| j.filename.as_str()).collect()
}

/// Creates a small source tree used across tests.
pub fn rust_codebase() -> TestEnv {
    let env = TestEnv::new();

    env.write_file(
        "main.rs",
        r#"fn main() {
    let config = Config::load();
    let result = authenticate(&config);
    println!("{:?}", result);
}
"#,
    );

    env.write_file(
        "auth.rs",
        r#"use crate::config::Config;

/// Authenticates a user with the given configuration.
pub fn authenticate(config: &Config) -> Result<User, AuthError> {
    let credentials = config.credentials();
    validate_credentials(&credentials)?;
    Ok(User::new("authenticated_user"))
}
"#,
    );

    env.write_file(
        "config.rs",
        r#"/// Application configuration.
pub struct Config {
    api_key: String,
    timeout: u64,
}
"#,
    );

    env.write_file("src/nested/deep.rs", "pub fn deep_function() {}\n");

    env
}

/// Asserts that results contain a file with the given name.
pub fn assert_results_contain(results: &[FileJob], filename: &str) {
    assert!(
        results.iter().any(|r| r.filename == filename),
        "Expected results to contain '{}', but got: {:?}",
        filename,
        names(results)
    );
}

/// Asserts that results do NOT contain a file with the given name.
pub fn assert_results_not_contain(results: &[FileJob], filename: &str) {
    assert!(
        !results.iter().any(|r| r.filename == filename),
        "Expected results NOT to contain '{}', but it was found",
        filename
    );
}
