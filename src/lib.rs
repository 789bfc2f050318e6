//! cs: concurrent code search.
//!
//! Searches a directory tree for files matching a query of literal,
//! quoted, regex and fuzzy terms, ranks them and extracts highlighted
//! snippets. There is no index: every run reads the files it searches.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │           Query Parser / QueryPlan          │
//! │   terms, fuzzy expansion, literal finders   │
//! └─────────────────┬───────────────────────────┘
//!                   │ Arc (read-only)
//! ┌──────────┐   ┌──▼──────────┐   ┌──────────────┐
//! │  Walker  │──▶│ Loader × N  │──▶│ Matcher × 4N │
//! │ (ignore) │   │ (1 MB cap)  │   │ memchr/regex │
//! └──────────┘   └─────────────┘   └──────┬───────┘
//!        bounded crossbeam channels       │
//!                                  ┌──────▼───────┐
//!                                  │  Collector   │
//!                                  │ top-k heap   │
//!                                  └──────┬───────┘
//!                                  ┌──────▼───────┐
//!                                  │ Snippets/fmt │
//!                                  └──────────────┘
//! ```

pub mod config;
pub mod error;
pub mod fmt;
pub mod query;
pub mod services;
pub mod snippet;
pub mod types;

pub use config::{Rank, SearchConfig};
pub use error::{CsError, Result};
pub use query::{parse_arguments, parse_query};
pub use services::{CancelToken, SearchOutcome, SearchService, WalkConfig};
pub use snippet::{extract_snippet, highlight};
pub use types::{FileJob, MatchSpan, Score, SearchTerm, TermKind};
