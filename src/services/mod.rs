//! Pipeline stages and the service that wires them together.

pub mod collector;
pub mod fuzzy;
pub mod loader;
pub mod matcher;
pub mod pool;
pub mod rank;
mod search;
pub mod walker;

pub use collector::{Collected, ResultCollector};
pub use fuzzy::FuzzyCache;
pub use matcher::{MatchEngine, MatchWorker, QueryPlan};
pub use pool::{spawn_stage, CancelToken, StageHandle};
pub use rank::Concordance;
pub use search::{PipelineStats, SearchOutcome, SearchService, StatsSnapshot};
pub use walker::{find_repository_root, spawn_paths, spawn_walker, WalkConfig};
