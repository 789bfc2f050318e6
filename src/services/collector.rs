//! Result collector.
//!
//! Drains the match engine's output and keeps the best `limit` files.
//! The channel is always drained to closure so upstream workers never
//! block on a full channel, even once the limit is reached.

use crate::types::FileJob;
use crossbeam_channel::Receiver;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A job ordered by rank: higher score first, then earlier discovery.
struct Ranked(FileJob);

impl Ranked {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.0
            .score
            .rank_cmp(other.0.score)
            .then_with(|| other.0.ordinal.cmp(&self.0.ordinal))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_cmp(other)
    }
}

/// Outcome of draining the match channel.
#[derive(Debug, Default)]
pub struct Collected {
    /// Retained jobs, best first
    pub results: Vec<FileJob>,
    /// Matching files seen, including those past the limit
    pub total_matches: usize,
}

impl Collected {
    /// Whether matching files were dropped by the limit.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.total_matches > self.results.len()
    }
}

/// Keeps the top `limit` jobs by score (0 = keep everything).
#[derive(Debug, Clone, Copy)]
pub struct ResultCollector {
    limit: usize,
}

impl ResultCollector {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Drains `input` until it closes.
    #[must_use]
    pub fn collect(&self, input: &Receiver<FileJob>) -> Collected {
        self.collect_iter(input.iter())
    }

    /// Ranks an already materialized sequence of jobs.
    pub fn collect_iter(&self, jobs: impl IntoIterator<Item = FileJob>) -> Collected {
        // Min-heap on rank: the root is the weakest retained job.
        let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::new();
        let mut total_matches = 0;

        for job in jobs {
            total_matches += 1;
            let candidate = Ranked(job);

            if self.limit == 0 || heap.len() < self.limit {
                heap.push(Reverse(candidate));
                continue;
            }

            if let Some(mut weakest) = heap.peek_mut() {
                if candidate > weakest.0 {
                    *weakest = Reverse(candidate);
                }
            }
        }

        // Ascending order of Reverse<Ranked> is descending rank.
        let results = heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(Ranked(job))| job)
            .collect();

        Collected {
            results,
            total_matches,
        }
    }
}
