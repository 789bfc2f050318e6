//! Staged worker pools connected by bounded channels.
//!
//! Every stage of the pipeline is the same shape: a fixed number of
//! worker threads reading from one channel and writing to the next.
//! [`spawn_stage`] builds that shape once so the loader and matcher do not
//! each reimplement shutdown.
//!
//! # Shutdown
//!
//! Each worker owns a clone of the output `Sender`. When the input
//! channel is closed and drained every worker returns, the last sender is
//! dropped and the output channel closes, which in turn ends the next
//! stage. If the next stage goes away first (cancellation), sends fail
//! and workers stop early; their dropped receivers propagate the same
//! signal upstream.

use crate::error::PipelineError;
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Cooperative cancellation flag shared by every stage of a run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Join handles for one stage's workers.
#[derive(Debug)]
pub struct StageHandle {
    name: &'static str,
    workers: Vec<JoinHandle<()>>,
}

impl StageHandle {
    /// Wraps a single producer thread so it joins like a stage.
    #[must_use]
    pub fn from_thread(name: &'static str, handle: JoinHandle<()>) -> Self {
        Self {
            name,
            workers: vec![handle],
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::WorkerPanicked` if any worker panicked.
    pub fn join(self) -> Result<(), PipelineError> {
        let mut panicked = false;
        for worker in self.workers {
            if worker.join().is_err() {
                tracing::error!("{} worker panicked", self.name);
                panicked = true;
            }
        }
        if panicked {
            Err(PipelineError::WorkerPanicked { stage: self.name })
        } else {
            Ok(())
        }
    }
}

/// Spawns a pool of `workers` threads transforming `input` into a new
/// bounded channel of `capacity`.
///
/// `init` runs once on each worker thread to build its private state
/// (for example a regex cache); `work` maps one job to an optional
/// output, where `None` drops the job.
///
/// # Errors
///
/// Returns `PipelineError::Spawn` if a worker thread cannot be started.
/// Workers already running wind down on their own once the returned
/// receiver is dropped.
pub fn spawn_stage<I, O, S, Init, F>(
    name: &'static str,
    workers: usize,
    capacity: usize,
    input: Receiver<I>,
    cancel: &CancelToken,
    init: Init,
    work: F,
) -> Result<(Receiver<O>, StageHandle), PipelineError>
where
    I: Send + 'static,
    O: Send + 'static,
    Init: Fn(usize) -> S + Send + Sync + 'static,
    F: Fn(&mut S, I) -> Option<O> + Send + Sync + 'static,
{
    let (tx, rx) = bounded::<O>(capacity.max(1));
    let init = Arc::new(init);
    let work = Arc::new(work);
    let mut handles = Vec::with_capacity(workers.max(1));

    for id in 0..workers.max(1) {
        let input = input.clone();
        let tx = tx.clone();
        let init = Arc::clone(&init);
        let work = Arc::clone(&work);
        let cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name(format!("cs-{name}-{id}"))
            .spawn(move || {
                let mut state = init(id);
                for job in &input {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if let Some(out) = work(&mut state, job) {
                        if tx.send(out).is_err() {
                            // Downstream is gone
                            break;
                        }
                    }
                }
            })
            .map_err(|source| PipelineError::Spawn {
                stage: name,
                source,
            })?;
        handles.push(handle);
    }

    Ok((
        rx,
        StageHandle {
            name,
            workers: handles,
        },
    ))
}
