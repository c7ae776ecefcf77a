//! Post-dispatch side effects and the task spawners that run them.

#![allow(missing_docs)]

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use smol_str::SmolStr;
use tracing::{debug, info, warn};

use crate::error::EffectError;
use crate::event::Event;

/// Persists device connectivity metadata.
pub trait MetadataClient: Send + Sync {
    /// Record that `device_name` answered at `millis` (Unix milliseconds).
    fn update_last_connected(&self, device_name: &str, millis: i64) -> Result<(), EffectError>;
}

/// Publishes read events to downstream consumers.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &Event, correlation_id: &str) -> Result<(), EffectError>;
}

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fire-and-forget job submission.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, name: &str, job: Job);
}

/// Runs each job on the calling thread before returning.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineSpawner;

impl TaskSpawner for InlineSpawner {
    fn spawn(&self, name: &str, job: Job) {
        run_job(name, job);
    }
}

struct QueuedJob {
    name: SmolStr,
    job: Job,
}

/// Single worker thread fed through an unbounded queue.
///
/// Jobs run in submission order. Dropping the queue closes it; the worker
/// finishes the jobs already queued and is joined.
pub struct BackgroundQueue {
    sender: Option<Sender<QueuedJob>>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundQueue {
    pub fn start(name: impl Into<String>) -> Result<Self, EffectError> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let name = name.into();
        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker(&name, receiver))
            .map_err(|err| EffectError::ThreadSpawn(err.to_string().into()))?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }
}

impl TaskSpawner for BackgroundQueue {
    fn spawn(&self, name: &str, job: Job) {
        let Some(sender) = &self.sender else {
            return;
        };
        let queued = QueuedJob {
            name: name.into(),
            job,
        };
        if sender.send(queued).is_err() {
            warn!("background worker stopped; dropping task {name}");
        }
    }
}

impl Drop for BackgroundQueue {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("background worker panicked");
            }
        }
    }
}

fn run_worker(name: &str, receiver: Receiver<QueuedJob>) {
    info!("background worker {name} started");
    for queued in receiver.iter() {
        run_job(&queued.name, queued.job);
    }
    info!("background worker {name} stopped");
}

fn run_job(name: &str, job: Job) {
    debug!("running side effect {name}");
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        warn!("side effect {name} panicked");
    }
}
