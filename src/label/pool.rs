//! Parallel label resolution.
//!
//! Record labels are independent of each other, so a batch of keys can be
//! resolved on a small bounded worker pool. Results come back tagged with
//! their input position and are reassembled in input order, so
//! [`LabelPool::labels`] and [`LabelPool::merged_label`] report the same
//! error for the same batch.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use tracing::debug;

use crate::class::InstanceKey;
use crate::error::{ExecutionError, PresentationError, PresentationResult};
use crate::label::LabelMerger;
use crate::value::LabelValue;

/// Resolves the label of one record.
pub trait LabelResolver: Send + Sync {
    /// Resolves the display label of `key`.
    fn resolve_label(&self, key: &InstanceKey) -> PresentationResult<LabelValue>;
}

type Reply = (usize, PresentationResult<LabelValue>);

struct Job {
    position: usize,
    key: InstanceKey,
    reply: Sender<Reply>,
}

/// Handle of one submitted label job.
pub struct LabelHandle {
    rx: Receiver<Reply>,
}

impl LabelHandle {
    /// Waits for the label.
    pub fn join(self) -> PresentationResult<LabelValue> {
        let (_, result) = self
            .rx
            .recv()
            .map_err(|_| PresentationError::Execution(ExecutionError::Disconnected))?;
        result
    }
}

/// Bounded worker pool resolving labels.
pub struct LabelPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl LabelPool {
    /// Starts `workers` threads over `resolver`.
    pub fn start(
        resolver: Arc<dyn LabelResolver>,
        workers: usize,
        queue_capacity: usize,
    ) -> PresentationResult<Self> {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let mut pool = Self {
            tx: Some(tx),
            workers: Vec::with_capacity(workers),
            queue_capacity,
        };
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let resolver = Arc::clone(&resolver);
            let handle = thread::Builder::new()
                .name(format!("presentation-label-{idx}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        let result = resolver.resolve_label(&job.key);
                        let _ = job.reply.send((job.position, result));
                    }
                })
                .map_err(|e| {
                    PresentationError::Execution(ExecutionError::WorkerSpawn {
                        message: e.to_string(),
                    })
                })?;
            pool.workers.push(handle);
        }
        debug!(workers, queue_capacity, "label pool started");
        Ok(pool)
    }

    fn sender(&self) -> PresentationResult<&Sender<Job>> {
        self.tx
            .as_ref()
            .ok_or(PresentationError::Execution(ExecutionError::Disconnected))
    }

    /// Queues one key without blocking.
    pub fn submit(&self, key: InstanceKey) -> PresentationResult<LabelHandle> {
        let (reply, rx) = bounded::<Reply>(1);
        let job = Job {
            position: 0,
            key,
            reply,
        };
        match self.sender()?.try_send(job) {
            Ok(()) => Ok(LabelHandle { rx }),
            Err(TrySendError::Full(_)) => Err(PresentationError::Execution(ExecutionError::QueueFull {
                capacity: self.queue_capacity,
            })),
            Err(TrySendError::Disconnected(_)) => Err(PresentationError::Execution(ExecutionError::Disconnected)),
        }
    }

    fn dispatch(&self, keys: &[InstanceKey]) -> PresentationResult<Receiver<Reply>> {
        let (reply, rx) = unbounded::<Reply>();
        let tx = self.sender()?;
        for (position, key) in keys.iter().enumerate() {
            let job = Job {
                position,
                key: key.clone(),
                reply: reply.clone(),
            };
            tx.send(job)
                .map_err(|_| PresentationError::Execution(ExecutionError::Disconnected))?;
        }
        Ok(rx)
    }

    /// Labels of `keys`, in input order. Fails with the first error by position.
    pub fn labels(&self, keys: &[InstanceKey]) -> PresentationResult<Vec<LabelValue>> {
        let rx = self.dispatch(keys)?;
        let mut slots: Vec<Option<PresentationResult<LabelValue>>> = Vec::with_capacity(keys.len());
        slots.resize_with(keys.len(), || None);
        for _ in 0..keys.len() {
            let (position, result) = rx
                .recv()
                .map_err(|_| PresentationError::Execution(ExecutionError::Disconnected))?;
            slots[position] = Some(result);
        }
        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(PresentationError::Execution(ExecutionError::Disconnected))))
            .collect()
    }

    /// Merged label of `keys`. Fails with the first error by position.
    pub fn merged_label(&self, keys: &[InstanceKey]) -> PresentationResult<LabelValue> {
        let mut merger = LabelMerger::new();
        for label in self.labels(keys)? {
            merger.push(label);
        }
        Ok(merger.finish())
    }

    /// Stops accepting jobs, drains the queue and joins the workers.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Closing the channel lets workers drain queued jobs and exit.
        self.tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for LabelPool {
    fn drop(&mut self) {
        self.stop();
    }
}
