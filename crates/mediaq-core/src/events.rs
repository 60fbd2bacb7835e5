//! Typed job events and the subscriber registry that fans them out.
//!
//! Each subscriber gets its own bounded channel. Publishing never waits: a
//! subscriber whose channel is full misses that event, and subscribers whose
//! receiver was dropped are pruned on the next publish.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::job::{JobId, JobStatus};
use crate::progress::ProgressEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Created { job_id: JobId, url: String },
    StatusChanged { job_id: JobId, status: JobStatus },
    Progress(ProgressEvent),
    TitleResolved { job_id: JobId, title: String },
    ThumbnailResolved { job_id: JobId, thumbnail: String },
    /// Terminal transition; `error` is set only for `JobStatus::Error`.
    Finished {
        job_id: JobId,
        status: JobStatus,
        error: Option<String>,
    },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Created { job_id, .. }
            | JobEvent::StatusChanged { job_id, .. }
            | JobEvent::TitleResolved { job_id, .. }
            | JobEvent::ThumbnailResolved { job_id, .. }
            | JobEvent::Finished { job_id, .. } => *job_id,
            JobEvent::Progress(ev) => ev.job_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Receiving end handed to a subscriber.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub events: mpsc::Receiver<JobEvent>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<SubscriberId, mpsc::Sender<JobEvent>>,
}

/// Cloneable handle to one shared subscriber registry.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
    capacity: usize,
}

impl EventBus {
    /// `capacity` is the per-subscriber buffer size.
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut reg = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriberId(reg.next_id);
        reg.next_id += 1;
        reg.subscribers.insert(id, tx);
        Subscription { id, events: rx }
    }

    /// Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .remove(&id)
            .is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }

    pub fn publish(&self, event: JobEvent) {
        let mut reg = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let mut closed = Vec::new();
        for (id, tx) in reg.subscribers.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(subscriber = id.0, job_id = %event.job_id(), "subscriber lagging, event dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }
        for id in closed {
            reg.subscribers.remove(&id);
        }
    }
}
