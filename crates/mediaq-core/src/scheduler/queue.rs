//! Pending queue and active set. Always accessed under the scheduler's mutex.

use std::collections::{HashMap, VecDeque};
use tokio_util::sync::CancellationToken;

use crate::job::{Job, JobId, JobRequest, JobStatus};

/// A job occupying a concurrency slot.
pub(super) struct ActiveJob {
    pub job: Job,
    pub cancel: CancellationToken,
    /// Last error the tool reported; used when the outcome carries no message.
    pub last_error: Option<String>,
}

/// What a worker needs to start a promoted job.
pub(super) struct Admission {
    pub id: JobId,
    pub request: JobRequest,
    pub cancel: CancellationToken,
}

pub(super) struct QueueState {
    pending: VecDeque<Job>,
    active: HashMap<JobId, ActiveJob>,
    ceiling: usize,
}

impl QueueState {
    pub fn new(ceiling: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            active: HashMap::new(),
            ceiling: ceiling.max(1),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn enqueue(&mut self, job: Job) {
        self.pending.push_back(job);
    }

    /// Move the queue head into the active set if a slot is free.
    pub fn promote_next(&mut self) -> Option<Admission> {
        if self.active.len() >= self.ceiling {
            return None;
        }
        let mut job = self.pending.pop_front()?;
        job.status = JobStatus::Downloading;
        let admission = Admission {
            id: job.id,
            request: job.request.clone(),
            cancel: CancellationToken::new(),
        };
        self.active.insert(
            job.id,
            ActiveJob {
                job,
                cancel: admission.cancel.clone(),
                last_error: None,
            },
        );
        Some(admission)
    }

    pub fn remove_pending(&mut self, id: JobId) -> Option<Job> {
        let pos = self.pending.iter().position(|j| j.id == id)?;
        self.pending.remove(pos)
    }

    pub fn remove_active(&mut self, id: JobId) -> Option<ActiveJob> {
        self.active.remove(&id)
    }

    pub fn active_mut(&mut self, id: JobId) -> Option<&mut ActiveJob> {
        self.active.get_mut(&id)
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.active
            .get(&id)
            .map(|a| &a.job)
            .or_else(|| self.pending.iter().find(|j| j.id == id))
    }

    /// Active jobs by id, then pending jobs in queue order.
    pub fn snapshot(&self) -> Vec<Job> {
        let mut active: Vec<Job> = self.active.values().map(|a| a.job.clone()).collect();
        active.sort_by_key(|j| j.id);
        active.extend(self.pending.iter().cloned());
        active
    }

    /// Ids of every non-terminal job, queued ones last.
    pub fn live_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.active.keys().copied().collect();
        ids.sort();
        ids.extend(self.pending.iter().map(|j| j.id));
        ids
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: u64) -> Job {
        Job::new(JobId(id), JobRequest::new(format!("https://e.com/{id}"), "/tmp"))
    }

    #[test]
    fn promotion_respects_ceiling_and_fifo() {
        let mut q = QueueState::new(2);
        for id in 1..=4 {
            q.enqueue(job(id));
        }
        assert_eq!(q.promote_next().map(|a| a.id), Some(JobId(1)));
        assert_eq!(q.promote_next().map(|a| a.id), Some(JobId(2)));
        assert!(q.promote_next().is_none());
        assert_eq!(q.active_len(), 2);
        assert_eq!(q.pending_len(), 2);
        assert_eq!(q.get(JobId(1)).map(|j| j.status), Some(JobStatus::Downloading));
        assert_eq!(q.get(JobId(3)).map(|j| j.status), Some(JobStatus::Queued));

        q.remove_active(JobId(1));
        assert_eq!(q.promote_next().map(|a| a.id), Some(JobId(3)));
    }

    #[test]
    fn zero_ceiling_still_admits_one() {
        let mut q = QueueState::new(0);
        q.enqueue(job(1));
        assert_eq!(q.ceiling(), 1);
        assert!(q.promote_next().is_some());
    }

    #[test]
    fn remove_pending_keeps_order() {
        let mut q = QueueState::new(1);
        for id in 1..=3 {
            q.enqueue(job(id));
        }
        assert!(q.remove_pending(JobId(2)).is_some());
        assert!(q.remove_pending(JobId(2)).is_none());
        let ids: Vec<_> = q.snapshot().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![JobId(1), JobId(3)]);
    }

    #[test]
    fn snapshot_lists_active_then_pending() {
        let mut q = QueueState::new(2);
        for id in [5, 3, 9] {
            q.enqueue(job(id));
        }
        q.promote_next();
        q.promote_next();
        let ids: Vec<_> = q.snapshot().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![JobId(3), JobId(5), JobId(9)]);
        assert_eq!(q.live_ids(), vec![JobId(3), JobId(5), JobId(9)]);
    }
}
