//! Shared pool of pending jobs.
//!
//! Unordered multi-producer/multi-consumer pool. `try_take` never blocks; an
//! empty result only means "nothing pending right now". Workers re-insert their
//! own retried jobs and loop back, so a retried job is never stranded.

use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::Job;

/// Initial order of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueOrder {
    /// Shuffle to spread concurrent load across index shards.
    #[default]
    Shuffled,
    /// Keep the order jobs were built in.
    InOrder,
}

#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    inner: Arc<Mutex<VecDeque<Job>>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue pre-filled with `jobs`, shuffled unless `order` is `InOrder`.
    pub fn from_jobs(mut jobs: Vec<Job>, order: QueueOrder) -> Self {
        if order == QueueOrder::Shuffled {
            jobs.shuffle(&mut rand::thread_rng());
        }
        Self {
            inner: Arc::new(Mutex::new(jobs.into())),
        }
    }

    /// Take any pending job, or `None` when nothing is pending.
    pub fn try_take(&self) -> Option<Job> {
        self.lock().pop_front()
    }

    /// Add a job (new or retried). Never blocks on capacity.
    pub fn put(&self, job: Job) {
        self.lock().push_back(job);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A worker that panicked while holding the lock left the deque intact.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::build_jobs;
    use crate::job::test_support::template;

    fn pages(q: &JobQueue) -> Vec<u64> {
        let mut out = Vec::new();
        while let Some(job) = q.try_take() {
            out.push(job.page());
        }
        out
    }

    #[test]
    fn in_order_preserves_build_order() {
        let q = JobQueue::from_jobs(build_jobs(template("p-"), 20, None), QueueOrder::InOrder);
        assert_eq!(pages(&q), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_keeps_the_same_multiset() {
        let q = JobQueue::from_jobs(build_jobs(template("p-"), 500, None), QueueOrder::Shuffled);
        assert_eq!(q.len(), 500);
        let mut got = pages(&q);
        got.sort_unstable();
        assert_eq!(got, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn try_take_on_empty_does_not_block() {
        let q = JobQueue::new();
        assert!(q.try_take().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn reinserted_job_is_taken_again() {
        let q = JobQueue::from_jobs(build_jobs(template("p-"), 1, None), QueueOrder::InOrder);
        let mut job = q.try_take().unwrap();
        assert!(q.try_take().is_none());
        job.record_retry();
        q.put(job);
        let again = q.try_take().unwrap();
        assert_eq!(again.page(), 0);
        assert_eq!(again.attempt(), 1);
        assert!(q.try_take().is_none());
    }

    #[test]
    fn concurrent_takers_see_each_job_once() {
        let q = JobQueue::from_jobs(build_jobs(template("p-"), 1000, None), QueueOrder::Shuffled);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let q = q.clone();
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(job) = q.try_take() {
                        seen.push(job.page());
                    }
                    seen
                })
            })
            .collect();
        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }
}
