//! Worker pool: N blocking workers over one shared queue, plus the cancel protocol.
//!
//! Workers run on tokio's blocking pool because the fetch is a blocking curl
//! transfer. Only [`WorkerPool::run`] awaits the cancellation future; workers see
//! cancellation through the kill switch alone.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};

use crate::control::KillSwitch;
use crate::fetch::PageFetcher;
use crate::job::JobQueue;
use crate::retry::RetryPolicy;

use super::progress::ProgressReporter;
use super::report::WorkerTally;
use super::worker::{run_worker, WorkerContext};

/// Pool lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Idle,
    Running,
    /// Cancelled; waiting for workers to notice the kill switch.
    Draining,
    Done,
    Interrupted,
}

/// Result of one pool run.
#[derive(Debug, Clone)]
pub struct PoolRun {
    pub state: PoolState,
    pub tally: WorkerTally,
    pub workers_started: usize,
    /// Workers that had not exited when the grace period ran out.
    pub workers_abandoned: usize,
}

pub struct WorkerPool {
    workers: usize,
    fetcher: Arc<dyn PageFetcher>,
    policy: RetryPolicy,
    grace: Duration,
    state: PoolState,
}

impl WorkerPool {
    pub fn new(
        workers: usize,
        fetcher: Arc<dyn PageFetcher>,
        policy: RetryPolicy,
        grace: Duration,
    ) -> Self {
        Self {
            workers,
            fetcher,
            policy,
            grace,
            state: PoolState::Idle,
        }
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Spawn the workers and wait until they all exit or `cancel` resolves.
    pub(crate) async fn run<F>(
        &mut self,
        queue: JobQueue,
        progress: ProgressReporter,
        cancel: F,
    ) -> PoolRun
    where
        F: Future<Output = ()>,
    {
        let kill = KillSwitch::new();
        let ctx = WorkerContext {
            queue,
            fetcher: Arc::clone(&self.fetcher),
            policy: self.policy,
            kill: kill.clone(),
            progress,
        };

        let mut join_set = JoinSet::new();
        for worker_id in 0..self.workers {
            let ctx = ctx.clone();
            join_set.spawn_blocking(move || run_worker(worker_id, ctx));
        }
        drop(ctx);
        self.state = PoolState::Running;
        tracing::debug!(workers = self.workers, "worker pool running");

        let mut tally = WorkerTally::default();
        let mut workers_abandoned = 0;
        tokio::pin!(cancel);

        loop {
            tokio::select! {
                joined = join_set.join_next() => match joined {
                    Some(res) => absorb(&mut tally, res),
                    None => {
                        self.state = PoolState::Done;
                        break;
                    }
                },
                () = &mut cancel => {
                    self.state = PoolState::Draining;
                    tracing::warn!("interrupt received, stopping workers");
                    kill.trigger();
                    let drained = tokio::time::timeout(self.grace, async {
                        while let Some(res) = join_set.join_next().await {
                            absorb(&mut tally, res);
                        }
                    })
                    .await;
                    if drained.is_err() {
                        workers_abandoned = join_set.len();
                        tracing::warn!(
                            remaining = workers_abandoned,
                            "workers still busy after grace period"
                        );
                        join_set.detach_all();
                    }
                    self.state = PoolState::Interrupted;
                    break;
                }
            }
        }

        PoolRun {
            state: self.state,
            tally,
            workers_started: self.workers,
            workers_abandoned,
        }
    }
}

fn absorb(tally: &mut WorkerTally, res: Result<WorkerTally, JoinError>) {
    match res {
        Ok(t) => tally.merge(t),
        Err(e) => tracing::error!("worker task join: {}", e),
    }
}
