//! One pool worker: take a job, fetch it, settle or re-queue, repeat.

use std::sync::Arc;

use crate::control::KillSwitch;
use crate::fetch::{FetchOutcome, PageFetcher};
use crate::job::JobQueue;
use crate::retry::{RetryDecision, RetryPolicy, Settled};

use super::progress::ProgressReporter;
use super::report::WorkerTally;

/// Everything a worker shares with its siblings.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) queue: JobQueue,
    pub(crate) fetcher: Arc<dyn PageFetcher>,
    pub(crate) policy: RetryPolicy,
    pub(crate) kill: KillSwitch,
    pub(crate) progress: ProgressReporter,
}

/// Blocking worker loop. Exits when the queue is empty or the kill switch fires.
pub(crate) fn run_worker(worker_id: usize, ctx: WorkerContext) -> WorkerTally {
    let mut tally = WorkerTally::default();
    tracing::debug!(worker_id, "worker started");

    while !ctx.kill.is_triggered() {
        let Some(mut job) = ctx.queue.try_take() else {
            break;
        };
        let page = job.page();
        let outcome = ctx.fetcher.fetch(&job, &ctx.kill);
        if outcome == FetchOutcome::Aborted {
            break;
        }
        match ctx.policy.decide(&job, &outcome) {
            RetryDecision::Terminal => {
                tally.record(page, Settled::from_terminal(outcome), &ctx.progress)
            }
            RetryDecision::Abandon => tally.record(
                page,
                Settled::MaxRetriesExceeded {
                    attempts: job.attempt() + 1,
                },
                &ctx.progress,
            ),
            RetryDecision::Requeue { delay } => {
                tracing::debug!(
                    worker_id,
                    page,
                    attempt = job.attempt() + 1,
                    delay_ms = delay.as_millis() as u64,
                    "re-queueing page"
                );
                job.record_retry();
                if !ctx.kill.sleep(delay) {
                    break;
                }
                ctx.queue.put(job);
            }
        }
    }

    tracing::debug!(
        worker_id,
        succeeded = tally.succeeded,
        failed = tally.failures.len(),
        "worker exiting"
    );
    tally
}
