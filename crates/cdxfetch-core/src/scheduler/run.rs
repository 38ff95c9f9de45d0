//! `run_pages`: the entry point that turns a job list into files on disk.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::control::KillSwitch;
use crate::fetch::PageFetcher;
use crate::job::{Job, JobQueue, QueueOrder};
use crate::retry::{run_with_retry, RetryPolicy, Settled};

use super::pool::{PoolState, WorkerPool};
use super::progress::{ProgressCounter, ProgressReporter, ProgressStats};
use super::report::{RunReport, RunState, WorkerTally};

/// Fallback when the CPU count is unknown.
const FALLBACK_PARALLELISM: usize = 4;

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Worker count; `None` = twice the CPU count.
    pub workers: Option<usize>,
    pub order: QueueOrder,
    pub policy: RetryPolicy,
    /// How long to wait for workers after cancellation.
    pub cancel_grace: Duration,
    pub progress_tx: Option<tokio::sync::mpsc::Sender<ProgressStats>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: None,
            order: QueueOrder::Shuffled,
            policy: RetryPolicy::default(),
            cancel_grace: Duration::from_secs(5),
            progress_tx: None,
        }
    }
}

/// Workers to spawn for `jobs` jobs: requested (or 2 x CPUs), at most one per job, at least one.
pub fn effective_workers(requested: Option<usize>, jobs: usize) -> usize {
    let wanted = requested.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get() * 2)
            .unwrap_or(FALLBACK_PARALLELISM)
    });
    wanted.min(jobs).max(1)
}

/// Fetch every job and return once all are terminal or `cancel` resolves.
///
/// No jobs: returns [`RunState::NoResults`] without starting anything. One job:
/// fetched inline with the same retry policy, no queue and no pool. Otherwise the
/// jobs are queued (shuffled unless `InOrder`) and drained by a [`WorkerPool`].
pub async fn run_pages<F>(
    jobs: Vec<Job>,
    fetcher: Arc<dyn PageFetcher>,
    opts: RunOptions,
    cancel: F,
) -> RunReport
where
    F: Future<Output = ()>,
{
    let total = jobs.len() as u64;
    let counter = Arc::new(ProgressCounter::new());
    let progress = ProgressReporter::new(Arc::clone(&counter), total, opts.progress_tx.clone());

    let mut jobs = jobs;
    let report = match jobs.len() {
        0 => {
            tracing::info!("no results: nothing to fetch");
            return RunReport::no_results();
        }
        1 => {
            let Some(job) = jobs.pop() else {
                return RunReport::no_results();
            };
            let (state, tally) = run_single(job, fetcher, &opts, &progress, cancel).await;
            RunReport::from_tally(state, total, counter.get(), tally, 0)
        }
        n => {
            let workers = effective_workers(opts.workers, n);
            tracing::info!(pages = n, workers, "fetching pages");
            let queue = JobQueue::from_jobs(jobs, opts.order);
            let mut pool = WorkerPool::new(workers, fetcher, opts.policy, opts.cancel_grace);
            let run = pool.run(queue, progress, cancel).await;
            let state = match run.state {
                PoolState::Interrupted => RunState::Interrupted,
                _ => RunState::Done,
            };
            RunReport::from_tally(state, total, counter.get(), run.tally, run.workers_started)
        }
    };

    tracing::info!(
        succeeded = report.succeeded,
        total = report.total_jobs,
        not_found = report.not_found.len(),
        failed = report.failures.len(),
        interrupted = report.is_interrupted(),
        "run finished"
    );
    report
}

/// One job: inline retry loop on a blocking thread, raced against `cancel`.
async fn run_single<F>(
    mut job: Job,
    fetcher: Arc<dyn PageFetcher>,
    opts: &RunOptions,
    progress: &ProgressReporter,
    cancel: F,
) -> (RunState, WorkerTally)
where
    F: Future<Output = ()>,
{
    let page = job.page();
    let kill = KillSwitch::new();
    let mut handle = tokio::task::spawn_blocking({
        let kill = kill.clone();
        let policy = opts.policy;
        move || run_with_retry(&policy, &mut job, fetcher.as_ref(), &kill)
    });
    tokio::pin!(cancel);

    let (state, settled) = tokio::select! {
        res = &mut handle => (RunState::Done, res),
        () = &mut cancel => {
            tracing::warn!("interrupt received, stopping page fetch");
            kill.trigger();
            match tokio::time::timeout(opts.cancel_grace, &mut handle).await {
                Ok(res) => (RunState::Interrupted, res),
                Err(_) => {
                    tracing::warn!(page, "page fetch still busy after grace period");
                    return (RunState::Interrupted, WorkerTally::default());
                }
            }
        }
    };

    let mut tally = WorkerTally::default();
    match settled {
        Ok(settled) => tally.record(page, settled, progress),
        Err(e) => {
            tracing::error!("page task join: {}", e);
            tally.record(page, Settled::Failed(e.to_string()), progress);
        }
    }
    (state, tally)
}
