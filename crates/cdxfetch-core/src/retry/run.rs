//! Inline retry loop for a job that runs outside the worker pool.

use crate::control::KillSwitch;
use crate::fetch::{FetchOutcome, PageFetcher};
use crate::job::Job;

use super::policy::{RetryDecision, RetryPolicy};

/// Terminal state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    Succeeded { path: std::path::PathBuf, bytes: u64 },
    NotFound,
    HttpError(u32),
    Failed(String),
    MaxRetriesExceeded { attempts: u32 },
    Aborted,
}

impl Settled {
    /// Map an outcome the policy called terminal.
    pub(crate) fn from_terminal(outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Success { path, bytes } => Settled::Succeeded { path, bytes },
            FetchOutcome::NotFound => Settled::NotFound,
            FetchOutcome::HttpError(status) => Settled::HttpError(status),
            FetchOutcome::Failed(msg) | FetchOutcome::TransientFailure(msg) => Settled::Failed(msg),
            FetchOutcome::Aborted => Settled::Aborted,
        }
    }
}

/// Fetch `job` until it settles, sleeping for the policy's backoff between attempts.
pub fn run_with_retry(
    policy: &RetryPolicy,
    job: &mut Job,
    fetcher: &dyn PageFetcher,
    kill: &KillSwitch,
) -> Settled {
    loop {
        let outcome = fetcher.fetch(job, kill);
        match policy.decide(job, &outcome) {
            RetryDecision::Terminal => return Settled::from_terminal(outcome),
            RetryDecision::Abandon => {
                return Settled::MaxRetriesExceeded {
                    attempts: job.attempt() + 1,
                }
            }
            RetryDecision::Requeue { delay } => {
                tracing::debug!(page = job.page(), attempt = job.attempt() + 1, "retrying page");
                job.record_retry();
                if !kill.sleep(delay) {
                    return Settled::Aborted;
                }
            }
        }
    }
}
