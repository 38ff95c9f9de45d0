//! What a run leaves behind: per-page failures and the final state.

use crate::control::RunInterrupted;
use crate::retry::Settled;

use super::progress::ProgressReporter;

/// Why a page ended without a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Server answered with a non-200, non-404 status.
    Http(u32),
    /// Transient failures used up the retry budget.
    MaxRetriesExceeded { attempts: u32 },
    /// Local or non-network failure (disk write, TLS, bad URL).
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub page: u64,
    pub reason: FailureReason,
}

/// Terminal outcomes seen by one worker (or by the single-job path).
#[derive(Debug, Clone, Default)]
pub struct WorkerTally {
    pub succeeded: u64,
    pub not_found: Vec<u64>,
    pub failures: Vec<PageFailure>,
}

impl WorkerTally {
    /// Record a settled page and report it to `progress`.
    pub(crate) fn record(&mut self, page: u64, settled: Settled, progress: &ProgressReporter) {
        let reason = match settled {
            Settled::Succeeded { .. } => {
                self.succeeded += 1;
                progress.page_finished();
                return;
            }
            Settled::NotFound => {
                self.not_found.push(page);
                progress.page_skipped();
                return;
            }
            Settled::Aborted => return,
            Settled::HttpError(status) => FailureReason::Http(status),
            Settled::MaxRetriesExceeded { attempts } => {
                tracing::error!(attempts, "max retries exceeded for page {}", page);
                FailureReason::MaxRetriesExceeded { attempts }
            }
            Settled::Failed(msg) => {
                tracing::error!(page, error = %msg, "page failed");
                FailureReason::Failed(msg)
            }
        };
        self.failures.push(PageFailure { page, reason });
        progress.page_skipped();
    }

    pub(crate) fn merge(&mut self, other: WorkerTally) {
        self.succeeded += other.succeeded;
        self.not_found.extend(other.not_found);
        self.failures.extend(other.failures);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Nothing to fetch; no worker was started.
    NoResults,
    /// Every job reached a terminal outcome.
    Done,
    /// Cancelled by the user before every job settled.
    Interrupted,
}

/// Summary of one run, returned by [`super::run_pages`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: RunState,
    /// Jobs in this run.
    pub total_jobs: u64,
    /// Final progress counter value.
    pub succeeded: u64,
    /// Pages the server had no results for.
    pub not_found: Vec<u64>,
    pub failures: Vec<PageFailure>,
    /// Pool workers spawned (0 for the empty and single-job runs).
    pub workers_started: usize,
}

impl RunReport {
    pub(crate) fn no_results() -> Self {
        Self {
            state: RunState::NoResults,
            total_jobs: 0,
            succeeded: 0,
            not_found: Vec::new(),
            failures: Vec::new(),
            workers_started: 0,
        }
    }

    pub(crate) fn from_tally(
        state: RunState,
        total_jobs: u64,
        succeeded: u64,
        mut tally: WorkerTally,
        workers_started: usize,
    ) -> Self {
        tally.not_found.sort_unstable();
        tally.failures.sort_by_key(|f| f.page);
        Self {
            state,
            total_jobs,
            succeeded,
            not_found: tally.not_found,
            failures: tally.failures,
            workers_started,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.state == RunState::Interrupted
    }

    /// `Err` when the run was cancelled, so callers can exit with the interrupt status.
    pub fn check_interrupted(&self) -> Result<(), RunInterrupted> {
        if self.is_interrupted() {
            return Err(RunInterrupted {
                finished: self.succeeded,
                total: self.total_jobs,
            });
        }
        Ok(())
    }
}
