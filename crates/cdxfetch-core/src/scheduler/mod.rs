//! Page scheduler.
//!
//! Drives a run: job list -> shared queue -> N blocking workers -> fetcher ->
//! retry policy, with progress accounting and the cancellation protocol.

mod pool;
mod progress;
mod report;
mod run;
mod worker;

pub use pool::PoolState;
pub use progress::{ProgressCounter, ProgressStats};
pub use report::{FailureReason, PageFailure, RunReport, RunState, WorkerTally};
pub use run::{effective_workers, run_pages, RunOptions};
