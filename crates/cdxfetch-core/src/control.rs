//! Run control: the kill switch the orchestrator uses to stop workers.
//!
//! Workers never listen for Ctrl-C themselves. The orchestrator owns the
//! cancellation future; when it fires, it triggers the kill switch, which makes
//! in-flight transfers abort from their progress callback and stops every
//! worker before it takes another job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of [`KillSwitch::sleep`].
const SLEEP_SLICE: Duration = Duration::from_millis(25);

/// Error returned when a run is stopped by the user before all pages were terminal.
#[derive(Debug, thiserror::Error)]
#[error("run interrupted by user: {finished} of {total} page(s) finished")]
pub struct RunInterrupted {
    pub finished: u64,
    pub total: u64,
}

/// Shared stop flag. Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct KillSwitch {
    flag: Arc<AtomicBool>,
}

impl KillSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request every holder of this switch to stop. Idempotent.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Blocking sleep that returns early when the switch is triggered.
    /// Returns `true` if the full duration elapsed, `false` if killed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_triggered() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
