//! Progress reporting for a run.
//!
//! A page is *written* when its file is complete and *settled* once it reaches
//! any terminal outcome (written, empty, or failed). The [`ProgressCounter`]
//! counts written pages only; rate and ETA are driven by settled pages so that
//! a run full of 404s still converges on 100%.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Pages written so far. Incremented exactly once per successful job.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    done: Mutex<u64>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one written page and return the new total.
    pub fn increment(&self) -> u64 {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        *done += 1;
        *done
    }

    pub fn get(&self) -> u64 {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Snapshot sent to the CLI each time a page settles.
#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Pages with a complete output file.
    pub pages_written: u64,
    /// Pages that reached a terminal outcome, written or not.
    pub pages_settled: u64,
    /// Jobs in this run.
    pub total_pages: u64,
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Settled pages per second (0 before any time has passed).
    pub fn pages_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.pages_settled as f64 / self.elapsed_secs
    }

    /// Seconds until every page settles at the current rate.
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.pages_remaining();
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.pages_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Share of pages settled, in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_pages == 0 {
            return 1.0;
        }
        (self.pages_settled as f64 / self.total_pages as f64).min(1.0)
    }

    pub fn pages_remaining(&self) -> u64 {
        self.total_pages.saturating_sub(self.pages_settled)
    }

    pub fn is_complete(&self) -> bool {
        self.pages_remaining() == 0
    }
}

/// Counter plus the optional CLI channel, shared by everything that settles pages.
#[derive(Debug, Clone)]
pub(crate) struct ProgressReporter {
    counter: Arc<ProgressCounter>,
    settled: Arc<AtomicU64>,
    total_pages: u64,
    started: Instant,
    tx: Option<tokio::sync::mpsc::Sender<ProgressStats>>,
}

impl ProgressReporter {
    pub(crate) fn new(
        counter: Arc<ProgressCounter>,
        total_pages: u64,
        tx: Option<tokio::sync::mpsc::Sender<ProgressStats>>,
    ) -> Self {
        Self {
            counter,
            settled: Arc::new(AtomicU64::new(0)),
            total_pages,
            started: Instant::now(),
            tx,
        }
    }

    /// Count one written page, log it and notify the CLI.
    pub(crate) fn page_finished(&self) {
        let written = self.counter.increment();
        tracing::info!("{} page(s) of {} finished", written, self.total_pages);
        self.settle(written);
    }

    /// Count a page that settled without a file (empty or failed).
    pub(crate) fn page_skipped(&self) {
        self.settle(self.counter.get());
    }

    /// Never blocks on the channel; a full channel drops the snapshot.
    fn settle(&self, written: u64) {
        let settled = self.settled.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(ref tx) = self.tx {
            let _ = tx.try_send(ProgressStats {
                pages_written: written,
                pages_settled: settled,
                total_pages: self.total_pages,
                elapsed_secs: self.started.elapsed().as_secs_f64(),
            });
        }
    }
}
