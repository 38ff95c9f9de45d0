//! Page fetching: one streaming GET per job, body written straight to disk.
//!
//! [`PageFetcher`] is the seam between the worker pool and the network. The
//! production implementation, [`CurlPageFetcher`], uses libcurl's easy
//! interface and must run on a blocking thread.

mod buffered;
mod error;
mod head;
mod sink;

pub use error::FetchError;
pub(crate) use buffered::get_text;

use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;

use crate::control::KillSwitch;
use crate::job::Job;
use crate::retry::{classify_curl_error, ErrorKind};

use self::head::ResponseHead;
use self::sink::PageSink;

/// Transfers slower than this for a whole job timeout count as stalled.
const STALL_BYTES_PER_SEC: u32 = 1;

/// Result of one fetch attempt. Consumed immediately by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 200; body written to `path`.
    Success { path: PathBuf, bytes: u64 },
    /// 404; the page has no results. Not an error.
    NotFound,
    /// Any other status. Terminal, never retried.
    HttpError(u32),
    /// Connection or timeout failure. Eligible for retry.
    TransientFailure(String),
    /// Local or protocol failure that a retry will not fix (disk write, bad URL, TLS).
    Failed(String),
    /// Transfer stopped by the kill switch.
    Aborted,
}

/// Performs one job. Implementations must honour `kill` for in-flight work.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, job: &Job, kill: &KillSwitch) -> FetchOutcome;
}

/// libcurl-backed fetcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlPageFetcher;

impl CurlPageFetcher {
    pub fn new() -> Self {
        Self
    }

    fn configure(easy: &mut curl::easy::Easy, job: &Job) -> Result<(), curl::Error> {
        let template = job.template();
        easy.url(job.page_url().as_str())?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(template.timeout)?;
        // Read timeout: abort when the transfer stalls for a full job timeout.
        easy.low_speed_limit(STALL_BYTES_PER_SEC)?;
        easy.low_speed_time(template.timeout.max(Duration::from_secs(1)))?;
        // Progress callbacks are how the kill switch reaches an in-flight transfer.
        easy.progress(true)?;

        let mut list = curl::easy::List::new();
        for (k, v) in &template.query.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if template.output.gzipped {
            // Ask for gzip but keep the raw bytes: curl only decodes when accept_encoding is set.
            list.append("Accept-Encoding: gzip")?;
        } else {
            easy.accept_encoding("")?;
        }
        easy.http_headers(list)?;
        Ok(())
    }
}

impl PageFetcher for CurlPageFetcher {
    fn fetch(&self, job: &Job, kill: &KillSwitch) -> FetchOutcome {
        let page = job.page();
        tracing::debug!(
            page,
            total = job.total_pages(),
            attempt = job.attempt(),
            "fetching page"
        );

        let mut easy = curl::easy::Easy::new();
        if let Err(e) = Self::configure(&mut easy, job) {
            return FetchOutcome::Failed(format!("curl setup: {e}"));
        }

        let head = RefCell::new(ResponseHead::default());
        let mut sink = PageSink::new(job);
        let mut storage_error: Option<std::io::Error> = None;

        let performed = transfer_page(&mut easy, &head, &mut sink, &mut storage_error, kill);

        if let Err(e) = performed {
            if e.is_aborted_by_callback() {
                tracing::debug!(page, "transfer aborted by kill switch");
                return FetchOutcome::Aborted;
            }
            if let Some(io_err) = storage_error {
                return FetchOutcome::Failed(format!("write page {page}: {io_err}"));
            }
            return match classify_curl_error(&e) {
                ErrorKind::Timeout | ErrorKind::Connection => {
                    FetchOutcome::TransientFailure(e.to_string())
                }
                ErrorKind::Other => FetchOutcome::Failed(e.to_string()),
            };
        }

        let head = head.into_inner();
        match head
            .status
            .or_else(|| easy.response_code().ok().filter(|code| *code != 0))
        {
            Some(200) => match sink.finish(&head) {
                Ok((path, bytes)) => {
                    tracing::debug!(page, path = %path.display(), bytes, "done with page");
                    FetchOutcome::Success { path, bytes }
                }
                Err(e) => FetchOutcome::Failed(format!("write page {page}: {e}")),
            },
            Some(404) => {
                tracing::info!(page, "no results for this page");
                FetchOutcome::NotFound
            }
            Some(status) => {
                tracing::error!(page, status, body = %sink.error_body(), "page request failed");
                FetchOutcome::HttpError(status)
            }
            None => FetchOutcome::TransientFailure("response without status".to_string()),
        }
    }
}

/// Drive one transfer: track the response head, stream the body into `sink`,
/// and abort as soon as `kill` is triggered.
fn transfer_page(
    easy: &mut curl::easy::Easy,
    head: &RefCell<ResponseHead>,
    sink: &mut PageSink<'_>,
    storage_error: &mut Option<std::io::Error>,
    kill: &KillSwitch,
) -> Result<(), curl::Error> {
    let mut transfer = easy.transfer();
    transfer.header_function(|line| {
        head.borrow_mut().push_line(line);
        true
    })?;
    transfer.write_function(|data| match sink.write(&head.borrow(), data) {
        Ok(()) => Ok(data.len()),
        Err(e) => {
            *storage_error = Some(e);
            // Short count makes curl abort with a write error.
            Ok(0)
        }
    })?;
    transfer.progress_function(|_, _, _, _| !kill.is_triggered())?;
    transfer.perform()
}
