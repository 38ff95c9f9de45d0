//! Retry and backoff policy.
//!
//! Only failures plausibly caused by the network (timeouts, refused or reset
//! connections) are retried. A page the server affirmatively reports as absent
//! or broken is terminal on first sight.

mod classify;
mod policy;
mod run;

pub use classify::{classify_curl_error, ErrorKind};
pub use policy::{RetryDecision, RetryPolicy};
pub use run::{run_with_retry, Settled};
