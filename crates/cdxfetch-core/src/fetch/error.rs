//! Errors for run-level queries (page count, collection listing).
//!
//! Per-page failures are not errors; they are [`super::FetchOutcome`] values.

/// Failure of a query that the whole run depends on.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// curl could not complete the request (connect, timeout, TLS, ...).
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: curl::Error,
    },
    /// Server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Http { url: String, status: u32 },
    /// Page-count response was neither `{"pages": N}` nor a bare integer.
    #[error("page count query returned invalid data: {body}")]
    Protocol { body: String },
    /// Endpoint or collection URL could not be parsed.
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
