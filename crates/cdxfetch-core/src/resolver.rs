//! Page count resolution: one `showNumPages=true` query before any page is fetched.
//!
//! Blocking (curl easy); call from `spawn_blocking` in async code.

use std::time::Duration;
use url::Url;

use crate::fetch::{get_text, FetchError};
use crate::job::QueryParams;

/// Longest response excerpt kept in a protocol error.
const MAX_ERROR_BODY: usize = 256;

/// Count query URL: `<endpoint>?url=<key>[&pageSize=<n>]&showNumPages=true`.
pub fn num_pages_url(endpoint: &Url, search_key: &str, page_size: Option<u32>) -> Url {
    let mut url = endpoint.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("url", search_key);
        if let Some(size) = page_size {
            pairs.append_pair("pageSize", &size.to_string());
        }
        pairs.append_pair("showNumPages", "true");
    }
    url
}

/// Ask the index how many pages the result set for `query` has.
pub fn resolve_num_pages(
    endpoint: &Url,
    query: &QueryParams,
    timeout: Duration,
) -> Result<u64, FetchError> {
    let url = num_pages_url(endpoint, &query.search_key, query.page_size);
    tracing::debug!(url = %url, "querying page count");
    let body = get_text(url.as_str(), &query.headers, timeout)?;
    let pages = parse_num_pages(&body)?;
    tracing::info!(pages, search_key = %query.search_key, "resolved page count");
    Ok(pages)
}

/// Accepts `{"pages": N, ...}` (current servers) or a bare integer (older servers).
pub fn parse_num_pages(body: &str) -> Result<u64, FetchError> {
    let protocol_error = || FetchError::Protocol {
        body: excerpt(body),
    };
    let value: serde_json::Value = serde_json::from_str(body.trim()).map_err(|_| protocol_error())?;
    match value {
        serde_json::Value::Number(n) => n.as_u64().ok_or_else(protocol_error),
        serde_json::Value::Object(map) => map
            .get("pages")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(protocol_error),
        _ => Err(protocol_error()),
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
