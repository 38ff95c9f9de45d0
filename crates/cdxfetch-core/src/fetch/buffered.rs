//! Small buffered GET for run-level queries whose bodies fit in memory.

use std::time::Duration;

use super::error::FetchError;

/// Upper bound on total time for one buffered query.
const BUFFERED_TOTAL_TIMEOUT: Duration = Duration::from_secs(120);

/// GET `url` and return the body as text. Non-2xx statuses are errors.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub(crate) fn get_text(
    url: &str,
    headers: &[(String, String)],
    timeout: Duration,
) -> Result<String, FetchError> {
    let network = |source| FetchError::Network {
        url: url.to_string(),
        source,
    };
    let mut body = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(network)?;
    easy.follow_location(true).map_err(network)?;
    easy.accept_encoding("").map_err(network)?;
    easy.connect_timeout(timeout).map_err(network)?;
    easy.timeout(BUFFERED_TOTAL_TIMEOUT.max(timeout)).map_err(network)?;

    let mut list = curl::easy::List::new();
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(network)?;
    }
    if !headers.is_empty() {
        easy.http_headers(list).map_err(network)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(network)?;
        transfer.perform().map_err(network)?;
    }

    let status = easy.response_code().map_err(network)?;
    if !(200..300).contains(&status) {
        return Err(FetchError::Http {
            url: url.to_string(),
            status,
        });
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}
