//! Classify curl errors for retry decisions.

/// Coarse kind of a transfer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connect or read timed out.
    Timeout,
    /// Network-level failure (refused, reset, DNS, empty reply).
    Connection,
    /// Anything else (bad URL, TLS verification, write error). Not retried.
    Other,
}

/// Classify a curl error.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    // Raw CURLcode values from curl.h.
    const COULDNT_RESOLVE_HOST: i32 = 6;
    const COULDNT_CONNECT: i32 = 7;
    const PARTIAL_FILE: i32 = 18;
    const WRITE_ERROR: i32 = 23;
    const OPERATION_TIMEDOUT: i32 = 28;
    const GOT_NOTHING: i32 = 52;
    const PEER_FAILED_VERIFICATION: i32 = 60;

    fn kind(code: i32) -> ErrorKind {
        classify_curl_error(&curl::Error::new(code as _))
    }

    #[test]
    fn timeouts() {
        assert_eq!(kind(OPERATION_TIMEDOUT), ErrorKind::Timeout);
    }

    #[test]
    fn connection_failures() {
        assert_eq!(kind(COULDNT_CONNECT), ErrorKind::Connection);
        assert_eq!(kind(COULDNT_RESOLVE_HOST), ErrorKind::Connection);
        assert_eq!(kind(GOT_NOTHING), ErrorKind::Connection);
        assert_eq!(kind(PARTIAL_FILE), ErrorKind::Connection);
    }

    #[test]
    fn local_and_tls_failures_are_not_retried() {
        assert_eq!(kind(WRITE_ERROR), ErrorKind::Other);
        assert_eq!(kind(PEER_FAILED_VERIFICATION), ErrorKind::Other);
    }
}
