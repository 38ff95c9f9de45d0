//! Response head tracking from curl header callbacks.

/// Status and headers of the response currently being received.
///
/// curl reports the headers of every hop when following redirects; a new
/// status line resets the state so only the final response counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResponseHead {
    pub(crate) status: Option<u32>,
    pub(crate) content_encoding: Option<String>,
}

impl ResponseHead {
    /// Feed one raw header line (including the status line).
    pub(crate) fn push_line(&mut self, raw: &[u8]) {
        let Ok(line) = std::str::from_utf8(raw) else {
            return;
        };
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if line.starts_with("HTTP/") {
            *self = ResponseHead {
                status: parse_status_line(line),
                content_encoding: None,
            };
            return;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-encoding") {
                self.content_encoding = Some(value.trim().to_ascii_lowercase());
            }
        }
    }

    pub(crate) fn is_ok(&self) -> bool {
        self.status == Some(200)
    }

    pub(crate) fn is_gzip(&self) -> bool {
        matches!(self.content_encoding.as_deref(), Some("gzip") | Some("x-gzip"))
    }
}

fn parse_status_line(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(lines: &[&str]) -> ResponseHead {
        let mut h = ResponseHead::default();
        for l in lines {
            h.push_line(format!("{l}\r\n").as_bytes());
        }
        h
    }

    #[test]
    fn status_and_encoding() {
        let h = head(&["HTTP/1.1 200 OK", "Content-Encoding: gzip", "Content-Length: 10", ""]);
        assert_eq!(h.status, Some(200));
        assert!(h.is_ok());
        assert!(h.is_gzip());
    }

    #[test]
    fn redirect_hop_is_reset() {
        let h = head(&[
            "HTTP/1.1 302 Found",
            "Content-Encoding: gzip",
            "Location: /elsewhere",
            "",
            "HTTP/2 404",
            "",
        ]);
        assert_eq!(h.status, Some(404));
        assert!(!h.is_gzip());
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let h = head(&["HTTP/1.1 200 OK", "content-encoding: GZIP"]);
        assert!(h.is_gzip());
    }

    #[test]
    fn non_gzip_encoding() {
        let h = head(&["HTTP/1.1 200 OK", "Content-Encoding: br"]);
        assert!(!h.is_gzip());
    }
}
