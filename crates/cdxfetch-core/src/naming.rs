//! Output file naming.
//!
//! Page files are named `<prefix><page>` with the page index zero-padded to the
//! digit width of the total page count, so a directory listing sorts in page order.

/// Suffix appended when the raw gzip body is stored as-is.
pub const GZIP_SUFFIX: &str = ".gz";

/// Number of decimal digits needed to print `total` (at least 1).
pub fn digit_width(total: u64) -> usize {
    let mut width = 1;
    let mut n = total / 10;
    while n > 0 {
        width += 1;
        n /= 10;
    }
    width
}

/// File name for one page, e.g. `page_file_name("page-", 7, 150)` -> `"page-007"`.
pub fn page_file_name(prefix: &str, page: u64, total_pages: u64) -> String {
    let width = digit_width(total_pages);
    format!("{prefix}{page:0width$}")
}

/// Derives a default output prefix from an index search key.
///
/// - `*.example.com` -> `domain-example.com-`
/// - `http://example.com/path/*` -> `prefix-example.com-path-`
/// - `https://example.com/a` -> `example.com-a-`
///
/// An `http://` or `https://` scheme is dropped in every form, so the same
/// pattern with or without a scheme writes the same files. Slashes become
/// dashes and the result is percent-encoded with the RFC 3986 unreserved set
/// (`A-Z a-z 0-9 - _ . ~`) left as is.
pub fn output_prefix_for(search_key: &str) -> String {
    let raw = if search_key.starts_with('*') {
        format!("domain-{}", search_key.trim_matches(|c| c == '*' || c == '.'))
    } else if search_key.ends_with('*') {
        format!("prefix-{}", strip_scheme(search_key.trim_matches('*')))
    } else {
        strip_scheme(search_key).to_string()
    };

    let dashed = raw.trim_matches('/').replace('/', "-");
    format!("{}-", urlencoding::encode(&dashed))
}

fn strip_scheme(key: &str) -> &str {
    match key.split_once("//") {
        Some((scheme, rest))
            if scheme.is_empty() || scheme == "http:" || scheme == "https:" =>
        {
            rest
        }
        _ => key,
    }
}
