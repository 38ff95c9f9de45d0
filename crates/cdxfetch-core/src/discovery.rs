//! Collection discovery: scrape the index server's landing page for crawl collections.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use crate::fetch::{get_text, FetchError};

/// Collections are listed as links containing this path fragment.
const COLLECTION_MARKER: &str = "/CC-MAIN-";
const INDEX_SUFFIX: &str = "-index";

static RE_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s[^>]*href\s*=\s*["']([^"']+)["']"#).expect("static href pattern")
});

/// Index endpoints for every collection linked from `html`, in page order, without duplicates.
pub fn collection_urls_from_html(base: &Url, html: &str) -> Vec<Url> {
    let mut seen = HashSet::new();
    RE_HREF
        .captures_iter(html)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        // Query links (search forms) point at an existing endpoint, not a collection.
        .filter(|href| href.contains(COLLECTION_MARKER) && !href.contains('?'))
        .filter_map(|href| {
            let href = href.trim_end_matches('/');
            let href = href.strip_suffix(INDEX_SUFFIX).unwrap_or(href);
            base.join(&format!("{href}{INDEX_SUFFIX}")).ok()
        })
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}

/// Fetch the listing at `base` and return the collection endpoints, newest first as listed.
pub fn discover_collections(
    base: &Url,
    headers: &[(String, String)],
    timeout: Duration,
) -> Result<Vec<Url>, FetchError> {
    tracing::debug!(base = %base, "discovering collections");
    let html = get_text(base.as_str(), headers, timeout)?;
    let urls = collection_urls_from_html(base, &html);
    tracing::debug!(count = urls.len(), "collections found");
    Ok(urls)
}

/// Collection name of an index endpoint: `.../CC-MAIN-2024-10-index` -> `CC-MAIN-2024-10`.
pub fn collection_name(endpoint: &Url) -> String {
    let last = endpoint
        .path_segments()
        .and_then(|mut segs| segs.rfind(|s| !s.is_empty()))
        .unwrap_or("");
    last.strip_suffix(INDEX_SUFFIX).unwrap_or(last).to_string()
}

/// Endpoint for a named collection on the server at `base`.
pub fn collection_endpoint(base: &Url, name: &str) -> Result<Url, FetchError> {
    let raw = format!("{name}{INDEX_SUFFIX}");
    base.join(&raw).map_err(|source| FetchError::InvalidUrl { url: raw, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
<html><body>
<table>
<tr><td><a href="/CC-MAIN-2024-10/">CC-MAIN-2024-10</a></td><td><a href="/CC-MAIN-2024-10-index?url=x">search</a></td></tr>
<tr><td><A HREF='/CC-MAIN-2023-50'>CC-MAIN-2023-50</A></td></tr>
<tr><td><a class="x" href="/about">About</a></td></tr>
<tr><td><a href="/CC-MAIN-2024-10">dup</a></td></tr>
</table>
</body></html>
"#;

    fn base() -> Url {
        Url::parse("https://index.example/").unwrap()
    }

    #[test]
    fn scrapes_collection_links_in_order() {
        let urls: Vec<String> = collection_urls_from_html(&base(), LISTING)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://index.example/CC-MAIN-2024-10-index".to_string(),
                "https://index.example/CC-MAIN-2023-50-index".to_string(),
            ]
        );
    }

    #[test]
    fn no_links_no_collections() {
        assert!(collection_urls_from_html(&base(), "<html>nothing</html>").is_empty());
    }

    #[test]
    fn name_from_endpoint() {
        let url = Url::parse("https://index.example/CC-MAIN-2024-10-index").unwrap();
        assert_eq!(collection_name(&url), "CC-MAIN-2024-10");
        let url = Url::parse("https://index.example/cdx/CC-MAIN-2023-50-index/").unwrap();
        assert_eq!(collection_name(&url), "CC-MAIN-2023-50");
    }

    #[test]
    fn endpoint_from_name() {
        let url = collection_endpoint(&base(), "CC-MAIN-2024-10").unwrap();
        assert_eq!(url.as_str(), "https://index.example/CC-MAIN-2024-10-index");
    }
}
