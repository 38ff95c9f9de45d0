//! Page jobs: one job per result page to fetch and persist.
//!
//! Everything a job needs except its page index and attempt counter lives in a
//! shared, immutable [`JobTemplate`]; jobs only carry an `Arc` to it.

mod factory;
mod queue;

pub use factory::{build_jobs, requested_pages};
pub use queue::{JobQueue, QueueOrder};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::naming;

/// Query parameters sent with every page request of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Index search key (`url=` parameter), e.g. `*.example.com`.
    pub search_key: String,
    /// Page size in index blocks (`pageSize=`), server default when `None`.
    pub page_size: Option<u32>,
    /// Field selection list (`fl=`), e.g. `url,timestamp`.
    pub fields: Option<String>,
    /// Request `output=json` instead of the server's native CDX(J) lines.
    pub json: bool,
    /// Extra request headers forwarded verbatim.
    pub headers: Vec<(String, String)>,
}

/// Where page files are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTarget {
    /// Output directory, created on first write. Current directory when `None`.
    pub dir: Option<PathBuf>,
    /// File name prefix; the zero-padded page index is appended.
    pub prefix: String,
    /// Keep gzip-encoded bodies compressed and add `.gz` to the name.
    pub gzipped: bool,
}

/// Parameters shared by every job of one run.
#[derive(Debug, Clone)]
pub struct JobTemplate {
    /// Index endpoint, e.g. `https://index.commoncrawl.org/CC-MAIN-2024-10-index`.
    pub endpoint: Url,
    pub query: QueryParams,
    pub output: OutputTarget,
    /// Connect and read-stall timeout for one request.
    pub timeout: Duration,
    /// Retries allowed after the first attempt on transient failures.
    pub max_retries: u32,
}

/// Fetch page `page` of the result set and write it to disk.
#[derive(Debug, Clone)]
pub struct Job {
    template: Arc<JobTemplate>,
    page: u64,
    total_pages: u64,
    attempt: u32,
}

impl Job {
    pub(crate) fn new(template: Arc<JobTemplate>, page: u64, total_pages: u64) -> Self {
        Self {
            template,
            page,
            total_pages,
            attempt: 0,
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    /// Total pages in the result set (drives file name width).
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Retries already spent on this job (0 on the first attempt).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_retries(&self) -> u32 {
        self.template.max_retries
    }

    pub fn template(&self) -> &JobTemplate {
        &self.template
    }

    /// Bump the attempt counter before re-queueing.
    pub(crate) fn record_retry(&mut self) {
        self.attempt = self.attempt.saturating_add(1);
    }

    /// Full request URL for this page.
    pub fn page_url(&self) -> Url {
        let q = &self.template.query;
        let mut url = self.template.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("url", &q.search_key);
            pairs.append_pair("page", &self.page.to_string());
            if let Some(size) = q.page_size {
                pairs.append_pair("pageSize", &size.to_string());
            }
            if let Some(fields) = q.fields.as_deref() {
                pairs.append_pair("fl", fields);
            }
            if q.json {
                pairs.append_pair("output", "json");
            }
        }
        url
    }

    /// Output path; `gzip_body` adds the `.gz` suffix.
    pub fn output_path(&self, gzip_body: bool) -> PathBuf {
        let out = &self.template.output;
        let mut name = naming::page_file_name(&out.prefix, self.page, self.total_pages);
        if gzip_body {
            name.push_str(naming::GZIP_SUFFIX);
        }
        match out.dir.as_ref() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::template;
    use super::*;

    #[test]
    fn page_url_carries_query() {
        let mut t = template("p-");
        t.query.page_size = Some(5);
        t.query.fields = Some("url,timestamp".to_string());
        t.query.json = true;
        let job = Job::new(Arc::new(t), 7, 20);
        let url = job.page_url();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("url".to_string(), "*.example.com".to_string()),
                ("page".to_string(), "7".to_string()),
                ("pageSize".to_string(), "5".to_string()),
                ("fl".to_string(), "url,timestamp".to_string()),
                ("output".to_string(), "json".to_string()),
            ]
        );
        assert_eq!(url.path(), "/CC-MAIN-2024-10-index");
    }

    #[test]
    fn page_url_omits_unset_params() {
        let job = Job::new(Arc::new(template("p-")), 0, 1);
        let url = job.page_url();
        let keys: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(keys, vec!["url", "page"]);
    }

    #[test]
    fn output_path_pads_and_suffixes() {
        let mut t = template("page-");
        t.output.dir = Some(PathBuf::from("/tmp/out"));
        let job = Job::new(Arc::new(t), 5, 150);
        assert_eq!(job.output_path(false), PathBuf::from("/tmp/out/page-005"));
        assert_eq!(job.output_path(true), PathBuf::from("/tmp/out/page-005.gz"));
    }

    #[test]
    fn retry_counter_only_moves_forward() {
        let mut job = Job::new(Arc::new(template("p-")), 1, 3);
        assert_eq!(job.attempt(), 0);
        job.record_retry();
        job.record_retry();
        assert_eq!(job.attempt(), 2);
        assert_eq!(job.max_retries(), 2);
    }
}
