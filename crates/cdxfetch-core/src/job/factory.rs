//! Expand a page count (or an explicit page list) into jobs.

use std::collections::HashSet;
use std::sync::Arc;

use super::{Job, JobTemplate};

/// Page indices to fetch: `0..total_pages`, or the explicit list with
/// duplicates removed (first occurrence wins, order kept).
pub fn requested_pages(total_pages: u64, explicit: Option<&[u64]>) -> Vec<u64> {
    match explicit {
        Some(pages) => {
            let mut seen = HashSet::with_capacity(pages.len());
            pages.iter().copied().filter(|p| seen.insert(*p)).collect()
        }
        None => (0..total_pages).collect(),
    }
}

/// One job per requested page, in request order. All jobs share `template`.
///
/// `total_pages` is the size of the whole result set even when only a subset is
/// requested, so file names keep the same width as a full run.
pub fn build_jobs(template: JobTemplate, total_pages: u64, explicit: Option<&[u64]>) -> Vec<Job> {
    let template = Arc::new(template);
    let jobs: Vec<Job> = requested_pages(total_pages, explicit)
        .into_iter()
        .map(|page| Job::new(Arc::clone(&template), page, total_pages))
        .collect();
    tracing::debug!(jobs = jobs.len(), total_pages, "built page jobs");
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::test_support::template;

    #[test]
    fn one_job_per_page_with_unique_indices() {
        for n in [0u64, 1, 2, 17, 150] {
            let jobs = build_jobs(template("p-"), n, None);
            assert_eq!(jobs.len() as u64, n);
            let pages: HashSet<u64> = jobs.iter().map(|j| j.page()).collect();
            assert_eq!(pages.len() as u64, n);
            assert!(pages.iter().all(|p| *p < n));
        }
    }

    #[test]
    fn zero_pages_yields_no_jobs() {
        assert!(build_jobs(template("p-"), 0, None).is_empty());
    }

    #[test]
    fn explicit_pages_are_kept_in_order() {
        let jobs = build_jobs(template("p-"), 200, Some(&[150, 3, 42][..]));
        let pages: Vec<u64> = jobs.iter().map(|j| j.page()).collect();
        assert_eq!(pages, vec![150, 3, 42]);
        assert!(jobs.iter().all(|j| j.total_pages() == 200));
        assert!(jobs.iter().all(|j| j.attempt() == 0));
    }

    #[test]
    fn explicit_duplicates_are_dropped() {
        assert_eq!(requested_pages(10, Some(&[4, 1, 4, 1, 9][..])), vec![4, 1, 9]);
    }

    #[test]
    fn explicit_empty_list_yields_no_jobs() {
        assert!(build_jobs(template("p-"), 10, Some(&[][..])).is_empty());
    }

    #[test]
    fn jobs_share_one_template() {
        let jobs = build_jobs(template("shared-"), 3, None);
        assert!(jobs
            .iter()
            .all(|j| j.template().output.prefix == "shared-"));
    }
}
