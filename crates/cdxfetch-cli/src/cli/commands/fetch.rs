//! `cdxfetch fetch <url>` – fetch every result page and write one file per page.

use anyhow::Result;
use cdxfetch_core::config::CdxConfig;
use cdxfetch_core::fetch::CurlPageFetcher;
use cdxfetch_core::job::{build_jobs, JobTemplate, OutputTarget, QueueOrder};
use cdxfetch_core::naming;
use cdxfetch_core::retry::RetryPolicy;
use cdxfetch_core::scheduler::{self, FailureReason, ProgressStats, RunOptions, RunReport, RunState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::target::{
    interruptible, num_pages, query_params, request_timeout, resolve_targets, Target,
};
use crate::cli::{FetchArgs, QueryArgs};

pub async fn run_fetch(
    cfg: &CdxConfig,
    query: &QueryArgs,
    fetch: &FetchArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let targets = interruptible(cancel, resolve_targets(cfg, query)).await?;
    let base_prefix = fetch
        .output_prefix
        .clone()
        .unwrap_or_else(|| naming::output_prefix_for(&query.url));
    let explicit = (!fetch.pages.is_empty()).then_some(fetch.pages.as_slice());
    let timeout = request_timeout(cfg, query);

    for target in targets {
        let params = query_params(query, fetch.fl.clone(), fetch.json);
        let total_pages = interruptible(
            cancel,
            num_pages(target.endpoint.clone(), params.clone(), timeout),
        )
        .await?;
        let prefix = match target.name.as_deref() {
            Some(name) => format!("{base_prefix}{name}-"),
            None => base_prefix.clone(),
        };
        let template = JobTemplate {
            endpoint: target.endpoint.clone(),
            query: params,
            output: OutputTarget {
                dir: fetch.directory.clone(),
                prefix,
                gzipped: fetch.gzipped || cfg.gzipped,
            },
            timeout,
            max_retries: fetch.max_retries.unwrap_or(cfg.max_retries),
        };
        let jobs = build_jobs(template, total_pages, explicit);

        let report = run_with_progress(cfg, fetch, jobs, cancel).await;
        print_summary(&target, &report);
        report.check_interrupted()?;
    }
    Ok(())
}

fn run_options(cfg: &CdxConfig, fetch: &FetchArgs) -> RunOptions {
    RunOptions {
        workers: fetch.processes.or(cfg.workers),
        order: if fetch.in_order || cfg.in_order {
            QueueOrder::InOrder
        } else {
            QueueOrder::Shuffled
        },
        policy: RetryPolicy::from(&cfg.retry_or_default()),
        cancel_grace: Duration::from_secs(cfg.cancel_grace_secs),
        progress_tx: None,
    }
}

async fn run_with_progress(
    cfg: &CdxConfig,
    fetch: &FetchArgs,
    jobs: Vec<cdxfetch_core::job::Job>,
    cancel: &CancellationToken,
) -> RunReport {
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressStats>(16);
    const PROGRESS_INTERVAL_MS: u64 = 500;
    let progress_handle = tokio::spawn(async move {
        let mut last_print = Instant::now();
        while let Some(stats) = progress_rx.recv().await {
            let now = Instant::now();
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
                || stats.is_complete()
            {
                let eta = stats
                    .eta_secs()
                    .map(|s| format!("{:.0}s", s))
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "  {} / {} pages settled ({:.1}%), {} written  {:.2} pages/s  ETA {}",
                    stats.pages_settled,
                    stats.total_pages,
                    stats.fraction() * 100.0,
                    stats.pages_written,
                    stats.pages_per_sec(),
                    eta
                );
                last_print = now;
            }
        }
    });

    let opts = RunOptions {
        progress_tx: Some(progress_tx),
        ..run_options(cfg, fetch)
    };
    let report = scheduler::run_pages(
        jobs,
        Arc::new(CurlPageFetcher::new()),
        opts,
        cancel.clone().cancelled_owned(),
    )
    .await;

    // Abandoned workers may still hold a sender after an interrupt.
    if report.is_interrupted() {
        progress_handle.abort();
    } else {
        let _ = progress_handle.await;
    }
    report
}

fn print_summary(target: &Target, report: &RunReport) {
    let label = target.label();
    match report.state {
        RunState::NoResults => println!("{label}: no results."),
        RunState::Done | RunState::Interrupted => {
            println!(
                "{label}: {} of {} page(s) written{}",
                report.succeeded,
                report.total_jobs,
                if report.is_interrupted() {
                    " (interrupted)"
                } else {
                    ""
                }
            );
            if !report.not_found.is_empty() {
                println!("  no results on {} page(s)", report.not_found.len());
            }
            for failure in &report.failures {
                let reason = match &failure.reason {
                    FailureReason::Http(status) => format!("HTTP {status}"),
                    FailureReason::MaxRetriesExceeded { attempts } => {
                        format!("max retries exceeded after {attempts} attempt(s)")
                    }
                    FailureReason::Failed(msg) => msg.clone(),
                };
                println!("  page {} failed: {}", failure.page, reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdxfetch_core::config::RetryConfig;
    use cdxfetch_core::control::RunInterrupted;
    use std::path::PathBuf;

    fn fetch_args() -> FetchArgs {
        FetchArgs {
            processes: None,
            fl: None,
            json: false,
            gzipped: false,
            output_prefix: None,
            directory: None::<PathBuf>,
            max_retries: None,
            pages: Vec::new(),
            in_order: false,
        }
    }

    #[test]
    fn run_options_fall_back_to_config() {
        let mut cfg = CdxConfig::default();
        cfg.workers = Some(6);
        cfg.in_order = true;
        cfg.cancel_grace_secs = 2;
        let opts = run_options(&cfg, &fetch_args());
        assert_eq!(opts.workers, Some(6));
        assert_eq!(opts.order, QueueOrder::InOrder);
        assert_eq!(opts.cancel_grace, Duration::from_secs(2));
        assert_eq!(opts.policy.base_delay, Duration::from_millis(250));
    }

    #[test]
    fn run_options_survive_out_of_range_retry_delay() {
        let mut cfg = CdxConfig::default();
        cfg.retry = Some(RetryConfig {
            base_delay_secs: f64::INFINITY,
            max_delay_secs: 9,
        });
        let opts = run_options(&cfg, &fetch_args());
        assert_eq!(opts.policy.base_delay, Duration::from_secs(9));
    }

    #[tokio::test]
    async fn interrupt_before_fetch_stops_without_network() {
        let cfg = CdxConfig::default();
        let query = QueryArgs {
            url: "*.example.com".to_string(),
            coll: None,
            cdx_server_url: Some("http://127.0.0.1:9/never-index".to_string()),
            page_size: None,
            headers: Vec::new(),
            timeout: None,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_fetch(&cfg, &query, &fetch_args(), &cancel).await.unwrap_err();
        assert!(err.downcast_ref::<RunInterrupted>().is_some());
    }

    #[test]
    fn flags_override_config() {
        let cfg = CdxConfig::default();
        let mut args = fetch_args();
        args.processes = Some(3);
        args.in_order = true;
        let opts = run_options(&cfg, &args);
        assert_eq!(opts.workers, Some(3));
        assert_eq!(opts.order, QueueOrder::InOrder);
    }
}
