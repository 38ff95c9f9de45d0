//! Shared by `fetch` and `num-pages`: pick the index endpoint(s) and build the query.

use anyhow::{bail, Context, Result};
use cdxfetch_core::config::CdxConfig;
use cdxfetch_core::control::RunInterrupted;
use cdxfetch_core::discovery;
use cdxfetch_core::job::QueryParams;
use cdxfetch_core::resolver;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cli::QueryArgs;

/// `--coll` value selecting every collection.
const ALL_COLLECTIONS: &str = "all";

/// One index endpoint to query.
#[derive(Debug, Clone)]
pub struct Target {
    /// Collection name when running over all collections (goes into the file prefix).
    pub name: Option<String>,
    pub endpoint: Url,
}

impl Target {
    /// Label for messages.
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| discovery::collection_name(&self.endpoint))
    }
}

pub fn api_base(cfg: &CdxConfig, api_base: Option<&str>) -> Result<Url> {
    let raw = api_base.unwrap_or(&cfg.api_base);
    let mut url = Url::parse(raw).with_context(|| format!("invalid index server URL {raw}"))?;
    // Collection endpoints are joined relative to the base.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub fn request_timeout(cfg: &CdxConfig, query: &QueryArgs) -> Duration {
    Duration::from_secs(query.timeout.unwrap_or(cfg.timeout_secs).max(1))
}

/// Query parameters shared by the count query and every page request.
pub fn query_params(query: &QueryArgs, fields: Option<String>, json: bool) -> QueryParams {
    QueryParams {
        search_key: query.url.clone(),
        page_size: query.page_size,
        fields,
        json,
        headers: query.headers.clone(),
    }
}

/// Endpoint selection: explicit server URL, named collection, every collection,
/// the configured default, or the newest collection the server lists.
pub async fn resolve_targets(cfg: &CdxConfig, query: &QueryArgs) -> Result<Vec<Target>> {
    if let Some(raw) = query.cdx_server_url.as_deref() {
        let endpoint =
            Url::parse(raw).with_context(|| format!("invalid --cdx-server-url {raw}"))?;
        return Ok(vec![Target {
            name: None,
            endpoint,
        }]);
    }

    let base = api_base(cfg, None)?;
    let named = query.coll.as_deref().or(cfg.default_collection.as_deref());
    match named {
        Some(ALL_COLLECTIONS) => {
            let targets: Vec<Target> = discover(cfg, &base, query)
                .await?
                .into_iter()
                .map(|endpoint| Target {
                    name: Some(discovery::collection_name(&endpoint)),
                    endpoint,
                })
                .collect();
            tracing::info!(collections = targets.len(), "querying all collections");
            Ok(targets)
        }
        Some(name) => Ok(vec![Target {
            name: None,
            endpoint: discovery::collection_endpoint(&base, name)?,
        }]),
        None => {
            let Some(endpoint) = discover(cfg, &base, query).await?.into_iter().next() else {
                bail!("no collections listed at {base}");
            };
            tracing::info!(
                collection = %discovery::collection_name(&endpoint),
                "using newest collection"
            );
            Ok(vec![Target {
                name: None,
                endpoint,
            }])
        }
    }
}

async fn discover(cfg: &CdxConfig, base: &Url, query: &QueryArgs) -> Result<Vec<Url>> {
    let base = base.clone();
    let headers = query.headers.clone();
    let timeout = request_timeout(cfg, query);
    let urls = tokio::task::spawn_blocking(move || {
        discovery::discover_collections(&base, &headers, timeout)
    })
    .await
    .context("collection discovery task")??;
    Ok(urls)
}

/// Page count for `params` at `endpoint`.
pub async fn num_pages(endpoint: Url, params: QueryParams, timeout: Duration) -> Result<u64> {
    let pages = tokio::task::spawn_blocking(move || {
        resolver::resolve_num_pages(&endpoint, &params, timeout)
    })
    .await
    .context("page count task")??;
    Ok(pages)
}

/// Run `fut` unless the user interrupts first, or already has.
pub async fn interruptible<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(RunInterrupted { finished: 0, total: 0 }.into()),
        res = fut => res,
    }
}
