//! `cdxfetch num-pages <url>` – print the page count without fetching.

use anyhow::Result;
use cdxfetch_core::config::CdxConfig;
use tokio_util::sync::CancellationToken;

use super::target::{interruptible, num_pages, query_params, request_timeout, resolve_targets};
use crate::cli::QueryArgs;

pub async fn run_num_pages(
    cfg: &CdxConfig,
    query: &QueryArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let targets = interruptible(cancel, resolve_targets(cfg, query)).await?;
    let timeout = request_timeout(cfg, query);
    let params = query_params(query, None, false);
    for target in targets {
        let pages = interruptible(
            cancel,
            num_pages(target.endpoint.clone(), params.clone(), timeout),
        )
        .await?;
        match target.name.as_deref() {
            Some(name) => println!("{name}\t{pages}"),
            None => println!("{pages}"),
        }
    }
    Ok(())
}
