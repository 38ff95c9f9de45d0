//! `cdxfetch collections` – list the collections an index server offers.

use anyhow::{Context, Result};
use cdxfetch_core::config::CdxConfig;
use cdxfetch_core::discovery;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::target::{api_base, interruptible};

pub async fn run_collections(
    cfg: &CdxConfig,
    api_base_override: Option<&str>,
    cancel: &CancellationToken,
) -> Result<()> {
    let base = api_base(cfg, api_base_override)?;
    let timeout = Duration::from_secs(cfg.timeout_secs.max(1));
    let listing = {
        let base = base.clone();
        async move {
            let urls = tokio::task::spawn_blocking(move || {
                discovery::discover_collections(&base, &[], timeout)
            })
            .await
            .context("collection discovery task")??;
            Ok::<_, anyhow::Error>(urls)
        }
    };
    let urls = interruptible(cancel, listing).await?;
    if urls.is_empty() {
        println!("No collections listed at {base}");
        return Ok(());
    }
    for url in urls {
        println!("{}\t{}", discovery::collection_name(&url), url);
    }
    Ok(())
}
