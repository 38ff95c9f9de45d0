//! CLI for cdxfetch.

mod commands;
mod signal;

use anyhow::Result;
use cdxfetch_core::config;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_collections, run_completions, run_fetch, run_num_pages};

/// Top-level CLI for cdxfetch.
#[derive(Debug, Parser)]
#[command(name = "cdxfetch")]
#[command(about = "cdxfetch: parallel page fetcher for CDX index servers", long_about = None)]
pub struct Cli {
    /// Debug logging for cdxfetch (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch every result page for a URL pattern and write one file per page.
    Fetch {
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Print the number of result pages for a URL pattern.
    NumPages {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// List the collections the index server offers.
    Collections {
        /// Index server base URL (default from config).
        #[arg(long, value_name = "URL")]
        api_base: Option<String>,
    },

    /// Print shell completions to stdout.
    Completions {
        shell: clap_complete::Shell,
    },
}

/// What to query and where.
#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// URL pattern to look up, e.g. `*.example.com` or `example.com/path/*`.
    pub url: String,

    /// Collection to query, e.g. CC-MAIN-2024-10, or "all" for every collection.
    #[arg(short, long, value_name = "NAME")]
    pub coll: Option<String>,

    /// Full index endpoint to query instead of a named collection.
    #[arg(long, value_name = "URL", conflicts_with = "coll")]
    pub cdx_server_url: Option<String>,

    /// Index blocks per result page.
    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,

    /// Extra request header, "Name: value". Repeatable.
    #[arg(long = "header", value_name = "NAME: VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Per-request connect / stall timeout in seconds (default from config).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// How to fetch and where to write.
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// Parallel workers (default: twice the CPU count, at most one per page).
    #[arg(short = 'p', long, value_name = "N")]
    pub processes: Option<usize>,

    /// Fields to return, e.g. `url,timestamp,status`.
    #[arg(long, value_name = "FIELDS")]
    pub fl: Option<String>,

    /// Ask the server for JSON lines instead of CDX text.
    #[arg(short, long)]
    pub json: bool,

    /// Keep gzip-encoded pages compressed (`.gz` files).
    #[arg(short = 'z', long)]
    pub gzipped: bool,

    /// File name prefix (default derived from the URL pattern).
    #[arg(short, long, value_name = "PREFIX")]
    pub output_prefix: Option<String>,

    /// Directory for page files (created if missing).
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Retries per page after the first attempt (default from config).
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Fetch only these page indices (comma separated or repeated).
    #[arg(long, value_name = "PAGE", value_delimiter = ',', num_args = 1..)]
    pub pages: Vec<u64>,

    /// Fetch pages in index order instead of shuffled.
    #[arg(long)]
    pub in_order: bool,
}

/// Parse `Name: value` into a header pair.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(format!("invalid header name in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        if let CliCommand::Completions { shell } = self.command {
            run_completions(shell);
            return Ok(());
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let cancel = signal::interrupt_token();

        match self.command {
            CliCommand::Fetch { query, fetch } => run_fetch(&cfg, &query, &fetch, &cancel).await?,
            CliCommand::NumPages { query } => run_num_pages(&cfg, &query, &cancel).await?,
            CliCommand::Collections { api_base } => {
                run_collections(&cfg, api_base.as_deref(), &cancel).await?
            }
            CliCommand::Completions { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
