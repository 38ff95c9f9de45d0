use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default CDX server listing collections (`<base><collection>-index`).
pub const DEFAULT_API_BASE: &str = "https://index.commoncrawl.org/";

/// Retry backoff parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry of a page, in seconds (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/cdxfetch/config.toml`.
/// Every value can be overridden per run on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdxConfig {
    /// Index server base URL; collections live at `<api_base><collection>-index`.
    pub api_base: String,
    /// Collection used when none is given (None = newest listed by the server).
    #[serde(default)]
    pub default_collection: Option<String>,
    /// Per-request connect / stall timeout in seconds.
    pub timeout_secs: u64,
    /// Retries per page after the first attempt.
    pub max_retries: u32,
    /// Worker count (None = twice the CPU count, capped at the page count).
    #[serde(default)]
    pub workers: Option<usize>,
    /// Fetch pages in index order instead of shuffled.
    #[serde(default)]
    pub in_order: bool,
    /// Store gzip-encoded responses as `.gz` files.
    #[serde(default)]
    pub gzipped: bool,
    /// Seconds to wait for workers after Ctrl-C before giving up on them.
    pub cancel_grace_secs: u64,
    /// Optional retry backoff; built-in defaults when missing.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for CdxConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            default_collection: None,
            timeout_secs: 30,
            max_retries: 5,
            workers: None,
            in_order: false,
            gzipped: false,
            cancel_grace_secs: 5,
            retry: None,
        }
    }
}

impl CdxConfig {
    /// Retry backoff, falling back to defaults.
    pub fn retry_or_default(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cdxfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CdxConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] but at an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<CdxConfig> {
    if !path.exists() {
        let default_cfg = CdxConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)
            .with_context(|| format!("write default config {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: CdxConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
