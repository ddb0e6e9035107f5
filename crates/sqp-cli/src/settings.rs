//! Tracker configuration: a TOML file layered under `SQP_*` environment
//! variables.
//!
//! ```toml
//! store_path  = "~/.local/share/sqp/ledgers.db"
//! report_url  = "https://reports.example.com"
//! listing_url = "https://catalog.example.com"
//!
//! # Read seller-console CSV exports instead of calling report_url.
//! # report_dir = "~/sqp-exports"
//!
//! [engine]
//! top_keywords = 10
//!
//! [engine.thresholds]
//! ghost_min_volume = 800
//!
//! [[asins]]
//! asin = "B0EXAMPLE1"
//! sku  = "GARLIC-PRESS-01"
//! name = "Garlic Press"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use sqp_core::{config::EngineConfig, source::AsinEntry};

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  #[serde(default)]
  pub engine:               EngineConfig,
  /// Base URL of the report service.
  #[serde(default)]
  pub report_url:           Option<String>,
  /// Directory of `{ASIN}_{YYYY-MM-DD}.csv` exports. Takes precedence over
  /// `report_url`.
  #[serde(default)]
  pub report_dir:           Option<PathBuf>,
  /// Base URL of the listing service. Placement checks fail without it.
  #[serde(default)]
  pub listing_url:          Option<String>,
  /// Bearer token sent to both services.
  #[serde(default)]
  pub api_token:            Option<String>,
  #[serde(default = "default_timeout")]
  pub request_timeout_secs: u64,
  /// The master product list.
  #[serde(default)]
  pub asins:                Vec<AsinEntry>,
}

fn default_store_path() -> PathBuf { PathBuf::from("sqp.db") }

fn default_timeout() -> u64 { 60 }

/// Where weekly reports come from.
#[derive(Debug, PartialEq, Eq)]
pub enum ReportOrigin<'a> {
  Url(&'a str),
  Dir(&'a Path),
}

impl TrackerConfig {
  /// Read `path` (optional) then `SQP_*` variables, e.g. `SQP_REPORT_URL` or
  /// `SQP_ENGINE__TOP_KEYWORDS`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("SQP")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise TrackerConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.report_dir = cfg.report_dir.as_deref().map(expand_tilde);
    Ok(cfg)
  }

  pub fn report_origin(&self) -> anyhow::Result<ReportOrigin<'_>> {
    match (&self.report_dir, &self.report_url) {
      (Some(dir), _) => Ok(ReportOrigin::Dir(dir)),
      (None, Some(url)) => Ok(ReportOrigin::Url(url)),
      (None, None) => anyhow::bail!("either report_url or report_dir must be configured"),
    }
  }

  /// The configured SKU for `asin`, if the master list has one.
  pub fn sku_for(&self, asin: &str) -> Option<&str> {
    self
      .asins
      .iter()
      .find(|e| e.asin.eq_ignore_ascii_case(asin))
      .and_then(|e| e.sku.as_deref())
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
