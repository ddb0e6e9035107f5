//! `sqp-tracker`: quarterly Search Query Performance keyword tracker.
//!
//! Reads `sqp.toml` (or the path given with `--config`), opens the SQLite
//! ledger store, and runs one command against it.
//!
//! # Usage
//!
//! ```text
//! sqp-tracker start --asin B0EXAMPLE1 --sku GARLIC-PRESS-01
//! sqp-tracker update-all
//! sqp-tracker status --asin B0EXAMPLE1 --year 2026 --quarter 3
//! sqp-tracker export --asin B0EXAMPLE1 > q4.tsv
//! sqp-tracker fetch-listing --asin B0EXAMPLE1
//! ```

mod client;
mod output;
mod reports;
mod settings;

use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use sqp_core::{
  calendar::{Clock, Quarter, SystemClock},
  dashboard,
  engine::QuarterEngine,
  source::{ListingSource, MasterList, StaticMasterList},
  store::LedgerStore,
};
use sqp_store_sqlite::{SqliteStore, sheet};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{
  client::{ApiClient, HttpListingSource, HttpReportSource},
  reports::{CsvReportSource, Reports},
  settings::{ReportOrigin, TrackerConfig},
};

type Engine = QuarterEngine<SqliteStore, Reports, HttpListingSource>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "sqp-tracker", version, about = "Quarterly SQP keyword tracker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "sqp.toml")]
  config: PathBuf,

  /// Print update outcomes and the dashboard as JSON.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Lock this quarter's keywords for one ASIN and record every complete week.
  Start {
    #[arg(long)]
    asin: String,
    /// Listing SKU for placement checks (defaults to the master list entry).
    #[arg(long)]
    sku:  Option<String>,
  },
  /// Start every active ASIN in the master list.
  StartAll,
  /// Record the next complete week for one ASIN.
  Update {
    #[arg(long)]
    asin: String,
  },
  /// Update every active ASIN; exits non-zero if any failed.
  UpdateAll,
  /// Show a ledger's phase, latest metrics and alerts.
  Status {
    #[arg(long)]
    asin:   String,
    #[command(flatten)]
    period: Period,
  },
  /// Print a ledger as tab-separated values.
  Export {
    #[arg(long)]
    asin:   String,
    #[command(flatten)]
    period: Period,
  },
  /// Summarise every ledger of a quarter and list flagged keywords.
  Dashboard {
    #[command(flatten)]
    period: Period,
  },
  /// Show a listing's title and backend keywords. With `--asin`, also show
  /// where this quarter's locked keywords appear in it.
  FetchListing {
    #[arg(long, required_unless_present = "sku")]
    asin: Option<String>,
    /// Defaults to the master list entry for `--asin`.
    #[arg(long)]
    sku:  Option<String>,
  },
}

/// A quarter other than the current one.
#[derive(Args)]
struct Period {
  #[arg(long, requires = "quarter")]
  year:    Option<i32>,
  #[arg(long, requires = "year")]
  quarter: Option<u8>,
}

impl Period {
  fn resolve(&self) -> anyhow::Result<Quarter> {
    match (self.year, self.quarter) {
      (Some(year), Some(number)) => Ok(Quarter::new(year, number)?),
      _ => Ok(Quarter::containing(SystemClock.today())),
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = TrackerConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  match cli.command {
    Command::Status { asin, period } => {
      let ledger = load(&store, &asin, period.resolve()?).await?;
      print!("{}", output::status(&ledger, &cfg.engine.thresholds));
    }
    Command::Export { asin, period } => {
      let ledger = load(&store, &asin, period.resolve()?).await?;
      print!("{}", sheet::to_tsv(&ledger));
    }
    Command::Dashboard { period } => {
      let quarter = period.resolve()?;
      let ledgers = store
        .list_ledgers(quarter)
        .await
        .with_context(|| format!("failed to list ledgers for {quarter}"))?;
      let dash = dashboard::build(&ledgers, &cfg.asins, &cfg.engine.thresholds);
      if cli.json {
        println!("{}", serde_json::to_string_pretty(&dash)?);
      } else {
        println!("{quarter}");
        print!("{}", output::dashboard(&dash));
      }
    }
    Command::Start { asin, sku } => {
      let sku = sku.or_else(|| cfg.sku_for(&asin).map(str::to_owned));
      start(&engine(&cfg, store)?, &asin, sku.as_deref()).await?;
    }
    Command::StartAll => start_all(&engine(&cfg, store)?, &cfg).await?,
    Command::Update { asin } => update(&engine(&cfg, store)?, &asin, cli.json).await?,
    Command::UpdateAll => update_all(&engine(&cfg, store)?, &cfg, cli.json).await?,
    Command::FetchListing { asin, sku } => {
      fetch_listing(&cfg, &store, asin.as_deref(), sku, cli.json).await?;
    }
  }

  Ok(())
}

async fn load(
  store: &SqliteStore,
  asin: &str,
  quarter: Quarter,
) -> anyhow::Result<sqp_core::ledger::KeywordLedger> {
  store
    .load_ledger(asin, quarter)
    .await
    .with_context(|| format!("failed to load ledger for {asin}"))?
    .with_context(|| format!("no ledger for {asin} in {quarter}"))
}

fn api(cfg: &TrackerConfig) -> anyhow::Result<ApiClient> {
  ApiClient::new(cfg.api_token.clone(), Duration::from_secs(cfg.request_timeout_secs))
}

fn engine(cfg: &TrackerConfig, store: SqliteStore) -> anyhow::Result<Engine> {
  let api = api(cfg)?;
  let reports = match cfg.report_origin()? {
    ReportOrigin::Url(url) => Reports::Http(HttpReportSource::new(api.clone(), url)),
    ReportOrigin::Dir(dir) => Reports::Csv(CsvReportSource::new(dir)),
  };
  Ok(QuarterEngine::new(
    store,
    reports,
    HttpListingSource::new(api, cfg.listing_url.clone()),
    cfg.engine.clone(),
  ))
}

async fn fetch_listing(
  cfg: &TrackerConfig,
  store: &SqliteStore,
  asin: Option<&str>,
  sku: Option<String>,
  json: bool,
) -> anyhow::Result<()> {
  let sku = match (sku, asin) {
    (Some(sku), _) => sku,
    (None, Some(asin)) => cfg
      .sku_for(asin)
      .map(str::to_owned)
      .with_context(|| format!("no sku configured for {asin}; pass --sku"))?,
    (None, None) => anyhow::bail!("either --asin or --sku is required"),
  };

  let listing = HttpListingSource::new(api(cfg)?, cfg.listing_url.clone())
    .fetch_placement(&sku)
    .await
    .with_context(|| format!("failed to fetch listing for {sku}"))?;

  let ledger = match asin {
    Some(asin) => {
      let quarter = Quarter::containing(SystemClock.today());
      store
        .load_ledger(asin, quarter)
        .await
        .with_context(|| format!("failed to load ledger for {asin}"))?
    }
    None => None,
  };

  if json {
    println!("{}", serde_json::to_string_pretty(&listing)?);
  } else {
    print!("{}", output::listing(&sku, &listing, ledger.as_ref()));
  }
  Ok(())
}

// ─── Engine commands ──────────────────────────────────────────────────────────

async fn start(engine: &Engine, asin: &str, sku: Option<&str>) -> anyhow::Result<()> {
  let ledger = engine
    .start(asin, sku)
    .await
    .with_context(|| format!("failed to start {asin}"))?;
  println!(
    "{asin}: locked {} keywords for {}, recorded through W{:02}",
    ledger.keywords().len(),
    ledger.quarter(),
    ledger.last_recorded_week()
  );
  Ok(())
}

async fn start_all(engine: &Engine, cfg: &TrackerConfig) -> anyhow::Result<()> {
  let entries = StaticMasterList(cfg.asins.clone()).active_asins().await?;
  let report = engine.start_all(&entries).await;
  print!(
    "{}",
    output::batch(&report, |asin, ledger| format!(
      "{asin}: locked {} keywords, recorded through W{:02}",
      ledger.keywords().len(),
      ledger.last_recorded_week()
    ))
  );
  if !report.is_clean() {
    anyhow::bail!("{} of {} ASINs failed to start", report.failed.len(), entries.len());
  }
  Ok(())
}

async fn update(engine: &Engine, asin: &str, json: bool) -> anyhow::Result<()> {
  let outcome = engine
    .update(asin)
    .await
    .with_context(|| format!("failed to update {asin}"))?;
  if json {
    println!("{}", serde_json::to_string_pretty(&outcome)?);
  } else {
    println!("{}", output::outcome_line(asin, &outcome));
  }
  Ok(())
}

async fn update_all(engine: &Engine, cfg: &TrackerConfig, json: bool) -> anyhow::Result<()> {
  let entries = StaticMasterList(cfg.asins.clone()).active_asins().await?;
  let report = engine.update_all(&entries).await;
  if json {
    let succeeded: Vec<_> = report
      .succeeded
      .iter()
      .map(|(asin, o)| serde_json::json!({ "asin": asin, "result": o }))
      .collect();
    let failed: Vec<_> = report
      .failed
      .iter()
      .map(|(asin, e)| serde_json::json!({ "asin": asin, "error": e.to_string() }))
      .collect();
    let body = serde_json::json!({ "succeeded": succeeded, "failed": failed });
    println!("{}", serde_json::to_string_pretty(&body)?);
  } else {
    print!("{}", output::batch(&report, output::outcome_line));
  }
  if !report.is_clean() {
    anyhow::bail!("{} of {} ASINs failed to update", report.failed.len(), entries.len());
  }
  Ok(())
}
