//! [`QuarterEngine`] drives a ledger through its quarter lifecycle.
//!
//! ```text
//! [no ledger] --start--> [locking] --lock--> [active, week=k] --update--> ... --> [complete]
//! ```
//!
//! Every operation for one ASIN runs under that ASIN's async mutex, so two
//! in-flight operations can never interleave appends to the same ledger.
//! Different ASINs proceed independently.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  calendar::{Clock, Quarter, SystemClock},
  config::EngineConfig,
  ledger::{Alert, KeywordLedger, LedgerPhase},
  source::{AsinEntry, ListingSource, ReportSource},
  store::LedgerStore,
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What a single [`QuarterEngine::update`] call did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
  /// A newly complete week was fetched and recorded.
  Appended { week: u8, alerts: Vec<Alert> },
  /// No week has completed since the last recorded one; nothing changed.
  UpToDate { week: u8 },
  /// All thirteen weeks are already recorded; nothing changed.
  QuarterComplete,
}

/// Result of a batch operation: one entry per ASIN, successes and failures
/// kept apart. A failure for one ASIN never prevents the others.
#[derive(Debug, Default)]
pub struct BatchReport<T> {
  pub succeeded: Vec<(String, T)>,
  pub failed:    Vec<(String, Error)>,
}

impl<T> BatchReport<T> {
  pub fn is_clean(&self) -> bool { self.failed.is_empty() }
}

pub type UpdateReport = BatchReport<UpdateOutcome>;

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct QuarterEngine<S, R, L, C = SystemClock> {
  store:    S,
  reports:  R,
  listings: L,
  clock:    C,
  config:   EngineConfig,
  locks:    Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S, R, L> QuarterEngine<S, R, L, SystemClock>
where
  S: LedgerStore,
  R: ReportSource,
  L: ListingSource,
{
  pub fn new(store: S, reports: R, listings: L, config: EngineConfig) -> Self {
    Self::with_clock(store, reports, listings, SystemClock, config)
  }
}

impl<S, R, L, C> QuarterEngine<S, R, L, C>
where
  S: LedgerStore,
  R: ReportSource,
  L: ListingSource,
  C: Clock,
{
  pub fn with_clock(store: S, reports: R, listings: L, clock: C, config: EngineConfig) -> Self {
    Self { store, reports, listings, clock, config, locks: Mutex::new(HashMap::new()) }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn reports(&self) -> &R { &self.reports }

  pub fn config(&self) -> &EngineConfig { &self.config }

  /// The quarter containing today.
  pub fn current_quarter(&self) -> Quarter { Quarter::containing(self.clock.today()) }

  fn asin_lock(&self, asin: &str) -> Arc<tokio::sync::Mutex<()>> {
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    locks.entry(asin.to_owned()).or_default().clone()
  }

  async fn load(&self, asin: &str, quarter: Quarter) -> Result<Option<KeywordLedger>> {
    self
      .store
      .load_ledger(asin, quarter)
      .await
      .map_err(|e| Error::Store(Box::new(e)))
  }

  async fn save(&self, ledger: &KeywordLedger) -> Result<()> {
    self.store.save_ledger(ledger).await.map_err(|e| Error::Store(Box::new(e)))
  }

  /// Fetch the listing for `sku` and record every keyword's placement for
  /// `week`, returning the alerts raised.
  async fn check_placement(
    &self,
    ledger: &mut KeywordLedger,
    sku: &str,
    week: u8,
  ) -> Result<Vec<Alert>> {
    let listing = self.listings.fetch_placement(sku).await?;
    let keywords: Vec<String> =
      ledger.keywords().iter().map(|k| k.keyword().to_owned()).collect();

    let mut raised = Vec::new();
    for keyword in keywords {
      let (in_title, in_backend) = listing.placement(&keyword);
      raised.extend(ledger.record_placement(&keyword, in_title, in_backend, week)?);
    }
    for alert in &raised {
      warn!(
        asin = ledger.asin(),
        keyword = %alert.keyword,
        week = alert.week,
        "{}",
        alert.kind
      );
    }
    Ok(raised)
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  /// Create the ledger for `asin` in the current quarter.
  ///
  /// Fetches every complete week so far, locks the top-N keywords from the
  /// first one, records all of them in order, and checks placement for the
  /// latest week when `sku` is given. Nothing is persisted unless every step
  /// succeeds.
  pub async fn start(&self, asin: &str, sku: Option<&str>) -> Result<KeywordLedger> {
    let lock = self.asin_lock(asin);
    let _guard = lock.lock().await;

    let today = self.clock.today();
    let quarter = Quarter::containing(today);

    if self.load(asin, quarter).await?.is_some() {
      return Err(Error::LedgerExists { asin: asin.to_owned(), quarter });
    }

    let weeks = quarter.complete_weeks(today);
    if weeks.is_empty() {
      return Err(Error::NoCompleteWeeks(quarter));
    }

    info!(asin, %quarter, weeks = weeks.len(), "starting quarter");

    let mut snapshots = Vec::with_capacity(weeks.len());
    for week in &weeks {
      let metrics = self.reports.fetch_weekly_metrics(asin, quarter, *week).await?;
      debug!(asin, week = %week.label(), keywords = metrics.len(), "fetched report");
      snapshots.push((week.index, metrics));
    }

    let mut ledger = KeywordLedger::new(asin, quarter, sku.map(str::to_owned));
    if let Some((_, first)) = snapshots.first() {
      ledger.lock_keywords(first, self.config.top_keywords)?;
    }
    for (index, metrics) in &snapshots {
      ledger.append_week(*index, metrics, &self.config.thresholds)?;
    }

    if let Some(sku) = sku {
      let latest = ledger.last_recorded_week();
      self.check_placement(&mut ledger, sku, latest).await?;
    }

    self.save(&ledger).await?;
    info!(
      asin,
      %quarter,
      keywords = ledger.keywords().len(),
      week = ledger.last_recorded_week(),
      "ledger created"
    );
    Ok(ledger)
  }

  /// Record the next complete week for `asin`, if one has elapsed.
  ///
  /// Calling this again before another week completes changes nothing.
  pub async fn update(&self, asin: &str) -> Result<UpdateOutcome> {
    let lock = self.asin_lock(asin);
    let _guard = lock.lock().await;

    let today = self.clock.today();
    let quarter = Quarter::containing(today);

    let mut ledger = self
      .load(asin, quarter)
      .await?
      .ok_or_else(|| Error::NoLedgerYet { asin: asin.to_owned(), quarter })?;

    let last = match ledger.phase() {
      LedgerPhase::Locking => return Err(Error::NotLocked),
      LedgerPhase::Complete => return Ok(UpdateOutcome::QuarterComplete),
      LedgerPhase::Active { week } => week,
    };

    let Some(week) = quarter.week(last + 1).filter(|w| w.is_complete(today)) else {
      debug!(asin, %quarter, week = last, "no newly complete week");
      return Ok(UpdateOutcome::UpToDate { week: last });
    };

    let metrics = self.reports.fetch_weekly_metrics(asin, quarter, week).await?;
    ledger.append_week(week.index, &metrics, &self.config.thresholds)?;

    let alerts = match ledger.sku().map(str::to_owned) {
      Some(sku) => self.check_placement(&mut ledger, &sku, week.index).await?,
      None => Vec::new(),
    };

    self.save(&ledger).await?;
    // Weeks that completed but still await their own update call.
    let pending = quarter
      .last_complete_week(today)
      .map_or(0, |w| w.saturating_sub(week.index));
    info!(
      asin,
      %quarter,
      week = %week.label(),
      alerts = alerts.len(),
      pending,
      "week recorded"
    );
    Ok(UpdateOutcome::Appended { week: week.index, alerts })
  }

  // ── Batches ───────────────────────────────────────────────────────────────

  /// [`Self::update`] every active entry concurrently, collecting failures
  /// instead of stopping at the first one. Entries are reported in input
  /// order.
  pub async fn update_all(&self, entries: &[AsinEntry]) -> UpdateReport {
    let results = join_all(
      entries
        .iter()
        .filter(|e| e.active)
        .map(|e| async move { (e.asin.clone(), self.update(&e.asin).await) }),
    )
    .await;
    collect(results)
  }

  /// [`Self::start`] every active entry concurrently, with the same failure
  /// handling as [`Self::update_all`].
  pub async fn start_all(&self, entries: &[AsinEntry]) -> BatchReport<KeywordLedger> {
    let results = join_all(
      entries
        .iter()
        .filter(|e| e.active)
        .map(|e| async move { (e.asin.clone(), self.start(&e.asin, e.sku.as_deref()).await) }),
    )
    .await;
    collect(results)
  }
}

fn collect<T>(results: Vec<(String, Result<T>)>) -> BatchReport<T> {
  let mut report = BatchReport { succeeded: Vec::new(), failed: Vec::new() };
  for (asin, result) in results {
    match result {
      Ok(value) => report.succeeded.push((asin, value)),
      Err(e) => {
        warn!(asin = %asin, error = %e, "operation failed");
        report.failed.push((asin, e));
      }
    }
  }
  report
}
