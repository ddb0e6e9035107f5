//! Plain-text rendering of command results for the terminal.

use std::fmt::Write as _;

use sqp_core::{
  classifier,
  config::Thresholds,
  dashboard::Dashboard,
  engine::{BatchReport, UpdateOutcome},
  ledger::{KeywordLedger, LedgerPhase},
  source::Listing,
};

fn yes_no(flag: bool) -> &'static str { if flag { "yes" } else { "no" } }

pub fn outcome_line(asin: &str, outcome: &UpdateOutcome) -> String {
  match outcome {
    UpdateOutcome::Appended { week, alerts } if alerts.is_empty() => {
      format!("{asin}: recorded W{week:02}")
    }
    UpdateOutcome::Appended { week, alerts } => {
      format!("{asin}: recorded W{week:02}, {} alert(s)", alerts.len())
    }
    UpdateOutcome::UpToDate { week } => format!("{asin}: up to date at W{week:02}"),
    UpdateOutcome::QuarterComplete => format!("{asin}: quarter complete"),
  }
}

/// One line per ASIN, successes first, then a summary line.
pub fn batch<T>(report: &BatchReport<T>, describe: impl Fn(&str, &T) -> String) -> String {
  let mut out = String::new();
  for (asin, value) in &report.succeeded {
    let _ = writeln!(out, "{}", describe(asin, value));
  }
  for (asin, error) in &report.failed {
    let _ = writeln!(out, "{asin}: FAILED: {error}");
  }
  let _ = writeln!(
    out,
    "{} succeeded, {} failed",
    report.succeeded.len(),
    report.failed.len()
  );
  out
}

pub fn status(ledger: &KeywordLedger, t: &Thresholds) -> String {
  let mut out = String::new();
  let phase = match ledger.phase() {
    LedgerPhase::Locking => "locking".to_owned(),
    LedgerPhase::Active { week } => format!("active, last recorded W{week:02}"),
    LedgerPhase::Complete => "complete".to_owned(),
  };
  let _ = writeln!(out, "{} {} ({phase})", ledger.asin(), ledger.quarter());
  if let Some(sku) = ledger.sku() {
    let _ = writeln!(out, "sku: {sku}");
  }

  let _ = writeln!(
    out,
    "{:>4}  {:<40} {:>8} {:<12} {:<15} {:<13} {:>5}  {:<5} {:<7}",
    "rank", "keyword", "volume", "rank status", "diagnostic", "category", "opp", "title", "backend"
  );
  let mut actions = Vec::new();
  for kw in ledger.keywords() {
    let (volume, status, diagnostic, category, opp) = match kw.latest() {
      Some(m) => {
        if let Some(action) = classifier::recommended_action(m.category, &m.metrics, t) {
          actions.push((kw.keyword(), action));
        }
        (
          m.metrics.search_volume.to_string(),
          m.rank_status.to_string(),
          m.diagnostic.to_string(),
          m.category.to_string(),
          format!("{:.1}", m.opportunity_score),
        )
      }
      None => Default::default(),
    };
    let _ = writeln!(
      out,
      "{:>4}  {:<40} {:>8} {:<12} {:<15} {:<13} {:>5}  {:<5} {:<7}",
      kw.rank(),
      kw.keyword(),
      volume,
      status,
      diagnostic,
      category,
      opp,
      yes_no(kw.in_title()),
      yes_no(kw.in_backend()),
    );
  }

  if !actions.is_empty() {
    let _ = writeln!(out, "\nactions:");
    for (keyword, action) in actions {
      let _ = writeln!(out, "  {keyword}: {action}");
    }
  }

  if !ledger.alerts().is_empty() {
    let _ = writeln!(out, "\nalerts:");
    for a in ledger.alerts() {
      let _ = writeln!(out, "  W{:02} {}: {}", a.week, a.keyword, a.kind);
    }
  }
  out
}

pub fn dashboard(dash: &Dashboard) -> String {
  let mut out = String::new();
  let _ = writeln!(
    out,
    "{:<12} {:<24} {:>4} {:>5} {:>5} {:>5} {:>5} {:>4} {:>4} {:>4} {:>5}  {:<8} top alert",
    "asin", "product", "week", "top3", "p1hi", "p1lo", "invis", "b&b", "opp", "leak", "price",
    "health"
  );
  for s in &dash.summaries {
    let _ = writeln!(
      out,
      "{:<12} {:<24} {:>4} {:>5} {:>5} {:>5} {:>5} {:>4} {:>4} {:>4} {:>5}  {:<8} {}",
      s.asin,
      s.name.as_deref().unwrap_or("-"),
      format!("W{:02}", s.week),
      s.counts.top_3,
      s.counts.page_1_high,
      s.counts.page_1_low,
      s.counts.invisible,
      s.categories.bread_butter,
      s.categories.opportunity,
      s.categories.leak,
      s.price_flags,
      s.health.to_string(),
      s.top_alert.as_deref().unwrap_or("-"),
    );
  }

  if !dash.flagged.is_empty() {
    let _ = writeln!(out, "\nflagged keywords:");
    for f in &dash.flagged {
      let _ = writeln!(out, "  {} #{} {}: {}", f.asin, f.rank, f.keyword, f.reasons.join("; "));
    }
  }

  if !dash.price_flags.is_empty() {
    let _ = writeln!(out, "\npriced above market:");
    for f in &dash.price_flags {
      let b = &f.benchmark;
      let _ = writeln!(
        out,
        "  {:<8} {} #{} {}: {:.2} vs {:.2} market (+{:.1}%, imp {:.1}%)",
        b.severity.to_string(),
        f.asin,
        f.rank,
        f.keyword,
        b.asin_price,
        b.market_price,
        b.diff_percent,
        f.impression_share,
      );
    }
  }
  out
}

/// A listing's searchable text, then the placement of each locked keyword
/// when a ledger is given.
pub fn listing(sku: &str, listing: &Listing, ledger: Option<&KeywordLedger>) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "sku: {sku}");
  let _ = writeln!(out, "title: {}", listing.title);
  let _ = writeln!(out, "backend keywords: {}", listing.backend_keywords.join(", "));

  if let Some(ledger) = ledger {
    let _ = writeln!(out, "\n{:>4}  {:<40} {:<5} {:<7}", "rank", "keyword", "title", "backend");
    for kw in ledger.keywords() {
      let (in_title, in_backend) = listing.placement(kw.keyword());
      let _ = writeln!(
        out,
        "{:>4}  {:<40} {:<5} {:<7}",
        kw.rank(),
        kw.keyword(),
        yes_no(in_title),
        yes_no(in_backend),
      );
    }
  }
  out
}
