//! Quarter-at-a-glance view across ledgers: which keywords moved sharply
//! between their last two recorded weeks, which are priced above the market,
//! and a health label per product.

use std::fmt;

use serde::Serialize;

use crate::{
  classifier::{self, PriceBenchmark},
  config::Thresholds,
  ledger::{KeywordLedger, TrackedKeyword},
  metric::{KeywordCategory, RankStatus, WeeklyMetric},
  source::AsinEntry,
};

/// Week-over-week volume loss (as a fraction) that flags a keyword.
pub const VOLUME_DROP_THRESHOLD: f64 = 0.30;

// ─── Flagged keywords ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedKeyword {
  pub asin:     String,
  pub keyword:  String,
  pub rank:     usize,
  /// Human-readable reasons, most significant first.
  pub reasons:  Vec<String>,
  pub current:  Option<WeeklyMetric>,
  pub previous: Option<WeeklyMetric>,
}

fn reasons_for(ledger: &KeywordLedger, kw: &TrackedKeyword) -> Vec<String> {
  let week = ledger.last_recorded_week();
  let current = kw.week(week);
  let previous = week.checked_sub(1).and_then(|w| kw.week(w));
  let mut reasons = Vec::new();

  if let (Some(curr), Some(prev)) = (current, previous) {
    let prev_vol = prev.metrics.search_volume as f64;
    let curr_vol = curr.metrics.search_volume as f64;
    if prev_vol > 0.0 {
      let drop = (prev_vol - curr_vol) / prev_vol;
      if drop >= VOLUME_DROP_THRESHOLD {
        reasons.push(format!(
          "Volume -{}% ({} -> {})",
          (drop * 100.0).round(),
          prev.metrics.search_volume,
          curr.metrics.search_volume
        ));
      }
    }
    if curr.rank_status.tier() < prev.rank_status.tier() {
      reasons.push(format!("Rank: {} -> {}", prev.rank_status, curr.rank_status));
    }
  }

  for alert in ledger.alerts_for(kw.keyword()).filter(|a| a.week == week) {
    reasons.push(alert.kind.to_string());
  }
  reasons
}

/// Keywords of `ledger` whose latest week dropped volume by at least
/// [`VOLUME_DROP_THRESHOLD`], fell a rank tier, or lost a placement.
pub fn flag_keywords(ledger: &KeywordLedger) -> Vec<FlaggedKeyword> {
  let week = ledger.last_recorded_week();
  ledger
    .keywords()
    .iter()
    .filter_map(|kw| {
      let reasons = reasons_for(ledger, kw);
      (!reasons.is_empty()).then(|| FlaggedKeyword {
        asin: ledger.asin().to_owned(),
        keyword: kw.keyword().to_owned(),
        rank: kw.rank(),
        reasons,
        current: kw.week(week).copied(),
        previous: week.checked_sub(1).and_then(|w| kw.week(w)).copied(),
      })
    })
    .collect()
}

// ─── Price flags ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceFlag {
  pub asin:             String,
  pub keyword:          String,
  pub rank:             usize,
  pub impression_share: f64,
  pub benchmark:        PriceBenchmark,
}

/// Keywords whose latest week prices the product at least
/// `price_warning_percent` above the market. Critical flags come first,
/// then the widest gap.
pub fn price_flags(ledger: &KeywordLedger, t: &Thresholds) -> Vec<PriceFlag> {
  let mut flags: Vec<PriceFlag> = ledger
    .keywords()
    .iter()
    .filter_map(|kw| {
      let latest = kw.latest()?;
      let benchmark = classifier::benchmark_price(&latest.metrics, t)?;
      Some(PriceFlag {
        asin: ledger.asin().to_owned(),
        keyword: kw.keyword().to_owned(),
        rank: kw.rank(),
        impression_share: latest.metrics.impression_share,
        benchmark,
      })
    })
    .collect();
  sort_price_flags(&mut flags);
  flags
}

fn sort_price_flags(flags: &mut [PriceFlag]) {
  flags.sort_by(|a, b| {
    b.benchmark
      .severity
      .cmp(&a.benchmark.severity)
      .then(b.benchmark.diff_percent.total_cmp(&a.benchmark.diff_percent))
  });
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Health {
  AtRisk,
  Weak,
  Strong,
  Ok,
}

impl fmt::Display for Health {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::AtRisk => "AT RISK",
      Self::Weak => "WEAK",
      Self::Strong => "STRONG",
      Self::Ok => "OK",
    })
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankCounts {
  pub top_3:       usize,
  pub page_1_high: usize,
  pub page_1_low:  usize,
  pub invisible:   usize,
}

impl RankCounts {
  pub fn total(&self) -> usize {
    self.top_3 + self.page_1_high + self.page_1_low + self.invisible
  }
}

/// Latest-week keyword categories. Keywords with no recorded week count as
/// uncategorized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
  pub bread_butter:  usize,
  pub opportunity:   usize,
  pub leak:          usize,
  pub uncategorized: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
  pub asin:        String,
  /// Product name from the master list, when it has one.
  pub name:        Option<String>,
  pub week:        u8,
  pub counts:      RankCounts,
  pub categories:  CategoryCounts,
  pub price_flags: usize,
  pub top_alert:   Option<String>,
  pub health:      Health,
}

/// Summarise a ledger's latest week. `flagged` and `priced` should come from
/// [`flag_keywords`] and [`price_flags`] for the same ledger.
pub fn summarize(
  ledger: &KeywordLedger,
  name: Option<&str>,
  flagged: &[FlaggedKeyword],
  priced: &[PriceFlag],
) -> LedgerSummary {
  let mut counts = RankCounts::default();
  let mut categories = CategoryCounts::default();
  for kw in ledger.keywords() {
    let latest = kw.latest();
    match latest.map(|m| m.rank_status) {
      Some(RankStatus::Top3) => counts.top_3 += 1,
      Some(RankStatus::Page1High) => counts.page_1_high += 1,
      Some(RankStatus::Page1Low) => counts.page_1_low += 1,
      Some(RankStatus::Invisible) | None => counts.invisible += 1,
    }
    match latest.map(|m| m.category) {
      Some(KeywordCategory::BreadButter) => categories.bread_butter += 1,
      Some(KeywordCategory::Opportunity) => categories.opportunity += 1,
      Some(KeywordCategory::Leak) => categories.leak += 1,
      Some(KeywordCategory::Uncategorized) | None => categories.uncategorized += 1,
    }
  }

  let total = counts.total() as f64;
  let health = if !flagged.is_empty() {
    Health::AtRisk
  } else if total > 0.0 && counts.invisible as f64 / total > 0.5 {
    Health::Weak
  } else if total > 0.0 && (counts.top_3 + counts.page_1_high) as f64 / total > 0.5 {
    Health::Strong
  } else {
    Health::Ok
  };

  LedgerSummary {
    asin: ledger.asin().to_owned(),
    name: name.map(str::to_owned),
    week: ledger.last_recorded_week(),
    counts,
    categories,
    price_flags: priced.len(),
    top_alert: flagged.first().and_then(|f| f.reasons.first().cloned()),
    health,
  }
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
  pub summaries:   Vec<LedgerSummary>,
  pub flagged:     Vec<FlaggedKeyword>,
  pub price_flags: Vec<PriceFlag>,
}

/// Build the dashboard for `ledgers`. Product names are looked up in
/// `catalog` by ASIN, ignoring case.
pub fn build(ledgers: &[KeywordLedger], catalog: &[AsinEntry], t: &Thresholds) -> Dashboard {
  let mut dashboard = Dashboard::default();
  for ledger in ledgers {
    let name = catalog
      .iter()
      .find(|e| e.asin.eq_ignore_ascii_case(ledger.asin()))
      .and_then(|e| e.name.as_deref());
    let flagged = flag_keywords(ledger);
    let priced = price_flags(ledger, t);
    dashboard.summaries.push(summarize(ledger, name, &flagged, &priced));
    dashboard.flagged.extend(flagged);
    dashboard.price_flags.extend(priced);
  }
  sort_price_flags(&mut dashboard.price_flags);
  dashboard
}
