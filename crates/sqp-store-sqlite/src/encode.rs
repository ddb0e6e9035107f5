//! Row types shared between the store's queries and the domain ledger.
//!
//! Enum columns hold the lowercase names the domain types expose through
//! `as_str`. Integers wider than SQLite's signed 64-bit range are rejected on
//! the way in rather than wrapped.

use std::collections::HashMap;

use sqp_core::{
  calendar::Quarter,
  ledger::{Alert, AlertKind, KeywordLedger, TrackedKeyword},
  metric::{Diagnostic, KeywordCategory, KeywordMetrics, RankStatus, WeeklyMetric},
};

use crate::{Error, Result};

// ─── Raw rows ────────────────────────────────────────────────────────────────

pub struct RawLedger {
  pub asin:      String,
  pub year:      i32,
  pub quarter:   u8,
  pub sku:       Option<String>,
  pub last_week: u8,
}

pub struct RawKeyword {
  pub rank:       i64,
  pub keyword:    String,
  pub in_title:   bool,
  pub in_backend: bool,
}

pub struct RawMetric {
  pub rank:              i64,
  pub week:              u8,
  pub search_volume:     i64,
  pub impression_share:  f64,
  pub click_share:       f64,
  pub purchase_share:    f64,
  pub rank_status:       String,
  pub diagnostic:        String,
  pub opportunity_score: f64,
  pub category:          String,
  pub asin_price:        Option<f64>,
  pub market_price:      Option<f64>,
}

pub struct RawAlert {
  pub seq:     i64,
  pub keyword: String,
  pub kind:    String,
  pub week:    u8,
}

/// Every row belonging to one ledger.
pub struct LedgerRows {
  pub ledger:   RawLedger,
  pub keywords: Vec<RawKeyword>,
  pub metrics:  Vec<RawMetric>,
  pub alerts:   Vec<RawAlert>,
}

fn to_i64(n: impl TryInto<i64>, what: &str) -> Result<i64> {
  n.try_into().map_err(|_| Error::Decode(format!("{what} out of range")))
}

// ─── Encode ──────────────────────────────────────────────────────────────────

impl LedgerRows {
  pub fn from_ledger(ledger: &KeywordLedger) -> Result<Self> {
    let mut keywords = Vec::with_capacity(ledger.keywords().len());
    let mut metrics = Vec::new();

    for kw in ledger.keywords() {
      let rank = to_i64(kw.rank(), "rank")?;
      keywords.push(RawKeyword {
        rank,
        keyword: kw.keyword().to_owned(),
        in_title: kw.in_title(),
        in_backend: kw.in_backend(),
      });
      for m in kw.history() {
        metrics.push(RawMetric {
          rank,
          week: m.week,
          search_volume: to_i64(m.metrics.search_volume, "search volume")?,
          impression_share: m.metrics.impression_share,
          click_share: m.metrics.click_share,
          purchase_share: m.metrics.purchase_share,
          rank_status: m.rank_status.as_str().to_owned(),
          diagnostic: m.diagnostic.as_str().to_owned(),
          opportunity_score: m.opportunity_score,
          category: m.category.as_str().to_owned(),
          asin_price: m.metrics.asin_price,
          market_price: m.metrics.market_price,
        });
      }
    }

    let alerts = ledger
      .alerts()
      .iter()
      .enumerate()
      .map(|(seq, a)| {
        Ok(RawAlert {
          seq:     to_i64(seq, "alert sequence")?,
          keyword: a.keyword.clone(),
          kind:    a.kind.as_str().to_owned(),
          week:    a.week,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      ledger: RawLedger {
        asin:      ledger.asin().to_owned(),
        year:      ledger.quarter().year(),
        quarter:   ledger.quarter().number(),
        sku:       ledger.sku().map(str::to_owned),
        last_week: ledger.last_recorded_week(),
      },
      keywords,
      metrics,
      alerts,
    })
  }

  // ─── Decode ────────────────────────────────────────────────────────────────

  /// Rebuild the domain ledger. Metrics must arrive ordered by week within
  /// each rank.
  pub fn into_ledger(self) -> Result<KeywordLedger> {
    let quarter = Quarter::new(self.ledger.year, self.ledger.quarter)?;

    let mut histories: HashMap<i64, Vec<WeeklyMetric>> = HashMap::new();
    for raw in self.metrics {
      let rank = raw.rank;
      histories.entry(rank).or_default().push(raw.into_metric()?);
    }

    let keywords = self
      .keywords
      .into_iter()
      .map(|raw| {
        let rank = usize::try_from(raw.rank)
          .map_err(|_| Error::Decode(format!("negative rank {}", raw.rank)))?;
        let history = histories.remove(&raw.rank).unwrap_or_default();
        Ok(TrackedKeyword::restore(rank, raw.keyword, raw.in_title, raw.in_backend, history))
      })
      .collect::<Result<Vec<_>>>()?;

    if let Some(rank) = histories.keys().next() {
      return Err(Error::Decode(format!("metrics stored for unknown rank {rank}")));
    }

    let alerts = self
      .alerts
      .into_iter()
      .map(RawAlert::into_alert)
      .collect::<Result<Vec<_>>>()?;

    Ok(KeywordLedger::restore(
      self.ledger.asin,
      quarter,
      self.ledger.sku,
      self.ledger.last_week,
      keywords,
      alerts,
    )?)
  }
}

impl RawMetric {
  fn into_metric(self) -> Result<WeeklyMetric> {
    let search_volume = u64::try_from(self.search_volume)
      .map_err(|_| Error::Decode(format!("negative search volume {}", self.search_volume)))?;
    Ok(WeeklyMetric {
      week:              self.week,
      metrics:           KeywordMetrics::new(
        search_volume,
        self.impression_share,
        self.click_share,
        self.purchase_share,
      )
      .with_prices(self.asin_price, self.market_price),
      rank_status:       RankStatus::parse(&self.rank_status)
        .ok_or_else(|| Error::Decode(format!("unknown rank status: {:?}", self.rank_status)))?,
      diagnostic:        Diagnostic::parse(&self.diagnostic)
        .ok_or_else(|| Error::Decode(format!("unknown diagnostic: {:?}", self.diagnostic)))?,
      opportunity_score: self.opportunity_score,
      category:          KeywordCategory::parse(&self.category)
        .ok_or_else(|| Error::Decode(format!("unknown category: {:?}", self.category)))?,
    })
  }
}

impl RawAlert {
  fn into_alert(self) -> Result<Alert> {
    let kind = AlertKind::parse(&self.kind)
      .ok_or_else(|| Error::Decode(format!("unknown alert kind: {:?}", self.kind)))?;
    Ok(Alert { keyword: self.keyword, kind, week: self.week })
  }
}
