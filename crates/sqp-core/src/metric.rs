//! Weekly metric types: the raw numbers reported upstream and the derived
//! classification attached to them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{classifier, config::Thresholds};

// ─── Raw metrics ─────────────────────────────────────────────────────────────

/// Raw per-keyword numbers for one reporting week. Shares are percentages.
///
/// Prices are optional: the report carries them only for some queries.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KeywordMetrics {
  pub search_volume:    u64,
  pub impression_share: f64,
  pub click_share:      f64,
  pub purchase_share:   f64,
  /// Median price of this product among the query's purchases.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub asin_price:       Option<f64>,
  /// Median price across all purchases for the query.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub market_price:     Option<f64>,
}

impl KeywordMetrics {
  pub fn new(
    search_volume: u64,
    impression_share: f64,
    click_share: f64,
    purchase_share: f64,
  ) -> Self {
    Self {
      search_volume,
      impression_share,
      click_share,
      purchase_share,
      asin_price: None,
      market_price: None,
    }
  }

  pub fn with_prices(self, asin_price: Option<f64>, market_price: Option<f64>) -> Self {
    Self { asin_price, market_price, ..self }
  }

  /// Shares clamped into `[0, 100]`, with non-finite values read as zero.
  /// Prices that are negative or non-finite are dropped.
  pub fn sanitized(self) -> Self {
    fn share(v: f64) -> f64 {
      if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 }
    }
    fn price(v: Option<f64>) -> Option<f64> {
      v.filter(|p| p.is_finite() && *p >= 0.0)
    }
    Self {
      search_volume:    self.search_volume,
      impression_share: share(self.impression_share),
      click_share:      share(self.click_share),
      purchase_share:   share(self.purchase_share),
      asin_price:       price(self.asin_price),
      market_price:     price(self.market_price),
    }
  }
}

// ─── Rank status ─────────────────────────────────────────────────────────────

/// Estimated search-results position, tiered by impression share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankStatus {
  #[serde(rename = "top_3")]
  Top3,
  #[serde(rename = "page_1_high")]
  Page1High,
  #[serde(rename = "page_1_low")]
  Page1Low,
  #[serde(rename = "invisible")]
  Invisible,
}

impl RankStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Top3 => "top_3",
      Self::Page1High => "page_1_high",
      Self::Page1Low => "page_1_low",
      Self::Invisible => "invisible",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "top_3" => Some(Self::Top3),
      "page_1_high" => Some(Self::Page1High),
      "page_1_low" => Some(Self::Page1Low),
      "invisible" => Some(Self::Invisible),
      _ => None,
    }
  }

  /// Higher is more visible. Used to detect downgrades between weeks.
  pub fn tier(&self) -> u8 {
    match self {
      Self::Top3 => 3,
      Self::Page1High => 2,
      Self::Page1Low => 1,
      Self::Invisible => 0,
    }
  }
}

impl fmt::Display for RankStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Diagnostic ──────────────────────────────────────────────────────────────

/// Where in the search funnel a keyword is losing the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnostic {
  /// Real demand, no visibility.
  Ghost,
  /// Seen but not clicked.
  WindowShopper,
  /// Clicked but not bought.
  PriceProblem,
  Healthy,
}

impl Diagnostic {
  pub fn multiplier(&self) -> f64 {
    match self {
      Self::Ghost => 2.0,
      Self::WindowShopper => 1.5,
      Self::PriceProblem => 1.3,
      Self::Healthy => 0.5,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Ghost => "ghost",
      Self::WindowShopper => "window_shopper",
      Self::PriceProblem => "price_problem",
      Self::Healthy => "healthy",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "ghost" => Some(Self::Ghost),
      "window_shopper" => Some(Self::WindowShopper),
      "price_problem" => Some(Self::PriceProblem),
      "healthy" => Some(Self::Healthy),
      _ => None,
    }
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Keyword category ────────────────────────────────────────────────────────

/// Strategic bucket a keyword falls into from its share profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
  /// Already converting a large share of the query's purchases.
  BreadButter,
  /// Converts well but is barely seen.
  Opportunity,
  /// Seen, but clicks or purchases leak to competitors.
  Leak,
  Uncategorized,
}

impl KeywordCategory {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::BreadButter => "bread_butter",
      Self::Opportunity => "opportunity",
      Self::Leak => "leak",
      Self::Uncategorized => "uncategorized",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "bread_butter" => Some(Self::BreadButter),
      "opportunity" => Some(Self::Opportunity),
      "leak" => Some(Self::Leak),
      "uncategorized" => Some(Self::Uncategorized),
      _ => None,
    }
  }
}

impl fmt::Display for KeywordCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── WeeklyMetric ────────────────────────────────────────────────────────────

/// One keyword's entry for one recorded week. Computed once at append time
/// and never recalculated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyMetric {
  pub week:              u8,
  pub metrics:           KeywordMetrics,
  pub rank_status:       RankStatus,
  pub diagnostic:        Diagnostic,
  pub opportunity_score: f64,
  pub category:          KeywordCategory,
}

impl WeeklyMetric {
  pub fn compute(week: u8, metrics: KeywordMetrics, thresholds: &Thresholds) -> Self {
    let metrics = metrics.sanitized();
    let opportunity = classifier::classify_opportunity(&metrics, thresholds);
    Self {
      week,
      metrics,
      rank_status: classifier::classify_rank(metrics.impression_share, thresholds),
      diagnostic: opportunity.diagnostic,
      opportunity_score: opportunity.score,
      category: classifier::categorize(&metrics, thresholds),
    }
  }
}
