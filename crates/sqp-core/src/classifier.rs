//! Pure classification of a week's raw metrics.
//!
//! Every function here is total: every input yields exactly one result, and
//! the same input with the same [`Thresholds`] always yields the same result.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  config::Thresholds,
  metric::{Diagnostic, KeywordCategory, KeywordMetrics, RankStatus},
};

/// Tier an impression share. Lower bounds are inclusive, so a share equal to
/// a cut point lands in the higher tier.
pub fn classify_rank(impression_share: f64, t: &Thresholds) -> RankStatus {
  if impression_share >= t.rank_top_3 {
    RankStatus::Top3
  } else if impression_share >= t.rank_page_1_high {
    RankStatus::Page1High
  } else if impression_share >= t.rank_page_1_low {
    RankStatus::Page1Low
  } else {
    RankStatus::Invisible
  }
}

/// Pick the single diagnostic for a metric. First match wins, in the order
/// Ghost, Window Shopper, Price Problem, Healthy.
pub fn diagnose(m: &KeywordMetrics, t: &Thresholds) -> Diagnostic {
  if m.search_volume >= t.ghost_min_volume && m.impression_share <= t.ghost_max_imp_share {
    return Diagnostic::Ghost;
  }

  if m.impression_share >= t.window_shopper_min_imp_share
    && m.click_share <= t.window_shopper_max_click_share
  {
    return Diagnostic::WindowShopper;
  }

  if m.impression_share >= t.price_problem_min_imp_share
    && m.click_share > t.window_shopper_max_click_share
    && m.click_share > 0.0
    && m.purchase_share / m.click_share < t.price_problem_min_conversion
  {
    return Diagnostic::PriceProblem;
  }

  Diagnostic::Healthy
}

/// A diagnostic together with the opportunity score it produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opportunity {
  pub diagnostic: Diagnostic,
  /// In `[0, 100]`, rounded to one decimal place.
  pub score:      f64,
}

/// Score how much room a keyword has to improve.
///
/// The base grows with search volume (saturating at
/// `opportunity_volume_ceiling`) and shrinks with impression share; it is then
/// scaled by the diagnostic multiplier and reduced by the purchase share the
/// product already captures.
pub fn classify_opportunity(m: &KeywordMetrics, t: &Thresholds) -> Opportunity {
  let diagnostic = diagnose(m, t);

  let volume_factor = if t.opportunity_volume_ceiling > 0.0 {
    (m.search_volume as f64 / t.opportunity_volume_ceiling).min(1.0)
  } else {
    1.0
  };
  let visibility_factor =
    (1.0 - t.opportunity_visibility_weight * m.impression_share / 100.0).max(0.0);
  let base = t.opportunity_volume_weight * volume_factor * visibility_factor;

  let raw = base * diagnostic.multiplier() - t.opportunity_share_penalty * m.purchase_share;
  let score = if raw.is_finite() { (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0 } else { 0.0 };

  Opportunity { diagnostic, score }
}

// ─── Categories ──────────────────────────────────────────────────────────────

/// Bucket a keyword by its share profile. First match wins, in the order
/// Bread & Butter, Opportunity, Leak.
pub fn categorize(m: &KeywordMetrics, t: &Thresholds) -> KeywordCategory {
  if m.purchase_share >= t.bread_butter_min_purchase_share {
    return KeywordCategory::BreadButter;
  }

  if m.impression_share < t.opportunity_max_imp_share
    && m.purchase_share >= t.opportunity_min_purchase_share
  {
    return KeywordCategory::Opportunity;
  }

  if m.impression_share >= t.leak_min_imp_share
    && (m.click_share < t.leak_max_click_share || m.purchase_share < t.leak_max_purchase_share)
  {
    return KeywordCategory::Leak;
  }

  KeywordCategory::Uncategorized
}

/// What to do about a categorised keyword. A leak with few clicks points at
/// the listing's first impression; otherwise at what happens after the click.
pub fn recommended_action(
  category: KeywordCategory,
  m: &KeywordMetrics,
  t: &Thresholds,
) -> Option<&'static str> {
  match category {
    KeywordCategory::BreadButter => Some("Protect: maintain ranking and defend against competitors"),
    KeywordCategory::Opportunity => {
      Some("Increase PPC bids to gain visibility; high conversion potential")
    }
    KeywordCategory::Leak if m.click_share < t.leak_max_click_share => {
      Some("Fix: improve main image, title, or pricing to boost clicks")
    }
    KeywordCategory::Leak => Some("Fix: review listing content, A+ content, or price competitiveness"),
    KeywordCategory::Uncategorized => None,
  }
}

// ─── Price benchmark ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSeverity {
  Warning,
  Critical,
}

impl fmt::Display for PriceSeverity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Warning => "WARNING",
      Self::Critical => "CRITICAL",
    })
  }
}

/// How far a product's price sits above the market price for a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceBenchmark {
  pub asin_price:   f64,
  pub market_price: f64,
  /// `(asin - market) / market`, in percent, rounded to one decimal.
  pub diff_percent: f64,
  pub severity:     PriceSeverity,
}

/// Compare the product's price with the market price. `None` when either
/// price is missing, the market price is not positive, or the gap stays
/// below `price_warning_percent`.
pub fn benchmark_price(m: &KeywordMetrics, t: &Thresholds) -> Option<PriceBenchmark> {
  let (asin_price, market_price) = (m.asin_price?, m.market_price?);
  if market_price <= 0.0 {
    return None;
  }

  let diff = (asin_price - market_price) / market_price * 100.0;
  let severity = if diff >= t.price_critical_percent {
    PriceSeverity::Critical
  } else if diff >= t.price_warning_percent {
    PriceSeverity::Warning
  } else {
    return None;
  };

  Some(PriceBenchmark {
    asin_price,
    market_price,
    diff_percent: (diff * 10.0).round() / 10.0,
    severity,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn t() -> Thresholds { Thresholds::default() }

  fn m(vol: u64, imp: f64, clk: f64, pur: f64) -> KeywordMetrics {
    KeywordMetrics::new(vol, imp, clk, pur)
  }

  // ─── Rank ──────────────────────────────────────────────────────────────

  #[test]
  fn rank_boundaries_belong_to_higher_tier() {
    assert_eq!(classify_rank(20.0, &t()), RankStatus::Top3);
    assert_eq!(classify_rank(19.99, &t()), RankStatus::Page1High);
    assert_eq!(classify_rank(10.0, &t()), RankStatus::Page1High);
    assert_eq!(classify_rank(1.0, &t()), RankStatus::Page1Low);
    assert_eq!(classify_rank(0.99, &t()), RankStatus::Invisible);
    assert_eq!(classify_rank(0.0, &t()), RankStatus::Invisible);
  }

  #[test]
  fn rank_is_monotonic() {
    let shares: Vec<f64> = (0..=1000).map(|i| f64::from(i) / 10.0).collect();
    for pair in shares.windows(2) {
      let lo = classify_rank(pair[0], &t()).tier();
      let hi = classify_rank(pair[1], &t()).tier();
      assert!(hi >= lo, "{} -> {}", pair[0], pair[1]);
    }
  }

  #[test]
  fn rank_uses_configured_cut_points() {
    let custom = Thresholds { rank_top_3: 50.0, ..Thresholds::default() };
    assert_eq!(classify_rank(30.0, &custom), RankStatus::Page1High);
  }

  // ─── Diagnostics ───────────────────────────────────────────────────────

  #[test]
  fn ghost_needs_volume_and_no_visibility() {
    assert_eq!(diagnose(&m(1000, 0.5, 0.0, 0.0), &t()), Diagnostic::Ghost);
    assert_eq!(diagnose(&m(500, 1.0, 0.0, 0.0), &t()), Diagnostic::Ghost);
    assert_eq!(diagnose(&m(499, 0.0, 0.0, 0.0), &t()), Diagnostic::Healthy);
  }

  #[test]
  fn ghost_wins_over_every_other_signal() {
    // Loosen the window-shopper gate so it would also match.
    let loose = Thresholds { window_shopper_min_imp_share: 0.0, ..Thresholds::default() };
    assert_eq!(diagnose(&m(5000, 0.0, 0.0, 0.0), &loose), Diagnostic::Ghost);
  }

  #[test]
  fn window_shopper_seen_not_clicked() {
    assert_eq!(diagnose(&m(100, 12.0, 2.0, 0.0), &t()), Diagnostic::WindowShopper);
    assert_eq!(diagnose(&m(100, 4.9, 0.0, 0.0), &t()), Diagnostic::Healthy);
  }

  #[test]
  fn price_problem_clicked_not_bought() {
    assert_eq!(diagnose(&m(100, 12.0, 8.0, 1.0), &t()), Diagnostic::PriceProblem);
    // Conversion of exactly the floor is healthy.
    assert_eq!(diagnose(&m(100, 12.0, 8.0, 2.0), &t()), Diagnostic::Healthy);
  }

  #[test]
  fn price_problem_conversion_floor_is_configurable() {
    let strict = Thresholds { price_problem_min_conversion: 0.9, ..Thresholds::default() };
    assert_eq!(diagnose(&m(100, 12.0, 8.0, 2.0), &strict), Diagnostic::PriceProblem);
  }

  // ─── Opportunity ───────────────────────────────────────────────────────

  #[test]
  fn ghost_keyword_gets_double_multiplier() {
    let opp = classify_opportunity(&m(1000, 0.5, 0.0, 0.0), &t());
    assert_eq!(opp.diagnostic, Diagnostic::Ghost);
    assert_eq!(opp.diagnostic.multiplier(), 2.0);
    // 40 * 0.1 * (1 - 0.5 * 0.005) * 2.0 = 7.98
    assert_eq!(opp.score, 8.0);
  }

  #[test]
  fn score_is_always_in_range() {
    let extreme = Thresholds { opportunity_volume_weight: 1e6, ..Thresholds::default() };
    let inputs = [
      m(0, 0.0, 0.0, 0.0),
      m(u64::MAX, 0.0, 0.0, 0.0),
      m(10, 100.0, 100.0, 100.0),
      m(9000, 50.0, 1.0, 0.0),
    ];
    for input in inputs {
      for th in [t(), extreme.clone()] {
        let s = classify_opportunity(&input, &th).score;
        assert!((0.0..=100.0).contains(&s), "{input:?} -> {s}");
      }
    }
  }

  #[test]
  fn score_rises_with_volume_and_falls_with_visibility() {
    let low = classify_opportunity(&m(2000, 12.0, 2.0, 0.0), &t()).score;
    let high = classify_opportunity(&m(8000, 12.0, 2.0, 0.0), &t()).score;
    assert!(high > low);

    let seen = classify_opportunity(&m(8000, 90.0, 2.0, 0.0), &t()).score;
    let barely = classify_opportunity(&m(8000, 6.0, 2.0, 0.0), &t()).score;
    assert!(barely > seen);
  }

  #[test]
  fn classification_is_deterministic() {
    let input = m(3200, 7.5, 3.3, 0.4);
    assert_eq!(classify_opportunity(&input, &t()), classify_opportunity(&input, &t()));
  }

  // ─── Categories ────────────────────────────────────────────────────────

  #[test]
  fn bread_butter_wins_on_purchase_share() {
    assert_eq!(categorize(&m(100, 2.0, 1.0, 10.0), &t()), KeywordCategory::BreadButter);
    assert_eq!(categorize(&m(100, 40.0, 0.5, 25.0), &t()), KeywordCategory::BreadButter);
  }

  #[test]
  fn opportunity_is_unseen_but_converting() {
    assert_eq!(categorize(&m(100, 4.9, 3.0, 5.0), &t()), KeywordCategory::Opportunity);
    // At the impression cut point it is no longer "unseen".
    assert_ne!(categorize(&m(100, 5.0, 3.0, 5.0), &t()), KeywordCategory::Opportunity);
  }

  #[test]
  fn leak_is_seen_but_losing_clicks_or_purchases() {
    assert_eq!(categorize(&m(100, 8.0, 1.0, 3.0), &t()), KeywordCategory::Leak);
    assert_eq!(categorize(&m(100, 8.0, 4.0, 1.0), &t()), KeywordCategory::Leak);
    assert_eq!(categorize(&m(100, 8.0, 4.0, 3.0), &t()), KeywordCategory::Uncategorized);
    assert_eq!(categorize(&m(100, 1.0, 0.0, 0.0), &t()), KeywordCategory::Uncategorized);
  }

  #[test]
  fn leak_action_depends_on_clicks() {
    let low_clicks = m(100, 8.0, 1.0, 3.0);
    let low_sales = m(100, 8.0, 4.0, 1.0);
    let action = |x: &KeywordMetrics| recommended_action(categorize(x, &t()), x, &t());
    assert!(action(&low_clicks).unwrap().contains("boost clicks"));
    assert!(action(&low_sales).unwrap().contains("A+ content"));
    assert_eq!(action(&m(100, 8.0, 4.0, 3.0)), None);
  }

  // ─── Price benchmark ───────────────────────────────────────────────────

  fn priced(asin: Option<f64>, market: Option<f64>) -> KeywordMetrics {
    m(100, 8.0, 4.0, 1.0).with_prices(asin, market)
  }

  #[test]
  fn price_gap_severity() {
    let warn = benchmark_price(&priced(Some(23.0), Some(20.0)), &t()).unwrap();
    assert_eq!(warn.severity, PriceSeverity::Warning);
    assert_eq!(warn.diff_percent, 15.0);

    let crit = benchmark_price(&priced(Some(30.0), Some(24.0)), &t()).unwrap();
    assert_eq!(crit.severity, PriceSeverity::Critical);
    assert_eq!(crit.diff_percent, 25.0);

    assert_eq!(benchmark_price(&priced(Some(21.0), Some(20.0)), &t()), None);
    assert_eq!(benchmark_price(&priced(Some(15.0), Some(20.0)), &t()), None);
  }

  #[test]
  fn price_benchmark_needs_both_prices() {
    assert_eq!(benchmark_price(&priced(Some(30.0), None), &t()), None);
    assert_eq!(benchmark_price(&priced(None, Some(20.0)), &t()), None);
    assert_eq!(benchmark_price(&priced(Some(30.0), Some(0.0)), &t()), None);
  }
}
