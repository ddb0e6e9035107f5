//! Immutable tuning parameters handed to the classifier and the engine.
//!
//! Nothing in this crate reads ambient configuration; callers build these
//! values (usually by deserialising them) and pass them in at construction.

use serde::{Deserialize, Serialize};

/// Cut points for rank classification, keyword diagnostics, keyword
/// categories and price benchmarking, plus the parameters of the
/// opportunity-score base formula.
///
/// Every field has a default, so a partial table deserialises cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
  // ── Rank status (impression share, percent) ──────────────────────────
  pub rank_top_3:                      f64,
  pub rank_page_1_high:                f64,
  pub rank_page_1_low:                 f64,

  // ── Diagnostics ──────────────────────────────────────────────────────
  pub ghost_min_volume:                u64,
  pub ghost_max_imp_share:             f64,
  pub window_shopper_min_imp_share:    f64,
  pub window_shopper_max_click_share:  f64,
  pub price_problem_min_imp_share:     f64,
  /// Purchase share divided by click share below which a clicked keyword is
  /// considered to have a price problem.
  pub price_problem_min_conversion:    f64,

  // ── Opportunity base formula ─────────────────────────────────────────
  /// Search volume at which the volume component saturates.
  pub opportunity_volume_ceiling:      f64,
  /// Maximum points contributed by volume before the diagnostic multiplier.
  pub opportunity_volume_weight:       f64,
  /// Fraction of the base removed at 100% impression share.
  pub opportunity_visibility_weight:   f64,
  /// Points subtracted per point of purchase share already captured.
  pub opportunity_share_penalty:       f64,

  // ── Keyword categories (shares, percent) ─────────────────────────────
  pub bread_butter_min_purchase_share: f64,
  pub opportunity_max_imp_share:       f64,
  pub opportunity_min_purchase_share:  f64,
  pub leak_min_imp_share:              f64,
  pub leak_max_click_share:            f64,
  pub leak_max_purchase_share:         f64,

  // ── Price benchmark (percent above market price) ─────────────────────
  pub price_warning_percent:           f64,
  pub price_critical_percent:          f64,
}

impl Default for Thresholds {
  fn default() -> Self {
    Self {
      rank_top_3:                      20.0,
      rank_page_1_high:                10.0,
      rank_page_1_low:                 1.0,
      ghost_min_volume:                500,
      ghost_max_imp_share:             1.0,
      window_shopper_min_imp_share:    5.0,
      window_shopper_max_click_share:  2.0,
      price_problem_min_imp_share:     5.0,
      price_problem_min_conversion:    0.25,
      opportunity_volume_ceiling:      10_000.0,
      opportunity_volume_weight:       40.0,
      opportunity_visibility_weight:   0.5,
      opportunity_share_penalty:       0.5,
      bread_butter_min_purchase_share: 10.0,
      opportunity_max_imp_share:       5.0,
      opportunity_min_purchase_share:  5.0,
      leak_min_imp_share:              5.0,
      leak_max_click_share:            2.0,
      leak_max_purchase_share:         2.0,
      price_warning_percent:           10.0,
      price_critical_percent:          20.0,
    }
  }
}

/// Number of keywords locked per quarter when nothing else is configured.
pub const DEFAULT_TOP_KEYWORDS: usize = 10;

/// Settings for [`crate::engine::QuarterEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// How many keywords to lock at quarter start (the "N" of top-N).
  pub top_keywords: usize,
  pub thresholds:   Thresholds,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { top_keywords: DEFAULT_TOP_KEYWORDS, thresholds: Thresholds::default() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_table_keeps_remaining_defaults() {
    let cfg: EngineConfig = serde_json::from_value(serde_json::json!({
      "top_keywords": 5,
      "thresholds": { "ghost_min_volume": 900 }
    }))
    .unwrap();

    assert_eq!(cfg.top_keywords, 5);
    assert_eq!(cfg.thresholds.ghost_min_volume, 900);
    assert_eq!(cfg.thresholds.rank_top_3, 20.0);
    assert_eq!(cfg.thresholds.price_problem_min_conversion, 0.25);
    assert_eq!(cfg.thresholds.bread_butter_min_purchase_share, 10.0);
    assert_eq!(cfg.thresholds.price_critical_percent, 20.0);
  }
}
