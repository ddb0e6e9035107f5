//! Upstream collaborators the engine consumes: weekly report metrics, listing
//! content, and the master list of tracked products.
//!
//! Implementations own transport, authentication, polling and timeouts; the
//! engine treats every call as an opaque, possibly slow, await.

use std::{collections::HashMap, future::Future};

use serde::{Deserialize, Serialize};

use crate::{
  Result,
  calendar::{Quarter, WeekSpan},
  metric::KeywordMetrics,
};

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Supplies raw per-keyword metrics for one product and one complete week.
pub trait ReportSource: Send + Sync {
  /// Fails with [`crate::Error::ReportUnavailable`] if the week's report is not
  /// ready upstream.
  fn fetch_weekly_metrics<'a>(
    &'a self,
    asin: &'a str,
    quarter: Quarter,
    week: WeekSpan,
  ) -> impl Future<Output = Result<HashMap<String, KeywordMetrics>>> + Send + 'a;
}

// ─── Listings ────────────────────────────────────────────────────────────────

/// The searchable text of a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
  pub title:            String,
  #[serde(default)]
  pub backend_keywords: Vec<String>,
}

impl Listing {
  /// Whether `keyword` appears in the title and in the backend search terms,
  /// as a case-insensitive substring.
  pub fn placement(&self, keyword: &str) -> (bool, bool) {
    let needle = keyword.to_lowercase();
    let in_title = self.title.to_lowercase().contains(&needle);
    let in_backend = self.backend_keywords.join(" ").to_lowercase().contains(&needle);
    (in_title, in_backend)
  }
}

/// Supplies the current listing content for a SKU.
pub trait ListingSource: Send + Sync {
  /// Fails with [`crate::Error::ListingNotFound`] for an unknown SKU.
  fn fetch_placement<'a>(
    &'a self,
    sku: &'a str,
  ) -> impl Future<Output = Result<Listing>> + Send + 'a;
}

// ─── Master list ─────────────────────────────────────────────────────────────

/// One row of the master product list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsinEntry {
  pub asin:   String,
  #[serde(default)]
  pub sku:    Option<String>,
  #[serde(default)]
  pub name:   Option<String>,
  #[serde(default = "default_active")]
  pub active: bool,
}

fn default_active() -> bool { true }

/// Enumerates the products to drive batch operations.
pub trait MasterList: Send + Sync {
  fn active_asins(&self) -> impl Future<Output = Result<Vec<AsinEntry>>> + Send + '_;
}

/// A master list held in memory, e.g. loaded from a config file.
#[derive(Debug, Clone, Default)]
pub struct StaticMasterList(pub Vec<AsinEntry>);

impl MasterList for StaticMasterList {
  async fn active_asins(&self) -> Result<Vec<AsinEntry>> {
    Ok(self.0.iter().filter(|e| e.active).cloned().collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn placement_is_case_insensitive() {
    let listing = Listing {
      title:            "Stainless Garlic Press, Dishwasher Safe".into(),
      backend_keywords: vec!["garlic mincer".into(), "crusher tool".into()],
    };
    assert_eq!(listing.placement("garlic press"), (true, false));
    assert_eq!(listing.placement("Garlic Mincer"), (false, true));
    assert_eq!(listing.placement("mincer crusher"), (false, true));
    assert_eq!(listing.placement("peeler"), (false, false));
  }

  #[tokio::test]
  async fn static_list_skips_inactive() {
    let list: Vec<AsinEntry> = serde_json::from_value(serde_json::json!([
      { "asin": "B0A" },
      { "asin": "B0B", "sku": "SKU-B", "active": false },
    ]))
    .unwrap();
    let active = StaticMasterList(list).active_asins().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].asin, "B0A");
  }
}
