//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::HashMap;

use sqp_core::{
  calendar::Quarter,
  config::Thresholds,
  ledger::{AlertKind, KeywordLedger},
  metric::{Diagnostic, KeywordCategory, KeywordMetrics, RankStatus},
  store::LedgerStore,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn q4() -> Quarter { Quarter::new(2026, 4).unwrap() }

fn week(rows: &[(&str, u64, f64, f64, f64)]) -> HashMap<String, KeywordMetrics> {
  rows
    .iter()
    .map(|(k, v, i, c, p)| ((*k).to_owned(), KeywordMetrics::new(*v, *i, *c, *p)))
    .collect()
}

const ROWS: [(&str, u64, f64, f64, f64); 3] = [
  ("garlic press", 5000, 25.0, 4.0, 1.5),
  ("garlic mincer", 800, 0.5, 0.0, 0.0),
  ("garlic crusher", 300, 8.0, 1.0, 0.0),
];

fn ledger(asin: &str, weeks: u8) -> KeywordLedger {
  let t = Thresholds::default();
  let mut l = KeywordLedger::new(asin, q4(), Some(format!("SKU-{asin}")));
  l.lock_keywords(&week(&ROWS), 3).unwrap();
  for w in 1..=weeks {
    l.append_week(w, &week(&ROWS), &t).unwrap();
  }
  l
}

// ─── Load / save ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn load_missing_returns_none() {
  let s = store().await;
  assert!(s.load_ledger("B0NONE", q4()).await.unwrap().is_none());
}

#[tokio::test]
async fn save_and_load_roundtrip() {
  let s = store().await;
  let mut l = ledger("B0A", 2);
  l.record_placement("garlic press", true, true, 1).unwrap();
  l.record_placement("garlic press", false, true, 2).unwrap();

  s.save_ledger(&l).await.unwrap();
  let loaded = s.load_ledger("B0A", q4()).await.unwrap().unwrap();
  assert_eq!(loaded, l);

  let press = loaded.keyword("garlic press").unwrap();
  assert_eq!(press.rank(), 1);
  assert!(!press.in_title() && press.in_backend());
  assert_eq!(press.week(2).unwrap().rank_status, RankStatus::Top3);
  let mincer = loaded.keyword("garlic mincer").unwrap();
  assert_eq!(mincer.week(1).unwrap().diagnostic, Diagnostic::Ghost);
  assert_eq!(loaded.alerts().len(), 1);
  assert_eq!(loaded.alerts()[0].kind, AlertKind::DroppedFromTitle);
}

#[tokio::test]
async fn prices_and_categories_survive_a_roundtrip() {
  let s = store().await;
  let t = Thresholds::default();
  let mut rows = week(&ROWS);
  if let Some(m) = rows.get_mut("garlic press") {
    *m = m.with_prices(Some(29.99), Some(24.5));
  }
  let mut l = KeywordLedger::new("B0P", q4(), None);
  l.lock_keywords(&rows, 3).unwrap();
  l.append_week(1, &rows, &t).unwrap();

  s.save_ledger(&l).await.unwrap();
  let loaded = s.load_ledger("B0P", q4()).await.unwrap().unwrap();
  assert_eq!(loaded, l);

  let press = loaded.keyword("garlic press").unwrap().week(1).unwrap();
  assert_eq!(press.metrics.asin_price, Some(29.99));
  assert_eq!(press.metrics.market_price, Some(24.5));
  let crusher = loaded.keyword("garlic crusher").unwrap().week(1).unwrap();
  assert_eq!(crusher.category, KeywordCategory::Leak);
  assert_eq!(crusher.metrics.asin_price, None);
}

#[tokio::test]
async fn quarters_are_stored_separately() {
  let s = store().await;
  s.save_ledger(&ledger("B0A", 1)).await.unwrap();
  let q3 = Quarter::new(2026, 3).unwrap();
  assert!(s.load_ledger("B0A", q3).await.unwrap().is_none());
}

#[tokio::test]
async fn later_saves_append_weeks_and_alerts() {
  let s = store().await;
  let t = Thresholds::default();
  let mut l = ledger("B0A", 1);
  l.record_placement("garlic mincer", true, false, 1).unwrap();
  s.save_ledger(&l).await.unwrap();

  l.append_week(2, &week(&ROWS), &t).unwrap();
  l.record_placement("garlic mincer", false, false, 2).unwrap();
  s.save_ledger(&l).await.unwrap();

  l.append_week(3, &week(&ROWS), &t).unwrap();
  l.record_placement("garlic mincer", true, false, 3).unwrap();
  s.save_ledger(&l).await.unwrap();

  let loaded = s.load_ledger("B0A", q4()).await.unwrap().unwrap();
  assert_eq!(loaded.last_recorded_week(), 3);
  assert!(loaded.keywords().iter().all(|k| k.history().len() == 3));
  assert_eq!(loaded.alerts().len(), 1);
  assert_eq!(loaded.alerts()[0].week, 2);
  assert!(loaded.keyword("garlic mincer").unwrap().in_title());
  assert_eq!(loaded, l);
}

#[tokio::test]
async fn saving_the_same_ledger_twice_is_harmless() {
  let s = store().await;
  let l = ledger("B0A", 2);
  s.save_ledger(&l).await.unwrap();
  s.save_ledger(&l).await.unwrap();
  assert_eq!(s.load_ledger("B0A", q4()).await.unwrap().unwrap(), l);
}

#[tokio::test]
async fn zero_keyword_ledger_keeps_its_week_cursor() {
  let s = store().await;
  let t = Thresholds::default();
  let mut l = KeywordLedger::new("B0EMPTY", q4(), None);
  l.lock_keywords(&HashMap::new(), 0).unwrap();
  l.append_week(1, &HashMap::new(), &t).unwrap();
  s.save_ledger(&l).await.unwrap();

  let loaded = s.load_ledger("B0EMPTY", q4()).await.unwrap().unwrap();
  assert_eq!(loaded.last_recorded_week(), 1);
  assert!(loaded.keywords().is_empty());
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_ledgers_for_quarter_ordered_by_asin() {
  let s = store().await;
  s.save_ledger(&ledger("B0C", 1)).await.unwrap();
  s.save_ledger(&ledger("B0A", 2)).await.unwrap();
  let mut other = KeywordLedger::new("B0B", Quarter::new(2027, 1).unwrap(), None);
  other.lock_keywords(&week(&ROWS), 1).unwrap();
  s.save_ledger(&other).await.unwrap();

  let listed = s.list_ledgers(q4()).await.unwrap();
  let asins: Vec<_> = listed.iter().map(|l| l.asin()).collect();
  assert_eq!(asins, vec!["B0A", "B0C"]);
  assert_eq!(listed[0].last_recorded_week(), 2);
}

// ─── Corruption ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn gapped_history_is_reported_as_corrupt() {
  let s = store().await;
  s.save_ledger(&ledger("B0A", 2)).await.unwrap();

  s.conn
    .call(|conn| {
      conn.execute("DELETE FROM weekly_metrics WHERE week = 1 AND rank = 2", [])?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.load_ledger("B0A", q4()).await.unwrap_err();
  assert!(matches!(err, crate::Error::Core(sqp_core::Error::Corrupt(_))));
}

#[tokio::test]
async fn unknown_category_is_a_decode_error() {
  let s = store().await;
  s.save_ledger(&ledger("B0A", 1)).await.unwrap();

  s.conn
    .call(|conn| {
      conn.execute("UPDATE weekly_metrics SET category = 'mystery' WHERE rank = 1", [])?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.load_ledger("B0A", q4()).await.unwrap_err();
  assert!(matches!(err, crate::Error::Decode(_)));
}
