//! Tabular projection of a ledger: one row per locked keyword, six columns
//! per week of the quarter, and a trailing alert column.
//!
//! ```text
//! Rank | Keyword | In Title | In Backend | W01 Vol | W01 Imp% | ... | W13 Rank | Alert
//! ```
//!
//! Weeks not yet recorded render as empty cells so every row has the same
//! width regardless of how far the quarter has progressed.

use sqp_core::{
  calendar::{WEEKS_PER_QUARTER, week_label},
  ledger::{KeywordLedger, TrackedKeyword},
  metric::WeeklyMetric,
};

const WEEK_COLUMNS: [&str; 6] = ["Vol", "Imp%", "Clk%", "Pur%", "Opp", "Rank"];

pub fn headers() -> Vec<String> {
  let mut out: Vec<String> =
    ["Rank", "Keyword", "In Title", "In Backend"].map(str::to_owned).into();
  for week in 1..=WEEKS_PER_QUARTER {
    let label = week_label(week);
    out.extend(WEEK_COLUMNS.iter().map(|c| format!("{label} {c}")));
  }
  out.push("Alert".to_owned());
  out
}

fn yes_no(flag: bool) -> String { String::from(if flag { "YES" } else { "NO" }) }

fn week_cells(m: Option<&WeeklyMetric>) -> [String; 6] {
  match m {
    Some(m) => [
      m.metrics.search_volume.to_string(),
      format!("{:.2}", m.metrics.impression_share),
      format!("{:.2}", m.metrics.click_share),
      format!("{:.2}", m.metrics.purchase_share),
      format!("{:.1}", m.opportunity_score),
      m.rank_status.to_string(),
    ],
    None => Default::default(),
  }
}

fn row(ledger: &KeywordLedger, kw: &TrackedKeyword) -> Vec<String> {
  let mut out = vec![
    kw.rank().to_string(),
    kw.keyword().to_owned(),
    yes_no(kw.in_title()),
    yes_no(kw.in_backend()),
  ];
  for week in 1..=WEEKS_PER_QUARTER {
    out.extend(week_cells(kw.week(week)));
  }
  let alerts: Vec<String> = ledger
    .alerts_for(kw.keyword())
    .map(|a| format!("{} ({})", a.kind, week_label(a.week)))
    .collect();
  out.push(alerts.join(" | "));
  out
}

/// Header row followed by one row per keyword in rank order.
pub fn render(ledger: &KeywordLedger) -> Vec<Vec<String>> {
  std::iter::once(headers())
    .chain(ledger.keywords().iter().map(|kw| row(ledger, kw)))
    .collect()
}

/// [`render`] as tab-separated text. Tabs and newlines inside cells become
/// spaces.
pub fn to_tsv(ledger: &KeywordLedger) -> String {
  let mut out = String::new();
  for cells in render(ledger) {
    let line: Vec<String> = cells
      .iter()
      .map(|c| c.replace(['\t', '\n', '\r'], " "))
      .collect();
    out.push_str(&line.join("\t"));
    out.push('\n');
  }
  out
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use sqp_core::{calendar::Quarter, config::Thresholds, metric::KeywordMetrics};

  use super::*;

  fn ledger() -> KeywordLedger {
    let week: HashMap<String, KeywordMetrics> = [
      ("garlic press".to_owned(), KeywordMetrics::new(5000, 25.0, 4.0, 1.5)),
      ("garlic mincer".to_owned(), KeywordMetrics::new(800, 0.5, 0.0, 0.0)),
    ]
    .into();
    let mut l = KeywordLedger::new("B0SHEET", Quarter::new(2026, 4).unwrap(), None);
    l.lock_keywords(&week, 2).unwrap();
    l.append_week(1, &week, &Thresholds::default()).unwrap();
    l.append_week(2, &week, &Thresholds::default()).unwrap();
    l.record_placement("garlic press", true, true, 1).unwrap();
    l.record_placement("garlic press", false, true, 2).unwrap();
    l
  }

  #[test]
  fn header_layout() {
    let h = headers();
    assert_eq!(h.len(), 4 + 13 * 6 + 1);
    assert_eq!(&h[..6], ["Rank", "Keyword", "In Title", "In Backend", "W01 Vol", "W01 Imp%"]);
    assert_eq!(h[4 + 12 * 6 + 5], "W13 Rank");
    assert_eq!(h.last().unwrap(), "Alert");
  }

  #[test]
  fn rows_follow_rank_order() {
    let rows = render(&ledger());
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.len() == rows[0].len()));

    let press = &rows[1];
    assert_eq!(&press[..4], ["1", "garlic press", "NO", "YES"]);
    assert_eq!(&press[4..10], ["5000", "25.00", "4.00", "1.50", "8.0", "top_3"]);
    assert_eq!(press[16], "");
    assert_eq!(press.last().unwrap(), "DROPPED FROM TITLE (W02)");

    let mincer = &rows[2];
    assert_eq!(mincer[1], "garlic mincer");
    assert_eq!(mincer[9], "invisible");
    assert_eq!(mincer.last().unwrap(), "");
  }

  #[test]
  fn tsv_has_one_line_per_row() {
    let tsv = to_tsv(&ledger());
    assert_eq!(tsv.lines().count(), 3);
    assert!(tsv.lines().all(|l| l.split('\t').count() == 83));
  }
}
