//! Report sources selectable from configuration: the HTTP report service or
//! a directory of seller-console CSV exports.

use std::{collections::HashMap, io, path::PathBuf};

use sqp_core::{
  Error,
  calendar::{Quarter, WeekSpan},
  metric::KeywordMetrics,
  report::parse_report_csv,
  source::ReportSource,
};
use tracing::debug;

use crate::client::HttpReportSource;

// ─── CSV exports ─────────────────────────────────────────────────────────────

/// Reads `{dir}/{ASIN}_{YYYY-MM-DD}.csv`, dated by the week's Sunday.
///
/// A missing file means the export for that week has not been dropped in yet.
pub struct CsvReportSource {
  dir: PathBuf,
}

impl CsvReportSource {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  fn path_for(&self, asin: &str, week: &WeekSpan) -> PathBuf {
    self.dir.join(format!("{asin}_{}.csv", week.start))
  }
}

impl ReportSource for CsvReportSource {
  async fn fetch_weekly_metrics(
    &self,
    asin: &str,
    _quarter: Quarter,
    week: WeekSpan,
  ) -> sqp_core::Result<HashMap<String, KeywordMetrics>> {
    let path = self.path_for(asin, &week);
    let body = match tokio::fs::read_to_string(&path).await {
      Ok(body) => body,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no export for week");
        return Err(Error::ReportUnavailable { asin: asin.to_owned(), week: week.index });
      }
      Err(e) => return Err(Error::Transport(Box::new(e))),
    };
    parse_report_csv(&body)
  }
}

// ─── Selection ───────────────────────────────────────────────────────────────

pub enum Reports {
  Http(HttpReportSource),
  Csv(CsvReportSource),
}

impl ReportSource for Reports {
  async fn fetch_weekly_metrics(
    &self,
    asin: &str,
    quarter: Quarter,
    week: WeekSpan,
  ) -> sqp_core::Result<HashMap<String, KeywordMetrics>> {
    match self {
      Self::Http(source) => source.fetch_weekly_metrics(asin, quarter, week).await,
      Self::Csv(source) => source.fetch_weekly_metrics(asin, quarter, week).await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn q4_week(index: u8) -> (Quarter, WeekSpan) {
    let q = Quarter::new(2026, 4).unwrap();
    (q, q.week(index).unwrap())
  }

  #[tokio::test]
  async fn reads_the_export_dated_by_week_start() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join("B0A_2026-10-04.csv"),
      "Search Query,Search Query Volume\ngarlic press,5000\n",
    )
    .unwrap();

    let (q, w1) = q4_week(1);
    let source = Reports::Csv(CsvReportSource::new(dir.path()));
    let metrics = source.fetch_weekly_metrics("B0A", q, w1).await.unwrap();
    assert_eq!(metrics["garlic press"].search_volume, 5000);
  }

  #[tokio::test]
  async fn missing_export_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let (q, w2) = q4_week(2);
    let source = CsvReportSource::new(dir.path());
    let err = source.fetch_weekly_metrics("B0A", q, w2).await.unwrap_err();
    assert!(matches!(err, Error::ReportUnavailable { week: 2, .. }));
  }
}
