//! Decoding of Search Query Performance reports.
//!
//! Two encodings are understood. The upstream JSON document lists one entry
//! per (ASIN, search query) with nested volume, impression, click and
//! purchase blocks, plus an optional pricing block. The CSV export downloaded
//! from the seller console has one row per query for a single ASIN. Only the
//! fields the tracker needs are read; absent shares count as zero, absent
//! prices stay absent.

use std::collections::HashMap;

use serde::Deserialize;

use crate::{Error, Result, metric::KeywordMetrics};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportDocument {
  #[serde(default)]
  data_by_asin:  Vec<ReportEntry>,
  #[serde(default)]
  error_details: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ReportEntry {
  asin:              Option<String>,
  search_query_data: SearchQueryData,
  impression_data:   ShareData,
  click_data:        ClickData,
  purchase_data:     PurchaseData,
  pricing:           Pricing,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchQueryData {
  search_query:        Option<String>,
  search_query_volume: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ShareData {
  asin_impression_share: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ClickData {
  asin_click_share: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PurchaseData {
  asin_purchase_share: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Pricing {
  asin_price:   Option<f64>,
  market_price: Option<f64>,
}

/// Decode a report document into per-keyword metrics for `asin`.
///
/// Entries for other ASINs and entries without a query are skipped; when a
/// query appears twice the first row is kept. A document carrying
/// `errorDetails` means the report could not be produced for that week.
pub fn parse_report(asin: &str, week: u8, body: &str) -> Result<HashMap<String, KeywordMetrics>> {
  let doc: ReportDocument = serde_json::from_str(body)?;

  if doc.error_details.is_some() {
    return Err(Error::ReportUnavailable { asin: asin.to_owned(), week });
  }

  let mut out = HashMap::new();
  for entry in doc.data_by_asin {
    if entry.asin.as_deref().is_some_and(|a| !a.eq_ignore_ascii_case(asin)) {
      continue;
    }
    let Some(query) = entry.search_query_data.search_query.filter(|q| !q.trim().is_empty())
    else {
      continue;
    };
    let metrics = KeywordMetrics::new(
      entry.search_query_data.search_query_volume.unwrap_or(0),
      entry.impression_data.asin_impression_share.unwrap_or(0.0),
      entry.click_data.asin_click_share.unwrap_or(0.0),
      entry.purchase_data.asin_purchase_share.unwrap_or(0.0),
    )
    .with_prices(entry.pricing.asin_price, entry.pricing.market_price)
    .sanitized();
    out.entry(query).or_insert(metrics);
  }
  Ok(out)
}

// ─── CSV export ──────────────────────────────────────────────────────────────

/// Accepted header spellings per field, lowercased. The first matching
/// column wins when an export carries several.
const QUERY_HEADERS: &[&str] = &["search query", "searchquery", "query", "keyword"];
const VOLUME_HEADERS: &[&str] =
  &["search query volume", "search volume", "searchvolume", "volume", "sfr"];
const IMPRESSION_HEADERS: &[&str] = &[
  "impressions: asin share %",
  "impressions - brand share",
  "impression share",
  "imp share",
];
const CLICK_HEADERS: &[&str] =
  &["clicks: asin share %", "clicks - brand share", "click share"];
const PURCHASE_HEADERS: &[&str] =
  &["purchases: asin share %", "purchases - brand share", "purchase share"];
const ASIN_PRICE_HEADERS: &[&str] = &[
  "purchases: asin price (median)",
  "clicks: asin price (median)",
  "your price",
  "asin price",
];
const MARKET_PRICE_HEADERS: &[&str] = &[
  "purchases: price (median)",
  "clicks: price (median)",
  "market price",
  "median price",
];

#[derive(Debug)]
struct CsvColumns {
  query:        usize,
  volume:       Option<usize>,
  impression:   Option<usize>,
  click:        Option<usize>,
  purchase:     Option<usize>,
  asin_price:   Option<usize>,
  market_price: Option<usize>,
}

impl CsvColumns {
  fn locate(headers: &csv::StringRecord) -> Result<Self> {
    let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let find = |accepted: &[&str]| names.iter().position(|n| accepted.contains(&n.as_str()));
    Ok(Self {
      query:        find(QUERY_HEADERS)
        .ok_or_else(|| Error::MalformedReport("no search query column".to_owned()))?,
      volume:       find(VOLUME_HEADERS),
      impression:   find(IMPRESSION_HEADERS),
      click:        find(CLICK_HEADERS),
      purchase:     find(PURCHASE_HEADERS),
      asin_price:   find(ASIN_PRICE_HEADERS),
      market_price: find(MARKET_PRICE_HEADERS),
    })
  }
}

/// A cell as a number, ignoring thousands separators, `%` and `$`. Empty or
/// unparseable cells are `None`.
fn number(record: &csv::StringRecord, column: Option<usize>) -> Option<f64> {
  let cell = record.get(column?)?;
  let cleaned: String = cell.chars().filter(|c| !matches!(c, ',' | '%' | '$')).collect();
  cleaned.trim().parse().ok()
}

/// The seller-console export opens with a metadata line such as
/// `ASIN or Product=["B0..."],Reporting Range=["Weekly"],...` before the
/// header row.
fn is_metadata_line(line: &str) -> bool {
  line.starts_with("ASIN") || line.contains("Reporting Range")
}

/// Decode a CSV export into per-keyword metrics. Rows without a query are
/// skipped and a repeated query keeps its first row, as in [`parse_report`].
pub fn parse_report_csv(body: &str) -> Result<HashMap<String, KeywordMetrics>> {
  let body = body.trim_start_matches('\u{feff}');
  let body = match body.split_once('\n') {
    Some((first, rest)) if is_metadata_line(first) => rest,
    _ => body,
  };

  let malformed = |e: csv::Error| Error::MalformedReport(e.to_string());
  let mut rdr = csv::ReaderBuilder::new()
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(body.as_bytes());
  let columns = CsvColumns::locate(rdr.headers().map_err(malformed)?)?;

  let mut out = HashMap::new();
  for record in rdr.records() {
    let record = record.map_err(malformed)?;
    let Some(query) = record.get(columns.query).filter(|q| !q.is_empty()) else {
      continue;
    };
    let volume = number(&record, columns.volume).filter(|v| *v > 0.0).unwrap_or(0.0);
    let metrics = KeywordMetrics::new(
      volume as u64,
      number(&record, columns.impression).unwrap_or(0.0),
      number(&record, columns.click).unwrap_or(0.0),
      number(&record, columns.purchase).unwrap_or(0.0),
    )
    .with_prices(number(&record, columns.asin_price), number(&record, columns.market_price))
    .sanitized();
    out.entry(query.to_owned()).or_insert(metrics);
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  const DOC: &str = r#"{
    "reportSpecification": { "dataStartTime": "2026-10-04" },
    "dataByAsin": [
      {
        "asin": "B0ASIN0001",
        "searchQueryData": { "searchQuery": "garlic press", "searchQueryVolume": 5000 },
        "impressionData": { "asinImpressionShare": 10.5 },
        "clickData": { "asinClickShare": 2.5 },
        "purchaseData": { "asinPurchaseShare": 0.1 },
        "pricing": { "asinPrice": 29.99, "marketPrice": 24.5 }
      },
      {
        "asin": "B0ASIN0001",
        "searchQueryData": { "searchQuery": "garlic press", "searchQueryVolume": 1 }
      },
      {
        "asin": "B0ASIN0001",
        "searchQueryData": { "searchQuery": "garlic mincer", "searchQueryVolume": null },
        "clickData": { "asinClickShare": null }
      },
      {
        "asin": "B0OTHER",
        "searchQueryData": { "searchQuery": "peeler", "searchQueryVolume": 10 }
      },
      { "asin": "B0ASIN0001", "searchQueryData": { "searchQuery": "  " } }
    ]
  }"#;

  #[test]
  fn parses_entries_for_asin() {
    let parsed = parse_report("B0ASIN0001", 1, DOC).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(
      parsed["garlic press"],
      KeywordMetrics::new(5000, 10.5, 2.5, 0.1).with_prices(Some(29.99), Some(24.5))
    );
    assert_eq!(parsed["garlic mincer"], KeywordMetrics::default());
    assert_eq!(parsed["garlic mincer"].market_price, None);
    assert!(!parsed.contains_key("peeler"));
  }

  #[test]
  fn error_details_mean_unavailable() {
    let err = parse_report("B0X", 4, r#"{"errorDetails": "No data for period"}"#).unwrap_err();
    assert!(matches!(err, Error::ReportUnavailable { week: 4, .. }));
  }

  #[test]
  fn malformed_json_is_a_serialization_error() {
    let err = parse_report("B0X", 1, "{not json").unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
  }

  // ─── CSV ───────────────────────────────────────────────────────────────

  const EXPORT: &str = "\u{feff}ASIN or Product=[\"B0ASIN0001\"],Reporting Range=[\"Weekly\"]
Search Query,Search Query Score,Search Query Volume,Impressions: ASIN Share %,Clicks: ASIN Share %,Clicks: ASIN Price (Median),Purchases: ASIN Share %,Purchases: Price (Median),Purchases: ASIN Price (Median)
garlic press,1,\"5,000\",10.5%,2.5,$31.00,0.1,$24.50,$29.99
garlic mincer,2,,,,,,,
garlic press,3,1,0,0,,0,,
,4,900,1,1,,1,,
";

  #[test]
  fn parses_seller_console_export() {
    let parsed = parse_report_csv(EXPORT).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(
      parsed["garlic press"],
      KeywordMetrics::new(5000, 10.5, 2.5, 0.1).with_prices(Some(31.0), Some(24.5))
    );
    assert_eq!(parsed["garlic mincer"], KeywordMetrics::default());
  }

  #[test]
  fn csv_without_metadata_line_and_short_headers() {
    let body = "keyword,volume,imp share,click share,purchase share,your price,market price\n\
                peeler,120,3,1,0.5,12,10\n";
    let parsed = parse_report_csv(body).unwrap();
    assert_eq!(
      parsed["peeler"],
      KeywordMetrics::new(120, 3.0, 1.0, 0.5).with_prices(Some(12.0), Some(10.0))
    );
  }

  #[test]
  fn csv_without_query_column_is_malformed() {
    let err = parse_report_csv("volume,imp share\n10,1\n").unwrap_err();
    assert!(matches!(err, Error::MalformedReport(_)));
  }
}
