//! HTTP implementations of the report and listing sources.

use std::{collections::HashMap, time::Duration};

use anyhow::Context as _;
use reqwest::{Client, Response, StatusCode, Url};
use sqp_core::{
  Error,
  calendar::{Quarter, WeekSpan},
  metric::KeywordMetrics,
  report::parse_report,
  source::{Listing, ListingSource, ReportSource},
};

fn transport(e: impl std::error::Error + Send + Sync + 'static) -> Error {
  Error::Transport(Box::new(e))
}

fn status_error(what: &str, status: StatusCode) -> Error {
  Error::Transport(format!("{what} → {status}").into())
}

// ─── Shared client ───────────────────────────────────────────────────────────

/// A `reqwest` client carrying the request timeout and bearer token.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  token:  Option<String>,
}

impl ApiClient {
  pub fn new(token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, token })
  }

  async fn get(&self, url: Url, query: &[(&str, String)]) -> Result<Response, Error> {
    let mut req = self.client.get(url).query(query);
    if let Some(token) = &self.token {
      req = req.bearer_auth(token);
    }
    req.send().await.map_err(transport)
  }
}

fn endpoint(base: &str, segments: &[&str]) -> Result<Url, Error> {
  let mut url = Url::parse(base).map_err(transport)?;
  url
    .path_segments_mut()
    .map_err(|()| Error::Transport(format!("{base} cannot be used as a base URL").into()))?
    .pop_if_empty()
    .extend(segments);
  Ok(url)
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// `GET {base}/reports/search-query-performance?asin=&start=&end=`
pub struct HttpReportSource {
  api:      ApiClient,
  base_url: String,
}

impl HttpReportSource {
  pub fn new(api: ApiClient, base_url: impl Into<String>) -> Self {
    Self { api, base_url: base_url.into() }
  }
}

impl ReportSource for HttpReportSource {
  async fn fetch_weekly_metrics(
    &self,
    asin: &str,
    _quarter: Quarter,
    week: WeekSpan,
  ) -> sqp_core::Result<HashMap<String, KeywordMetrics>> {
    let url = endpoint(&self.base_url, &["reports", "search-query-performance"])?;
    let resp = self
      .api
      .get(url, &[
        ("asin", asin.to_owned()),
        ("start", week.start.to_string()),
        ("end", week.end.to_string()),
      ])
      .await?;

    check_report_status(resp.status(), asin, week.index)?;
    let body = resp.text().await.map_err(transport)?;
    parse_report(asin, week.index, &body)
  }
}

fn check_report_status(status: StatusCode, asin: &str, week: u8) -> Result<(), Error> {
  match status.as_u16() {
    // Not generated yet, still processing, or requested too early.
    404 | 409 | 425 => Err(Error::ReportUnavailable { asin: asin.to_owned(), week }),
    _ if !status.is_success() => Err(status_error("GET search-query-performance", status)),
    _ => Ok(()),
  }
}

// ─── Listings ────────────────────────────────────────────────────────────────

/// `GET {base}/listings/{sku}` returning `{ "title", "backend_keywords" }`.
pub struct HttpListingSource {
  api:      ApiClient,
  base_url: Option<String>,
}

impl HttpListingSource {
  pub fn new(api: ApiClient, base_url: Option<String>) -> Self { Self { api, base_url } }
}

impl ListingSource for HttpListingSource {
  async fn fetch_placement(&self, sku: &str) -> sqp_core::Result<Listing> {
    let base = self
      .base_url
      .as_deref()
      .ok_or_else(|| Error::Transport("listing_url is not configured".into()))?;
    let resp = self.api.get(endpoint(base, &["listings", sku])?, &[]).await?;

    check_listing_status(resp.status(), sku)?;
    resp.json().await.map_err(transport)
  }
}

fn check_listing_status(status: StatusCode, sku: &str) -> Result<(), Error> {
  if status == StatusCode::NOT_FOUND {
    return Err(Error::ListingNotFound(sku.to_owned()));
  }
  if !status.is_success() {
    return Err(status_error("GET listings", status));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn endpoint_appends_segments() {
    let url = endpoint("https://api.example.com/v1/", &["listings", "SKU 1/A"]).unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/v1/listings/SKU%201%2FA");

    let url = endpoint("http://localhost:8080", &["reports", "search-query-performance"]).unwrap();
    assert_eq!(url.as_str(), "http://localhost:8080/reports/search-query-performance");
  }

  #[test]
  fn endpoint_rejects_bad_base() {
    assert!(matches!(endpoint("not a url", &["x"]), Err(Error::Transport(_))));
    assert!(matches!(endpoint("mailto:ops@example.com", &["x"]), Err(Error::Transport(_))));
  }

  fn code(n: u16) -> StatusCode { StatusCode::from_u16(n).unwrap() }

  #[test]
  fn report_statuses_that_mean_not_ready() {
    for n in [404, 409, 425] {
      let err = check_report_status(code(n), "B0A", 7).unwrap_err();
      assert!(
        matches!(&err, Error::ReportUnavailable { asin, week: 7 } if asin == "B0A"),
        "{n}: {err}"
      );
    }
  }

  #[test]
  fn other_report_failures_are_transport_errors() {
    for n in [400, 401, 403, 500, 503] {
      assert!(matches!(check_report_status(code(n), "B0A", 1), Err(Error::Transport(_))), "{n}");
    }
    assert!(check_report_status(StatusCode::OK, "B0A", 1).is_ok());
  }

  #[test]
  fn listing_statuses() {
    assert!(matches!(
      check_listing_status(StatusCode::NOT_FOUND, "SKU-1"),
      Err(Error::ListingNotFound(sku)) if sku == "SKU-1"
    ));
    assert!(matches!(
      check_listing_status(StatusCode::CONFLICT, "SKU-1"),
      Err(Error::Transport(_))
    ));
    assert!(matches!(
      check_listing_status(StatusCode::INTERNAL_SERVER_ERROR, "SKU-1"),
      Err(Error::Transport(_))
    ));
    assert!(check_listing_status(StatusCode::OK, "SKU-1").is_ok());
  }

  #[tokio::test]
  async fn listing_without_base_url_fails() {
    let api = ApiClient::new(None, Duration::from_secs(1)).unwrap();
    let source = HttpListingSource::new(api, None);
    let err = source.fetch_placement("SKU").await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
  }
}
