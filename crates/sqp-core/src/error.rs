//! Error types for `sqp-core`.

use thiserror::Error;

use crate::calendar::Quarter;

#[derive(Debug, Error)]
pub enum Error {
  #[error(
    "insufficient data: {required} keywords with search volume required, \
     found {available}"
  )]
  InsufficientData { required: usize, available: usize },

  #[error("keyword set is already locked")]
  AlreadyLocked,

  #[error("keyword set has not been locked yet")]
  NotLocked,

  #[error("out-of-order week: expected W{expected:02}, got W{got:02}")]
  OutOfOrderWeek { expected: u8, got: u8 },

  #[error("week {0} is outside the quarter (1-13)")]
  WeekOutOfRange(u8),

  #[error("invalid quarter number: {0}")]
  InvalidQuarter(u8),

  #[error("keyword is not tracked: {0:?}")]
  UnknownKeyword(String),

  #[error("report for {asin} W{week:02} is not available yet")]
  ReportUnavailable { asin: String, week: u8 },

  #[error("listing not found for sku {0:?}")]
  ListingNotFound(String),

  #[error("no ledger for {asin} in {quarter}; start the quarter first")]
  NoLedgerYet { asin: String, quarter: Quarter },

  #[error("ledger for {asin} in {quarter} already exists")]
  LedgerExists { asin: String, quarter: Quarter },

  #[error("no complete weeks in {0} yet")]
  NoCompleteWeeks(Quarter),

  #[error("corrupt ledger: {0}")]
  Corrupt(String),

  #[error("malformed report export: {0}")]
  MalformedReport(String),

  #[error("transport error: {0}")]
  Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
