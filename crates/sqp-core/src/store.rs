//! The `LedgerStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `sqp-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend, and
//! assumes nothing about how a backend lays the ledger out.

use std::future::Future;

use crate::{calendar::Quarter, ledger::KeywordLedger};

/// Abstraction over ledger persistence.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait LedgerStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Load the ledger for `asin` in `quarter`. Returns `None` if none exists.
  fn load_ledger<'a>(
    &'a self,
    asin: &'a str,
    quarter: Quarter,
  ) -> impl Future<Output = Result<Option<KeywordLedger>, Self::Error>> + Send + 'a;

  /// Persist the full state of `ledger`, creating it if needed.
  ///
  /// Recorded weeks and alerts are history: a backend may assume a later save
  /// of the same ledger only ever adds to them.
  fn save_ledger<'a>(
    &'a self,
    ledger: &'a KeywordLedger,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Every ledger stored for `quarter`, ordered by ASIN.
  fn list_ledgers(
    &self,
    quarter: Quarter,
  ) -> impl Future<Output = Result<Vec<KeywordLedger>, Self::Error>> + Send + '_;
}
