//! SQLite backend for the SQP keyword tracker.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. [`sheet`] renders a ledger as the
//! tabular view operators read.

mod encode;
mod schema;
mod store;

pub mod error;
pub mod sheet;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
