//! Core types and trait definitions for the quarterly SQP keyword tracker.
//!
//! This crate has no HTTP or database dependencies. The report, listing and
//! persistence collaborators are expressed as traits ([`source`], [`store`])
//! and implemented by the outer crates.

// Native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod calendar;
pub mod classifier;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod metric;
pub mod report;
pub mod source;
pub mod store;

pub use error::{Error, Result};
