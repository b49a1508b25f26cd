//! Link budget calculation engine.
//!
//! Pure, synchronous computation over a [`Configuration`](crate::common::configuration::Configuration):
//! unit normalization, per-element gains and the aggregated totals.

pub mod error;
pub mod link_calculations;
pub mod process;
pub mod units;
pub mod variants;
