//! Folio - buy-and-hold portfolio valuation and comparison
//!
//! This library values simulated equity portfolios from daily closing prices,
//! flattens them into one value series per portfolio, and compares period
//! returns across portfolios and a benchmark index.

pub mod config;
pub mod engine;
pub mod error;
pub mod holdings;
pub mod pricing;
pub mod reports;
pub mod utils;
