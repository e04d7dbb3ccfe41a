//! Error handling for the valuation engine
//!
//! The engine reports typed failures through [`EngineError`] so callers can
//! tell a missing ticker apart from a degenerate return. The CLI layer wraps
//! these in `anyhow` for context chaining, like every other adapter.

use chrono::NaiveDate;
use thiserror::Error;

/// Failures raised while valuing and comparing portfolios
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("portfolio '{portfolio}': no price data for {ticker} in the observation window")]
    MissingTickerData { portfolio: String, ticker: String },

    #[error("{ticker}: no price defined on or before purchase date {date}")]
    UndefinedAtPurchase { ticker: String, date: NaiveDate },

    #[error("period '{period}': portfolio value at {start} is zero or undefined")]
    DegenerateReturn { period: String, start: NaiveDate },

    #[error("portfolio '{portfolio}': malformed holdings: {reason}")]
    MalformedHoldings { portfolio: String, reason: String },

    #[error("invalid analysis window: {reason}")]
    InvalidWindow { reason: String },

    #[error("{ticker}: purchase price {price} on {date} is not positive")]
    InvalidPurchasePrice {
        ticker: String,
        date: NaiveDate,
        price: rust_decimal::Decimal,
    },

    #[error("no portfolio value defined on or after {date}")]
    UndefinedAtDate { date: NaiveDate },

    #[error("holding valuations share no common dates")]
    NoCommonDates,

    #[error("price fetch failed")]
    PriceFetch {
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    /// Attach the owning portfolio to errors raised below the comparator
    pub(crate) fn in_portfolio(self, id: &str) -> Self {
        match self {
            EngineError::MissingTickerData { ticker, .. } => EngineError::MissingTickerData {
                portfolio: id.to_string(),
                ticker,
            },
            EngineError::MalformedHoldings { reason, .. } => EngineError::MalformedHoldings {
                portfolio: id.to_string(),
                reason,
            },
            other => other,
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result type alias for application-level operations
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = EngineError::MissingTickerData {
            portfolio: "positive".to_string(),
            ticker: "XYZ".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "portfolio 'positive': no price data for XYZ in the observation window"
        );
    }

    #[test]
    fn test_in_portfolio_rewrites_portfolio_errors() {
        let err = EngineError::MissingTickerData {
            portfolio: String::new(),
            ticker: "XYZ".to_string(),
        }
        .in_portfolio("negative");
        assert!(matches!(
            err,
            EngineError::MissingTickerData { ref portfolio, .. } if portfolio == "negative"
        ));

        let malformed = EngineError::MalformedHoldings {
            portfolio: String::new(),
            reason: "ABC has non-positive invested amount 0".to_string(),
        }
        .in_portfolio("negative");
        assert!(malformed.to_string().starts_with("portfolio 'negative'"));

        let other = EngineError::NoCommonDates.in_portfolio("negative");
        assert!(matches!(other, EngineError::NoCommonDates));
    }

    #[test]
    fn test_anyhow_context_chains_errors() {
        use anyhow::Context;
        let result: Result<()> = Err(EngineError::NoCommonDates).context("failed to compare");
        match result {
            Err(e) => {
                assert!(e.to_string().contains("failed to compare"));
                let debug_msg = format!("{:?}", e);
                assert!(debug_msg.contains("common dates"));
            }
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_price_fetch_keeps_source() {
        use std::error::Error as _;
        let err = EngineError::PriceFetch {
            source: anyhow::anyhow!("connection refused"),
        };
        assert_eq!(err.to_string(), "price fetch failed");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("connection refused"));
    }
}
