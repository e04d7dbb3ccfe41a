//! Per-holding buy-and-hold valuation
//!
//! Shares are bought once at the purchase-date close and never rebalanced, so
//! the daily value is just `shares * close`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::normalize::{AlignedPriceSeries, PriceTable};
use crate::error::{EngineError, EngineResult};
use crate::holdings::{Holding, Portfolio};

/// A holding's state on one calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationPoint {
    pub date: NaiveDate,
    pub close: Decimal,
    pub current_value: Decimal,
    /// `(close - purchase_price) / purchase_price`
    pub percent_change: Decimal,
}

/// Daily valuation of one holding from its purchase date onward
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingValuation {
    pub ticker: String,
    pub invested_amount: Decimal,
    pub purchase_date: NaiveDate,
    pub purchase_price: Decimal,
    pub shares: Decimal,
    pub points: Vec<ValuationPoint>,
}

impl HoldingValuation {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn point_on(&self, date: NaiveDate) -> Option<&ValuationPoint> {
        let first = self.first_date()?;
        let offset = usize::try_from((date - first).num_days()).ok()?;
        self.points.get(offset)
    }

    pub fn value_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.point_on(date).map(|p| p.current_value)
    }
}

/// Value one holding against its aligned price series.
///
/// The purchase date must be defined in the series; a forward-filled close
/// from an earlier trading day is accepted.
pub fn value_holding(
    series: &AlignedPriceSeries,
    holding: &Holding,
    purchase_date: NaiveDate,
) -> EngineResult<HoldingValuation> {
    if holding.invested_amount <= Decimal::ZERO {
        return Err(EngineError::MalformedHoldings {
            portfolio: String::new(),
            reason: format!(
                "{} has non-positive invested amount {}",
                holding.ticker, holding.invested_amount
            ),
        });
    }

    let purchase_price =
        series
            .close_on(purchase_date)
            .ok_or_else(|| EngineError::UndefinedAtPurchase {
                ticker: holding.ticker.clone(),
                date: purchase_date,
            })?;

    if purchase_price <= Decimal::ZERO {
        return Err(EngineError::InvalidPurchasePrice {
            ticker: holding.ticker.clone(),
            date: purchase_date,
            price: purchase_price,
        });
    }

    let shares = holding.invested_amount / purchase_price;

    let points: Vec<ValuationPoint> = series
        .rows()
        .iter()
        .skip_while(|r| r.date < purchase_date)
        .map(|r| ValuationPoint {
            date: r.date,
            close: r.close,
            current_value: shares * r.close,
            percent_change: (r.close - purchase_price) / purchase_price,
        })
        .collect();

    debug!(
        "{}: {} shares at {} over {} days",
        holding.ticker,
        shares.round_dp(6),
        purchase_price,
        points.len()
    );

    Ok(HoldingValuation {
        ticker: holding.ticker.clone(),
        invested_amount: holding.invested_amount,
        purchase_date,
        purchase_price,
        shares,
        points,
    })
}

/// Value every holding of a portfolio; the first failure aborts the portfolio
pub fn value_portfolio(
    table: &PriceTable,
    portfolio: &Portfolio,
    purchase_date: NaiveDate,
) -> EngineResult<Vec<HoldingValuation>> {
    portfolio
        .holdings
        .iter()
        .map(|holding| {
            let series =
                table
                    .get(&holding.ticker)
                    .ok_or_else(|| EngineError::MissingTickerData {
                        portfolio: portfolio.id.clone(),
                        ticker: holding.ticker.clone(),
                    })?;
            value_holding(series, holding, purchase_date).map_err(|e| e.in_portfolio(&portfolio.id))
        })
        .collect()
}
