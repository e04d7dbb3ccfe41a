//! Period returns over a flattened portfolio series
//!
//! Each period is evaluated on its own against the full series; no state is
//! carried from one period to the next.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::flatten::PortfolioValueSeries;
use crate::config::Period;
use crate::error::{EngineError, EngineResult};

/// Fractional return of one portfolio over one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnRecord {
    pub portfolio_id: String,
    pub period: String,
    /// Dates the values were actually read from
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_value: Decimal,
    pub end_value: Decimal,
    #[serde(rename = "return")]
    pub return_fraction: Decimal,
}

/// Endpoint values and return for one period
fn evaluate(
    series: &PortfolioValueSeries,
    period: &Period,
) -> EngineResult<(NaiveDate, Decimal, NaiveDate, Decimal, Decimal)> {
    let degenerate = || EngineError::DegenerateReturn {
        period: period.label.clone(),
        start: period.start,
    };

    let start = series.value_at(period.start).ok_or_else(degenerate)?;
    if start.value.is_zero() {
        return Err(degenerate());
    }

    let end = series
        .value_at(period.end)
        .ok_or(EngineError::UndefinedAtDate { date: period.end })?;

    let fraction = (end.value - start.value) / start.value;
    Ok((start.date, start.value, end.date, end.value, fraction))
}

/// `(value_at(end) - value_at(start)) / value_at(start)`.
///
/// `value_at(d)` is the first defined value on or after `d`. A zero or missing
/// start value is a degenerate portfolio and is reported, never coerced.
pub fn period_return(series: &PortfolioValueSeries, period: &Period) -> EngineResult<Decimal> {
    evaluate(series, period).map(|(.., fraction)| fraction)
}

/// Return records for every period, in period order
pub fn period_returns(
    series: &PortfolioValueSeries,
    portfolio_id: &str,
    periods: &[Period],
) -> EngineResult<Vec<ReturnRecord>> {
    periods
        .iter()
        .map(|period| {
            let (start_date, start_value, end_date, end_value, return_fraction) =
                evaluate(series, period)?;
            Ok(ReturnRecord {
                portfolio_id: portfolio_id.to_string(),
                period: period.label.clone(),
                start_date,
                end_date,
                start_value,
                end_value,
                return_fraction,
            })
        })
        .collect()
}
