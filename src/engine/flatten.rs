//! Cross-holding aggregation into one portfolio value per day

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use super::valuation::HoldingValuation;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioValuePoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

/// Total portfolio value for consecutive calendar days
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioValueSeries {
    points: Vec<PortfolioValuePoint>,
}

impl PortfolioValueSeries {
    /// Series of values on consecutive days starting at `start`
    pub fn from_values(start: NaiveDate, values: &[Decimal]) -> Self {
        let points = start
            .iter_days()
            .zip(values)
            .map(|(date, value)| PortfolioValuePoint {
                date,
                value: *value,
            })
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[PortfolioValuePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn value_on(&self, date: NaiveDate) -> Option<Decimal> {
        let first = self.first_date()?;
        let offset = usize::try_from((date - first).num_days()).ok()?;
        self.points.get(offset).map(|p| p.value)
    }

    /// First defined point at or after `date`
    pub fn value_at(&self, date: NaiveDate) -> Option<PortfolioValuePoint> {
        self.points.iter().find(|p| p.date >= date).copied()
    }
}

/// Sum holding values per day.
///
/// The result covers only the dates every holding defines. Holdings that start
/// later or end earlier than the rest narrow the whole series, and that
/// truncation is logged.
pub fn flatten(valuations: &[HoldingValuation]) -> EngineResult<PortfolioValueSeries> {
    let firsts: Vec<NaiveDate> = valuations.iter().filter_map(|v| v.first_date()).collect();
    let lasts: Vec<NaiveDate> = valuations.iter().filter_map(|v| v.last_date()).collect();

    if valuations.is_empty() || firsts.len() != valuations.len() {
        return Err(EngineError::NoCommonDates);
    }

    let (Some(start), Some(end)) = (firsts.iter().max().copied(), lasts.iter().min().copied())
    else {
        return Err(EngineError::NoCommonDates);
    };
    if start > end {
        return Err(EngineError::NoCommonDates);
    }

    let widest_start = firsts.iter().min().copied().unwrap_or(start);
    let widest_end = lasts.iter().max().copied().unwrap_or(end);
    if widest_start < start || widest_end > end {
        warn!(
            "Holding dates differ; portfolio series truncated from {}..{} to {}..{}",
            widest_start, widest_end, start, end
        );
    }

    let points = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| {
            valuations
                .iter()
                .map(|v| v.value_on(date))
                .sum::<Option<Decimal>>()
                .map(|value| PortfolioValuePoint { date, value })
                .ok_or(EngineError::NoCommonDates)
        })
        .collect::<EngineResult<Vec<_>>>()?;

    Ok(PortfolioValueSeries { points })
}
