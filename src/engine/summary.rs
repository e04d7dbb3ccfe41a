//! Per-holding snapshots at period ends and per-portfolio totals
//!
//! Holding rows are sampled from the daily valuation at each period's end
//! date and at the sell date. Gains here are absolute (`value - invested`);
//! rates are fractions of the invested amount.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::valuation::{HoldingValuation, ValuationPoint};
use crate::config::AnalysisWindow;
use crate::error::{EngineError, EngineResult};
use crate::holdings::Holding;

/// A holding's price, value and gain on one period's end date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSnapshot {
    pub period: String,
    pub date: NaiveDate,
    pub price: Decimal,
    pub value: Decimal,
    /// `value - invested_amount`
    pub gain: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingSummary {
    pub portfolio_id: String,
    pub ticker: String,
    pub invested_amount: Decimal,
    pub purchase_price: Decimal,
    pub shares: Decimal,
    pub periods: Vec<PeriodSnapshot>,
    pub sell_price: Decimal,
    pub sell_value: Decimal,
    pub actual_return: Decimal,
    pub actual_return_rate: Decimal,
    pub expected_annual_return: Option<Decimal>,
    /// Expected annual return scaled down to one window (annual / periods per year)
    pub adjusted_expected_return: Option<Decimal>,
}

/// Portfolio totals across holdings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioAggregate {
    pub portfolio_id: String,
    pub name: String,
    pub invested: Decimal,
    /// Summed holding gains per period, in period order
    pub period_gains: Vec<(String, Decimal)>,
    pub actual_return: Decimal,
    /// Sum of the holdings' return rates
    pub actual_return_rate_sum: Decimal,
    /// `actual_return / invested`
    pub actual_return_rate: Decimal,
}

fn sample(valuation: &HoldingValuation, date: NaiveDate) -> EngineResult<&ValuationPoint> {
    valuation
        .point_on(date)
        .ok_or(EngineError::UndefinedAtDate { date })
}

/// Snapshot a holding's valuation at every period end and at the sell date
pub fn summarize_holding(
    portfolio_id: &str,
    holding: &Holding,
    valuation: &HoldingValuation,
    window: &AnalysisWindow,
) -> EngineResult<HoldingSummary> {
    let invested = valuation.invested_amount;

    let periods = window
        .periods
        .iter()
        .map(|period| {
            let point = sample(valuation, period.end)?;
            Ok(PeriodSnapshot {
                period: period.label.clone(),
                date: point.date,
                price: point.close,
                value: point.current_value,
                gain: point.current_value - invested,
            })
        })
        .collect::<EngineResult<Vec<_>>>()?;

    let sell = sample(valuation, window.sell_date)?;
    let actual_return = sell.current_value - invested;

    let adjusted_expected_return = holding
        .expected_annual_return
        .map(|expected| expected / Decimal::from(window.periods_per_year));

    Ok(HoldingSummary {
        portfolio_id: portfolio_id.to_string(),
        ticker: valuation.ticker.clone(),
        invested_amount: invested,
        purchase_price: valuation.purchase_price,
        shares: valuation.shares,
        periods,
        sell_price: sell.close,
        sell_value: sell.current_value,
        actual_return,
        actual_return_rate: actual_return / invested,
        expected_annual_return: holding.expected_annual_return,
        adjusted_expected_return,
    })
}

/// Totals for one portfolio's holding rows
pub fn aggregate(
    portfolio_id: &str,
    name: &str,
    window: &AnalysisWindow,
    rows: &[HoldingSummary],
) -> PortfolioAggregate {
    let invested: Decimal = rows.iter().map(|r| r.invested_amount).sum();

    let period_gains = window
        .periods
        .iter()
        .enumerate()
        .map(|(i, period)| {
            let gain: Decimal = rows
                .iter()
                .filter_map(|r| r.periods.get(i))
                .map(|s| s.gain)
                .sum();
            (period.label.clone(), gain)
        })
        .collect();

    let actual_return: Decimal = rows.iter().map(|r| r.actual_return).sum();
    let actual_return_rate = if invested.is_zero() {
        Decimal::ZERO
    } else {
        actual_return / invested
    };

    PortfolioAggregate {
        portfolio_id: portfolio_id.to_string(),
        name: name.to_string(),
        invested,
        period_gains,
        actual_return,
        actual_return_rate_sum: rows.iter().map(|r| r.actual_return_rate).sum(),
        actual_return_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Period;
    use crate::engine::normalize::AlignedPriceSeries;
    use crate::engine::valuation::value_holding;
    use rust_decimal_macros::dec;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn window() -> AnalysisWindow {
        AnalysisWindow::new(
            d("2024-01-01"),
            d("2024-01-05"),
            vec![
                Period::new("first", d("2024-01-02"), d("2024-01-03")),
                Period::new("second", d("2024-01-04"), d("2024-01-04")),
            ],
        )
        .unwrap()
    }

    fn summary_for(holding: &Holding, closes: &[Decimal]) -> HoldingSummary {
        let series = AlignedPriceSeries::from_closes(holding.ticker.clone(), d("2024-01-01"), closes);
        let valuation = value_holding(&series, holding, d("2024-01-01")).unwrap();
        summarize_holding("p", holding, &valuation, &window()).unwrap()
    }

    #[test]
    fn test_snapshots_at_period_ends() {
        let holding = Holding::new("ABC", dec!(100000)).with_expected_return(dec!(0.2));
        let row = summary_for(&holding, &[dec!(50), dec!(52), dec!(55), dec!(48), dec!(60)]);

        assert_eq!(row.shares, dec!(2000));
        assert_eq!(row.periods[0].date, d("2024-01-03"));
        assert_eq!(row.periods[0].price, dec!(55));
        assert_eq!(row.periods[0].value, dec!(110000));
        assert_eq!(row.periods[0].gain, dec!(10000));
        assert_eq!(row.periods[1].gain, dec!(-4000));
        assert_eq!(row.sell_value, dec!(120000));
        assert_eq!(row.actual_return, dec!(20000));
        assert_eq!(row.actual_return_rate, dec!(0.2));
        assert_eq!(row.adjusted_expected_return, Some(dec!(0.05)));
    }

    #[test]
    fn test_no_expected_return_means_no_adjusted() {
        let holding = Holding::new("ABC", dec!(100));
        let row = summary_for(&holding, &[dec!(1), dec!(1), dec!(1), dec!(1), dec!(1)]);
        assert_eq!(row.adjusted_expected_return, None);
        assert_eq!(row.actual_return, Decimal::ZERO);
    }

    #[test]
    fn test_series_ending_before_sell_is_reported() {
        let holding = Holding::new("ABC", dec!(100));
        let series = AlignedPriceSeries::from_closes("ABC", d("2024-01-01"), &[dec!(1), dec!(1), dec!(1)]);
        let valuation = value_holding(&series, &holding, d("2024-01-01")).unwrap();
        let result = summarize_holding("p", &holding, &valuation, &window());
        assert!(matches!(result, Err(EngineError::UndefinedAtDate { .. })));
    }

    #[test]
    fn test_aggregate_sums_holdings() {
        let a = summary_for(&Holding::new("A", dec!(1000)), &[dec!(10), dec!(10), dec!(11), dec!(12), dec!(13)]);
        let b = summary_for(&Holding::new("B", dec!(1000)), &[dec!(10), dec!(10), dec!(9), dec!(9), dec!(9)]);

        let total = aggregate("p", "Portfolio", &window(), &[a, b]);
        assert_eq!(total.invested, dec!(2000));
        assert_eq!(total.period_gains[0], ("first".to_string(), dec!(0)));
        assert_eq!(total.period_gains[1], ("second".to_string(), dec!(100)));
        assert_eq!(total.actual_return, dec!(200));
        assert_eq!(total.actual_return_rate_sum, dec!(0.2));
        assert_eq!(total.actual_return_rate, dec!(0.1));
    }
}
