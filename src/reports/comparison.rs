use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::engine::ComparisonReport;

/// Period-by-portfolio return matrix; benchmark last when present
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnsMatrix {
    pub portfolio_ids: Vec<String>,
    pub benchmark_id: Option<String>,
    pub rows: Vec<ReturnsMatrixRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnsMatrixRow {
    pub period: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// One entry per column in `portfolio_ids` order
    pub returns: Vec<Decimal>,
}

impl ReturnsMatrix {
    pub fn from_report(report: &ComparisonReport) -> Self {
        let portfolio_ids = report
            .evaluations()
            .map(|e| e.portfolio_id.clone())
            .collect();

        let mut rows: Vec<ReturnsMatrixRow> = report
            .window
            .periods
            .iter()
            .map(|period| ReturnsMatrixRow {
                period: period.label.clone(),
                start: period.start,
                end: period.end,
                returns: Vec::new(),
            })
            .collect();

        // Records come back one per period in window order
        for evaluation in report.evaluations() {
            debug_assert_eq!(evaluation.returns.len(), rows.len());
            for (row, record) in rows.iter_mut().zip(&evaluation.returns) {
                row.returns.push(record.return_fraction);
            }
        }

        Self {
            portfolio_ids,
            benchmark_id: report.benchmark.as_ref().map(|b| b.portfolio_id.clone()),
            rows,
        }
    }

    /// Each portfolio's return minus the benchmark's, per period
    pub fn excess_over_benchmark(&self, row: &ReturnsMatrixRow) -> Vec<Option<Decimal>> {
        let benchmark = self
            .benchmark_id
            .as_ref()
            .and_then(|id| self.portfolio_ids.iter().position(|p| p == id))
            .and_then(|i| row.returns.get(i).copied());

        row.returns
            .iter()
            .zip(&self.portfolio_ids)
            .map(|(value, id)| match benchmark {
                Some(b) if Some(id) != self.benchmark_id.as_ref() => Some(*value - b),
                _ => None,
            })
            .collect()
    }
}

/// Portfolio whose total return rate is highest, benchmark excluded
pub fn best_portfolio(report: &ComparisonReport) -> Option<(&str, Decimal)> {
    report
        .portfolios
        .iter()
        .max_by_key(|e| e.aggregate.actual_return_rate)
        .map(|e| (e.portfolio_id.as_str(), e.aggregate.actual_return_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisWindow, Period};
    use crate::engine::Comparator;
    use crate::holdings::{Holding, Portfolio};
    use crate::pricing::{MemoryPriceSource, RawPriceRow};
    use rust_decimal_macros::dec;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn report() -> ComparisonReport {
        let rows = |closes: &[Decimal]| -> Vec<RawPriceRow> {
            d("2024-01-01")
                .iter_days()
                .zip(closes)
                .map(|(date, c)| RawPriceRow::close_only(date, *c))
                .collect()
        };
        let source = MemoryPriceSource::default()
            .with_series("UP", rows(&[dec!(10), dec!(11), dec!(12)]))
            .with_series("DOWN", rows(&[dec!(10), dec!(9), dec!(8)]))
            .with_series("IDX", rows(&[dec!(100), dec!(105), dec!(105)]));
        let window = AnalysisWindow::new(
            d("2024-01-01"),
            d("2024-01-03"),
            vec![
                Period::new("a", d("2024-01-01"), d("2024-01-02")),
                Period::new("b", d("2024-01-02"), d("2024-01-03")),
            ],
        )
        .unwrap();

        let up = Portfolio::new("up", vec![Holding::new("UP", dec!(100))]);
        let down = Portfolio::new("down", vec![Holding::new("DOWN", dec!(100))]);
        let bench = Portfolio::benchmark("benchmark", &["IDX".to_string()], dec!(1000));

        Comparator::new(&source, &window)
            .compare(&[up, down], Some(&bench))
            .unwrap()
    }

    #[test]
    fn test_matrix_columns_follow_input_order() {
        let matrix = ReturnsMatrix::from_report(&report());
        assert_eq!(matrix.portfolio_ids, vec!["up", "down", "benchmark"]);
        assert_eq!(matrix.rows.len(), 2);
        assert_eq!(matrix.rows[0].returns, vec![dec!(0.1), dec!(-0.1), dec!(0.05)]);
    }

    #[test]
    fn test_rows_follow_period_position() {
        let mut report = report();
        // Same label on both periods must not collapse the rows
        report.window.periods[1].label = "a".to_string();
        for evaluation in report.portfolios.iter_mut().chain(report.benchmark.iter_mut()) {
            evaluation.returns[1].period = "a".to_string();
        }

        let matrix = ReturnsMatrix::from_report(&report);
        assert_eq!(matrix.rows[0].returns[2], dec!(0.05));
        assert_eq!(matrix.rows[1].returns[2], dec!(0));
        assert_eq!(matrix.rows[1].returns[1], dec!(-10) / dec!(90));
    }

    #[test]
    fn test_excess_over_benchmark() {
        let matrix = ReturnsMatrix::from_report(&report());
        let excess = matrix.excess_over_benchmark(&matrix.rows[0]);
        assert_eq!(excess, vec![Some(dec!(0.05)), Some(dec!(-0.15)), None]);
    }

    #[test]
    fn test_best_portfolio_ignores_benchmark() {
        let report = report();
        let (id, rate) = best_portfolio(&report).unwrap();
        assert_eq!(id, "up");
        assert_eq!(rate, dec!(0.2));
    }
}
