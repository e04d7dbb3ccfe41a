//! CSV export of comparison tables

use anyhow::{Context, Result};
use csv::Writer;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::comparison::ReturnsMatrix;
use crate::engine::{ComparisonReport, PortfolioValueSeries};

pub const RETURNS_FILE: &str = "returns.csv";
pub const AGGREGATES_FILE: &str = "aggregates.csv";
pub const HOLDINGS_FILE: &str = "holdings.csv";

fn money(value: Decimal) -> String {
    format!(
        "{:.2}",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

fn fraction(value: Decimal) -> String {
    value.round_dp(6).normalize().to_string()
}

fn open_writer(path: &Path) -> Result<Writer<fs::File>> {
    Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))
}

/// `period,start,end,<portfolio...>`
pub fn write_returns_csv(report: &ComparisonReport, path: &Path) -> Result<()> {
    let matrix = ReturnsMatrix::from_report(report);
    let mut writer = open_writer(path)?;

    let mut header = vec!["period".to_string(), "start".to_string(), "end".to_string()];
    header.extend(matrix.portfolio_ids.iter().cloned());
    writer.write_record(&header)?;

    for row in &matrix.rows {
        let mut record = vec![row.period.clone(), row.start.to_string(), row.end.to_string()];
        record.extend(row.returns.iter().map(|r| fraction(*r)));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// One row per portfolio with per-period gains as columns
pub fn write_aggregates_csv(report: &ComparisonReport, path: &Path) -> Result<()> {
    let mut writer = open_writer(path)?;

    let mut header: Vec<String> = ["portfolio", "name", "invested"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(report.window.periods.iter().map(|p| format!("{} gain", p.label)));
    header.extend(
        ["actual_return", "actual_return_rate_sum", "actual_return_rate"]
            .iter()
            .map(|s| s.to_string()),
    );
    writer.write_record(&header)?;

    for aggregate in report.aggregates() {
        let mut record = vec![
            aggregate.portfolio_id.clone(),
            aggregate.name.clone(),
            money(aggregate.invested),
        ];
        record.extend(aggregate.period_gains.iter().map(|(_, gain)| money(*gain)));
        record.push(money(aggregate.actual_return));
        record.push(fraction(aggregate.actual_return_rate_sum));
        record.push(fraction(aggregate.actual_return_rate));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// One row per holding with price, value and gain at each period end
pub fn write_holdings_csv(report: &ComparisonReport, path: &Path) -> Result<()> {
    let mut writer = open_writer(path)?;

    let mut header: Vec<String> = ["portfolio", "ticker", "invested", "purchase_price", "shares"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for period in &report.window.periods {
        header.push(format!("{} price", period.label));
        header.push(format!("{} value", period.label));
        header.push(format!("{} gain", period.label));
    }
    header.extend(
        [
            "sell_price",
            "sell_value",
            "actual_return",
            "actual_return_rate",
            "expected_annual_return",
            "adjusted_expected_return",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    writer.write_record(&header)?;

    for row in report.holding_summaries() {
        let mut record = vec![
            row.portfolio_id.clone(),
            row.ticker.clone(),
            money(row.invested_amount),
            row.purchase_price.to_string(),
            row.shares.round_dp(6).normalize().to_string(),
        ];
        for snapshot in &row.periods {
            record.push(snapshot.price.to_string());
            record.push(money(snapshot.value));
            record.push(money(snapshot.gain));
        }
        record.push(row.sell_price.to_string());
        record.push(money(row.sell_value));
        record.push(money(row.actual_return));
        record.push(fraction(row.actual_return_rate));
        record.push(row.expected_annual_return.map(fraction).unwrap_or_default());
        record.push(row.adjusted_expected_return.map(fraction).unwrap_or_default());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Daily `date,value` series for one portfolio
pub fn write_value_series_csv(series: &PortfolioValueSeries, path: &Path) -> Result<()> {
    let mut writer = open_writer(path)?;
    writer.write_record(["date", "value"])?;
    for point in series.points() {
        writer.write_record([point.date.to_string(), money(point.value)])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the returns, aggregate and holding tables into `dir`
pub fn export_csv(report: &ComparisonReport, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let returns = dir.join(RETURNS_FILE);
    let aggregates = dir.join(AGGREGATES_FILE);
    let holdings = dir.join(HOLDINGS_FILE);

    write_returns_csv(report, &returns)?;
    write_aggregates_csv(report, &aggregates)?;
    write_holdings_csv(report, &holdings)?;

    info!("Exported comparison tables to {}", dir.display());
    Ok(vec![returns, aggregates, holdings])
}
