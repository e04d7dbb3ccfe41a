//! Holdings lists: the tickers and amounts each simulated portfolio buys
//!
//! Holdings arrive as CSV files with a header row. Column names are matched
//! loosely (`Ticker`/`Symbol`, `Invested`/`Amount`, `Expected ...`) because the
//! lists are produced by hand and by upstream scripts alike.

use anyhow::{anyhow, Context};
use csv::ReaderBuilder;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult, Result};

/// One portfolio entry: a ticker plus the amount invested in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub ticker: String,
    pub invested_amount: Decimal,
    pub expected_annual_return: Option<Decimal>,
}

impl Holding {
    pub fn new(ticker: impl Into<String>, invested_amount: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            invested_amount,
            expected_annual_return: None,
        }
    }

    pub fn with_expected_return(mut self, expected: Decimal) -> Self {
        self.expected_annual_return = Some(expected);
        self
    }
}

/// A named list of holdings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    pub holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn new(id: impl Into<String>, holdings: Vec<Holding>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            holdings,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Benchmark portfolio: the same representative amount in every ticker.
    ///
    /// The amounts only give the benchmark the shape the valuation pipeline
    /// expects; they are not a capital allocation.
    pub fn benchmark(id: impl Into<String>, tickers: &[String], amount: Decimal) -> Self {
        let holdings = tickers
            .iter()
            .map(|t| Holding::new(t.clone(), amount))
            .collect();
        Self::new(id, holdings)
    }

    pub fn tickers(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.ticker.clone()).collect()
    }

    pub fn total_invested(&self) -> Decimal {
        self.holdings.iter().map(|h| h.invested_amount).sum()
    }

    /// Reject duplicate tickers, non-positive amounts and empty lists
    pub fn validate(&self) -> EngineResult<()> {
        let malformed = |reason: String| {
            Err(EngineError::MalformedHoldings {
                portfolio: self.id.clone(),
                reason,
            })
        };

        if self.holdings.is_empty() {
            return malformed("no holdings".to_string());
        }

        if let Some(h) = self.holdings.iter().find(|h| h.ticker.trim().is_empty()) {
            return malformed(format!("blank ticker with amount {}", h.invested_amount));
        }

        let duplicates: Vec<&str> = self
            .holdings
            .iter()
            .map(|h| h.ticker.as_str())
            .duplicates()
            .collect();
        if !duplicates.is_empty() {
            return malformed(format!("duplicate ticker(s): {}", duplicates.join(", ")));
        }

        if let Some(h) = self
            .holdings
            .iter()
            .find(|h| h.invested_amount <= Decimal::ZERO)
        {
            return malformed(format!(
                "{} has non-positive invested amount {}",
                h.ticker, h.invested_amount
            ));
        }

        Ok(())
    }
}

#[derive(Debug)]
struct HoldingsColumns {
    ticker: usize,
    invested: usize,
    expected: Option<usize>,
}

fn find_columns(headers: &csv::StringRecord) -> Result<HoldingsColumns> {
    let mut ticker_idx = None;
    let mut invested_idx = None;
    let mut expected_idx = None;

    for (idx, header) in headers.iter().enumerate() {
        let text = header.trim().to_lowercase();

        if ticker_idx.is_none() && (text.contains("ticker") || text.contains("symbol")) {
            ticker_idx = Some(idx);
        }

        if text.contains("expected") {
            expected_idx = Some(idx);
        } else if invested_idx.is_none() && (text.contains("invest") || text.contains("amount")) {
            invested_idx = Some(idx);
        }
    }

    Ok(HoldingsColumns {
        ticker: ticker_idx.ok_or_else(|| anyhow!("Ticker column not found"))?,
        invested: invested_idx.ok_or_else(|| anyhow!("Invested amount column not found"))?,
        expected: expected_idx,
    })
}

/// Parse an amount such as `100000`, `$100,000.00` or `1.5e3`
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|e| anyhow!("Invalid amount '{}': {}", raw, e))
}

/// Parse an expected return given as a fraction (`0.12`) or percentage (`12%`)
fn parse_expected_return(raw: &str) -> Result<Option<Decimal>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match trimmed.strip_suffix('%') {
        Some(pct) => Ok(Some(parse_amount(pct)? / Decimal::from(100))),
        None => parse_amount(trimmed).map(Some),
    }
}

/// Load a holdings CSV file into a portfolio with the given id
pub fn load_holdings<P: AsRef<Path>>(path: P, portfolio_id: &str) -> Result<Portfolio> {
    let path = path.as_ref();
    info!("Loading holdings for '{}' from {:?}", portfolio_id, path);

    let reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open holdings file {}", path.display()))?;

    let portfolio = read_holdings(reader, portfolio_id)
        .with_context(|| format!("Failed to read holdings file {}", path.display()))?;
    Ok(portfolio)
}

/// Read holdings from any CSV reader
pub fn read_holdings<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    portfolio_id: &str,
) -> Result<Portfolio> {
    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    let columns = find_columns(&headers)?;
    debug!("Holdings column mapping: {:?}", columns);

    let mut holdings = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.context("Failed to read CSV record")?;
        let line = idx + 2;

        let ticker = record.get(columns.ticker).unwrap_or("").trim();
        if ticker.is_empty() {
            continue;
        }

        let invested = record
            .get(columns.invested)
            .ok_or_else(|| anyhow!("Line {}: missing invested amount", line))
            .and_then(parse_amount)
            .with_context(|| format!("Line {} ({})", line, ticker))?;

        let expected = match columns.expected.and_then(|i| record.get(i)) {
            Some(raw) => {
                parse_expected_return(raw).with_context(|| format!("Line {} ({})", line, ticker))?
            }
            None => None,
        };

        holdings.push(Holding {
            ticker: ticker.to_uppercase(),
            invested_amount: invested,
            expected_annual_return: expected,
        });
    }

    info!("Loaded {} holdings for '{}'", holdings.len(), portfolio_id);
    Ok(Portfolio::new(portfolio_id, holdings))
}
