// Pricing module - raw daily price history and the sources that provide it

pub mod csv_store;
pub mod yahoo;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

pub use csv_store::CsvPriceStore;

/// One trading day of vendor data for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRow {
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Decimal,
    pub volume: Option<i64>,
}

impl RawPriceRow {
    /// Row carrying only a close, as most test fixtures need
    pub fn close_only(date: NaiveDate, close: Decimal) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }
}

/// Ticker -> rows ordered by date. Tickers without data are absent.
pub type RawPriceTable = BTreeMap<String, Vec<RawPriceRow>>;

/// Anything that can return daily price rows for a set of tickers.
///
/// Implementations may omit tickers or dates they have no data for but must
/// never fabricate values.
pub trait PriceSource {
    fn fetch_daily_prices(
        &self,
        tickers: &BTreeSet<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawPriceTable>;
}

/// Keep rows inside `[start, end]`, sorted by date with one row per date
pub(crate) fn clip_rows(rows: &[RawPriceRow], start: NaiveDate, end: NaiveDate) -> Vec<RawPriceRow> {
    let by_date: BTreeMap<NaiveDate, &RawPriceRow> = rows
        .iter()
        .filter(|r| start <= r.date && r.date <= end)
        .map(|r| (r.date, r))
        .collect();
    by_date.into_values().cloned().collect()
}

/// Download tickers into the CSV store before the engine reads it.
///
/// Only tickers whose stored rows do not span the range are downloaded unless `refresh`
/// is set. Returns the tickers that were written.
pub async fn update_store(
    store: &CsvPriceStore,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
    refresh: bool,
) -> Result<Vec<String>> {
    let wanted = if refresh {
        tickers.to_vec()
    } else {
        store.missing_tickers(tickers, start, end)?
    };
    if wanted.is_empty() {
        info!("Price store already covers {} tickers", tickers.len());
        return Ok(Vec::new());
    }

    let table = yahoo::fetch_daily_prices(&wanted, start, end).await;
    for ticker in wanted.iter().filter(|t| !table.contains_key(*t)) {
        warn!("No prices downloaded for {}", ticker);
    }

    let mut written = Vec::new();
    for (ticker, rows) in &table {
        store.write_ticker(ticker, rows)?;
        written.push(ticker.clone());
    }
    Ok(written)
}

/// Price source backed by a table already held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryPriceSource {
    table: RawPriceTable,
}

impl MemoryPriceSource {
    pub fn new(table: RawPriceTable) -> Self {
        Self { table }
    }

    pub fn insert(&mut self, ticker: impl Into<String>, rows: Vec<RawPriceRow>) {
        self.table.insert(ticker.into(), rows);
    }

    pub fn with_series(mut self, ticker: impl Into<String>, rows: Vec<RawPriceRow>) -> Self {
        self.insert(ticker, rows);
        self
    }
}

impl PriceSource for MemoryPriceSource {
    fn fetch_daily_prices(
        &self,
        tickers: &BTreeSet<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawPriceTable> {
        let mut out = RawPriceTable::new();
        for ticker in tickers {
            if let Some(rows) = self.table.get(ticker) {
                let clipped = clip_rows(rows, start, end);
                if !clipped.is_empty() {
                    out.insert(ticker.clone(), clipped);
                }
            }
        }
        Ok(out)
    }
}
