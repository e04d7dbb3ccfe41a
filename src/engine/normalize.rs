//! Price table normalization
//!
//! Vendor rows only exist for trading days. Valuation needs a price for every
//! calendar day of the window, so each ticker goes through three phases:
//!
//! 1. [`reindex_calendar`] lays the rows onto one slot per calendar day,
//! 2. [`forward_fill`] carries each field's last known value forward,
//! 3. [`trim_undefined_prefix`] drops the leading days before the first trade.
//!
//! Leading days are dropped, never synthesized, so a series that starts late
//! simply starts late.

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::config::AnalysisWindow;
use crate::error::{EngineError, EngineResult};
use crate::pricing::{PriceSource, RawPriceRow};

/// One calendar day of a ticker's fields; `None` where nothing is known yet
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSlot {
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<i64>,
}

impl PriceSlot {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
        }
    }

    fn from_row(row: &RawPriceRow) -> Self {
        Self {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: Some(row.close),
            volume: row.volume,
        }
    }
}

/// One calendar day of an aligned series; the close is always defined
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedPriceRow {
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Decimal,
    pub volume: Option<i64>,
}

/// A ticker's prices for consecutive calendar days with no gaps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedPriceSeries {
    ticker: String,
    rows: Vec<AlignedPriceRow>,
}

impl AlignedPriceSeries {
    /// Series of closes on consecutive days starting at `start`
    pub fn from_closes(ticker: impl Into<String>, start: NaiveDate, closes: &[Decimal]) -> Self {
        let rows = start
            .iter_days()
            .zip(closes)
            .map(|(date, close)| AlignedPriceRow {
                date,
                open: None,
                high: None,
                low: None,
                close: *close,
                volume: None,
            })
            .collect();
        Self {
            ticker: ticker.into(),
            rows,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn rows(&self) -> &[AlignedPriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Row for a date; rows are consecutive days so this is an index lookup
    pub fn get(&self, date: NaiveDate) -> Option<&AlignedPriceRow> {
        let first = self.first_date()?;
        let offset = usize::try_from((date - first).num_days()).ok()?;
        self.rows.get(offset)
    }

    pub fn close_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.get(date).map(|r| r.close)
    }

    /// Keep only rows inside `[start, end]`
    pub fn clip(self, start: NaiveDate, end: NaiveDate) -> Self {
        let rows = self
            .rows
            .into_iter()
            .filter(|r| start <= r.date && r.date <= end)
            .collect();
        Self {
            ticker: self.ticker,
            rows,
        }
    }
}

/// Aligned series keyed by ticker.
///
/// The shape is the same whether one or many tickers were requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceTable {
    series: BTreeMap<String, AlignedPriceSeries>,
}

impl PriceTable {
    pub fn insert(&mut self, series: AlignedPriceSeries) {
        self.series.insert(series.ticker.clone(), series);
    }

    pub fn get(&self, ticker: &str) -> Option<&AlignedPriceSeries> {
        self.series.get(ticker)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.series.contains_key(ticker)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl FromIterator<AlignedPriceSeries> for PriceTable {
    fn from_iter<I: IntoIterator<Item = AlignedPriceSeries>>(iter: I) -> Self {
        let mut table = PriceTable::default();
        for series in iter {
            table.insert(series);
        }
        table
    }
}

/// Phase 1: one slot per calendar day in `[start, end]`, vendor rows placed on their dates
pub fn reindex_calendar(rows: &[RawPriceRow], start: NaiveDate, end: NaiveDate) -> Vec<PriceSlot> {
    let by_date: BTreeMap<NaiveDate, &RawPriceRow> = rows.iter().map(|r| (r.date, r)).collect();

    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| match by_date.get(&date) {
            Some(row) => PriceSlot::from_row(row),
            None => PriceSlot::empty(date),
        })
        .collect()
}

/// Phase 2: every field takes its most recent prior value where missing
pub fn forward_fill(slots: Vec<PriceSlot>) -> Vec<PriceSlot> {
    let mut last = PriceSlot::empty(NaiveDate::MIN);

    slots
        .into_iter()
        .map(|slot| {
            let filled = PriceSlot {
                date: slot.date,
                open: slot.open.or(last.open),
                high: slot.high.or(last.high),
                low: slot.low.or(last.low),
                close: slot.close.or(last.close),
                volume: slot.volume.or(last.volume),
            };
            last = filled.clone();
            filled
        })
        .collect()
}

/// Phase 3: drop leading slots with no close.
///
/// The series ends at the first gap after that, so an unfilled input can only
/// shorten the result, never leave a hole in it.
pub fn trim_undefined_prefix(ticker: &str, slots: Vec<PriceSlot>) -> AlignedPriceSeries {
    let rows = slots
        .into_iter()
        .skip_while(|s| s.close.is_none())
        .map_while(|s| {
            s.close.map(|close| AlignedPriceRow {
                date: s.date,
                open: s.open,
                high: s.high,
                low: s.low,
                close,
                volume: s.volume,
            })
        })
        .collect();

    AlignedPriceSeries {
        ticker: ticker.to_string(),
        rows,
    }
}

/// Align one ticker's vendor rows over `[fetch_start, end]`, then clip to `[start, end]`
pub fn align_series(
    ticker: &str,
    rows: &[RawPriceRow],
    fetch_start: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
) -> AlignedPriceSeries {
    let slots = reindex_calendar(rows, fetch_start, end);
    let filled = forward_fill(slots);
    trim_undefined_prefix(ticker, filled).clip(start, end)
}

/// Portfolio id reported for a bad ticker list passed straight to [`normalize`]
const REQUEST_ID: &str = "ticker request";

fn check_tickers(tickers: &[String]) -> EngineResult<BTreeSet<String>> {
    if tickers.is_empty() {
        return Err(EngineError::MalformedHoldings {
            portfolio: REQUEST_ID.to_string(),
            reason: "no tickers requested".to_string(),
        });
    }
    let duplicates: Vec<&String> = tickers.iter().duplicates().collect();
    if !duplicates.is_empty() {
        return Err(EngineError::MalformedHoldings {
            portfolio: REQUEST_ID.to_string(),
            reason: format!("duplicate ticker(s): {}", duplicates.iter().join(", ")),
        });
    }
    Ok(tickers.iter().cloned().collect())
}

/// Fetch and align every requested ticker over the analysis window.
///
/// Tickers with no data anywhere in range are absent from the returned table;
/// valuation reports them.
pub fn normalize<S: PriceSource + ?Sized>(
    source: &S,
    tickers: &[String],
    window: &AnalysisWindow,
) -> EngineResult<PriceTable> {
    if window.purchase_date >= window.sell_date {
        return Err(EngineError::InvalidWindow {
            reason: format!(
                "purchase date {} must be before sell date {}",
                window.purchase_date, window.sell_date
            ),
        });
    }
    let requested = check_tickers(tickers)?;

    let fetch_start = window.fetch_start();
    info!(
        "Normalizing {} tickers over {}..{} (fetching from {})",
        requested.len(),
        window.purchase_date,
        window.sell_date,
        fetch_start
    );

    let raw = source
        .fetch_daily_prices(&requested, fetch_start, window.sell_date)
        .map_err(|source| EngineError::PriceFetch { source })?;

    let mut table = PriceTable::default();
    for ticker in &requested {
        let Some(rows) = raw.get(ticker) else {
            warn!("No price rows for {}", ticker);
            continue;
        };

        let series = align_series(
            ticker,
            rows,
            fetch_start,
            window.purchase_date,
            window.sell_date,
        );
        if series.is_empty() {
            warn!("{} has no defined price inside the window", ticker);
            continue;
        }

        debug!(
            "{}: {} vendor rows aligned to {} days from {:?}",
            ticker,
            rows.len(),
            series.len(),
            series.first_date()
        );
        table.insert(series);
    }

    Ok(table)
}
