use anyhow::{anyhow, Context, Result};
use chrono::{Days, NaiveDate};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::{clip_rows, PriceSource, RawPriceRow, RawPriceTable};

/// Directory of `<TICKER>.csv` daily price files.
///
/// Files use the Yahoo download layout (`Date,Open,High,Low,Close,Volume`,
/// optionally with `Adj Close`). A missing file means "no data".
#[derive(Debug, Clone)]
pub struct CsvPriceStore {
    dir: PathBuf,
}

#[derive(Debug)]
struct PriceColumns {
    date: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: Option<usize>,
}

fn find_columns(headers: &StringRecord) -> Result<PriceColumns> {
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    Ok(PriceColumns {
        date: position("date").ok_or_else(|| anyhow!("Date column not found"))?,
        open: position("open"),
        high: position("high"),
        low: position("low"),
        close: position("close")
            .or_else(|| position("adj close"))
            .ok_or_else(|| anyhow!("Close column not found"))?,
        volume: position("volume"),
    })
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("nan") {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    // Yahoo exports sometimes carry a time and offset after the date
    let day = raw.trim().get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").with_context(|| format!("Invalid date: {}", raw))
}

fn parse_row(record: &StringRecord, columns: &PriceColumns) -> Result<Option<RawPriceRow>> {
    let date = parse_date(record.get(columns.date).unwrap_or(""))?;
    let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).and_then(parse_decimal);

    let Some(close) = field(Some(columns.close)) else {
        return Ok(None);
    };

    let volume = columns
        .volume
        .and_then(|i| record.get(i))
        .and_then(parse_decimal)
        .and_then(|v| v.trunc().to_i64());

    Ok(Some(RawPriceRow {
        date,
        open: field(columns.open),
        high: field(columns.high),
        low: field(columns.low),
        close,
        volume,
    }))
}

/// Read price rows from any CSV reader, sorted by date
pub fn read_price_rows<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<RawPriceRow>> {
    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    let columns = find_columns(&headers)?;
    debug!("Price column mapping: {:?}", columns);

    let mut by_date = BTreeMap::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.context("Failed to read CSV record")?;
        match parse_row(&record, &columns) {
            Ok(Some(row)) => {
                by_date.insert(row.date, row);
            }
            Ok(None) => debug!("Row {} has no close, skipping", idx + 2),
            Err(e) => warn!("Skipping row {}: {}", idx + 2, e),
        }
    }

    Ok(by_date.into_values().collect())
}

impl CsvPriceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        let file_name: String = ticker
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.csv", file_name))
    }

    /// All rows stored for a ticker, or `None` when no file exists
    pub fn read_ticker(&self, ticker: &str) -> Result<Option<Vec<RawPriceRow>>> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Ok(None);
        }

        let reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("Failed to open price file {}", path.display()))?;
        let rows = read_price_rows(reader)
            .with_context(|| format!("Failed to read price file {}", path.display()))?;
        Ok(Some(rows))
    }

    /// Merge rows into the ticker's file; fetched rows replace stored rows on the same date
    pub fn write_ticker(&self, ticker: &str, rows: &[RawPriceRow]) -> Result<usize> {
        fs::create_dir_all(&self.dir).context("Failed to create price directory")?;

        let mut merged: BTreeMap<NaiveDate, RawPriceRow> = self
            .read_ticker(ticker)?
            .unwrap_or_default()
            .into_iter()
            .map(|r| (r.date, r))
            .collect();
        for row in rows {
            merged.insert(row.date, row.clone());
        }

        let path = self.path_for(ticker);
        let tmp_path = path.with_extension("csv.tmp");
        {
            let mut writer = WriterBuilder::new()
                .from_path(&tmp_path)
                .context("Failed to create price file")?;
            writer.write_record(["Date", "Open", "High", "Low", "Close", "Volume"])?;

            let opt = |v: Option<Decimal>| v.map(|d| d.to_string()).unwrap_or_default();
            for row in merged.values() {
                writer.write_record([
                    row.date.format("%Y-%m-%d").to_string(),
                    opt(row.open),
                    opt(row.high),
                    opt(row.low),
                    row.close.to_string(),
                    row.volume.map(|v| v.to_string()).unwrap_or_default(),
                ])?;
            }
            writer.flush().context("Failed to write price file")?;
        }
        fs::rename(&tmp_path, &path).context("Failed to finalize price file")?;

        info!("Stored {} rows for {} in {}", merged.len(), ticker, path.display());
        Ok(merged.len())
    }
}

/// Largest gap allowed between a range edge and the nearest stored row
/// before the cached file counts as partial. Covers weekends and holidays.
pub const EDGE_TOLERANCE_DAYS: u64 = 7;

impl CsvPriceStore {
    /// Tickers whose stored rows do not reach both ends of `[start, end]`
    pub fn missing_tickers(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<String>> {
        let tolerance = Days::new(EDGE_TOLERANCE_DAYS);
        let latest_first = start.checked_add_days(tolerance).unwrap_or(start);
        let earliest_last = end.checked_sub_days(tolerance).unwrap_or(end);

        let mut missing = Vec::new();
        for ticker in tickers {
            let rows = self.read_ticker(ticker)?.unwrap_or_default();
            let clipped = clip_rows(&rows, start, end);
            let covered = match (clipped.first(), clipped.last()) {
                (Some(first), Some(last)) => {
                    first.date <= latest_first && last.date >= earliest_last
                }
                _ => false,
            };
            if !covered {
                if !clipped.is_empty() {
                    debug!(
                        "Cached prices for {} only partly cover {} to {}",
                        ticker, start, end
                    );
                }
                missing.push(ticker.clone());
            }
        }
        Ok(missing)
    }
}

impl PriceSource for CsvPriceStore {
    fn fetch_daily_prices(
        &self,
        tickers: &BTreeSet<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawPriceTable> {
        let mut table = RawPriceTable::new();
        for ticker in tickers {
            let Some(rows) = self.read_ticker(ticker)? else {
                debug!("No price file for {}", ticker);
                continue;
            };
            let clipped = clip_rows(&rows, start, end);
            if !clipped.is_empty() {
                table.insert(ticker.clone(), clipped);
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_read_yahoo_layout() {
        let csv = "Date,Open,High,Low,Close,Adj Close,Volume\n\
                   2023-08-22,50,51,49,50.5,50.1,1000\n\
                   2023-08-21,49,50,48,50,49.6,900\n\
                   2023-08-23,null,null,null,null,null,0\n";
        let reader = ReaderBuilder::new().from_reader(csv.as_bytes());
        let rows = read_price_rows(reader).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, d("2023-08-21"));
        assert_eq!(rows[0].close, dec!(50));
        assert_eq!(rows[1].open, Some(dec!(50)));
        assert_eq!(rows[1].volume, Some(1000));
    }

    #[test]
    fn test_missing_tickers() {
        let dir = TempDir::new().unwrap();
        let store = CsvPriceStore::new(dir.path());
        store
            .write_ticker("OLD", &[RawPriceRow::close_only(d("2020-01-02"), dec!(1))])
            .unwrap();
        store
            .write_ticker(
                "FULL",
                &[
                    RawPriceRow::close_only(d("2023-08-18"), dec!(1)),
                    RawPriceRow::close_only(d("2023-10-02"), dec!(2)),
                    RawPriceRow::close_only(d("2023-11-17"), dec!(3)),
                ],
            )
            .unwrap();

        let tickers: Vec<String> = ["OLD", "FULL", "NONE"].iter().map(|s| s.to_string()).collect();
        let missing = store
            .missing_tickers(&tickers, d("2023-08-14"), d("2023-11-20"))
            .unwrap();
        assert_eq!(missing, vec!["OLD", "NONE"]);
    }

    #[test]
    fn test_partial_cache_is_refetched() {
        let dir = TempDir::new().unwrap();
        let store = CsvPriceStore::new(dir.path());
        // One row at the purchase date only
        store
            .write_ticker("HEAD", &[RawPriceRow::close_only(d("2023-08-21"), dec!(50))])
            .unwrap();
        // Rows that start well after the purchase date
        store
            .write_ticker(
                "TAIL",
                &[
                    RawPriceRow::close_only(d("2023-10-02"), dec!(50)),
                    RawPriceRow::close_only(d("2023-11-20"), dec!(55)),
                ],
            )
            .unwrap();

        let tickers = vec!["HEAD".to_string(), "TAIL".to_string()];
        let missing = store
            .missing_tickers(&tickers, d("2023-08-14"), d("2023-11-20"))
            .unwrap();
        assert_eq!(missing, tickers);
    }

    #[test]
    fn test_read_close_only_file() {
        let csv = "date,close\n2023-08-21 00:00:00-04:00,10.25\n";
        let reader = ReaderBuilder::new().from_reader(csv.as_bytes());
        let rows = read_price_rows(reader).unwrap();
        assert_eq!(rows, vec![RawPriceRow::close_only(d("2023-08-21"), dec!(10.25))]);
    }

    #[test]
    fn test_missing_close_column_is_an_error() {
        let csv = "Date,Open\n2023-08-21,1\n";
        let reader = ReaderBuilder::new().from_reader(csv.as_bytes());
        assert!(read_price_rows(reader).is_err());
    }

    #[test]
    fn test_write_then_fetch_merges_rows() {
        let dir = TempDir::new().unwrap();
        let store = CsvPriceStore::new(dir.path());

        store
            .write_ticker("ABC", &[RawPriceRow::close_only(d("2023-08-21"), dec!(50))])
            .unwrap();
        let count = store
            .write_ticker(
                "ABC",
                &[
                    RawPriceRow::close_only(d("2023-08-21"), dec!(51)),
                    RawPriceRow::close_only(d("2023-08-22"), dec!(52)),
                ],
            )
            .unwrap();
        assert_eq!(count, 2);

        let tickers: BTreeSet<String> = ["ABC".to_string(), "MISSING".to_string()].into();
        let table = store
            .fetch_daily_prices(&tickers, d("2023-08-22"), d("2023-08-31"))
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table["ABC"], vec![RawPriceRow::close_only(d("2023-08-22"), dec!(52))]);

        let all = store.read_ticker("ABC").unwrap().unwrap();
        assert_eq!(all[0].close, dec!(51));
    }

    #[test]
    fn test_path_for_index_symbol() {
        let store = CsvPriceStore::new("/tmp/prices");
        assert_eq!(store.path_for("^GSPC"), PathBuf::from("/tmp/prices/^GSPC.csv"));
        assert_eq!(store.path_for("BRK/B"), PathBuf::from("/tmp/prices/BRK_B.csv"));
    }
}
