use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{RawPriceRow, RawPriceTable};

/// Shared HTTP client so repeated downloads reuse connections.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("Mozilla/5.0 (compatible; FolioBot/1.0)")
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Yahoo Finance chart response
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<i64>>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

fn chart_url(ticker: &str, from: NaiveDate, to: NaiveDate) -> Result<String> {
    let from_timestamp = from
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid from date"))?
        .and_utc()
        .timestamp();

    let to_timestamp = to
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| anyhow!("Invalid to date"))?
        .and_utc()
        .timestamp();

    Ok(format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
        ticker, from_timestamp, to_timestamp
    ))
}

/// Turn a chart payload into daily rows.
///
/// Days where Yahoo reports no close (halts, holidays with placeholder
/// timestamps) are skipped rather than filled.
fn parse_chart(ticker: &str, data: YahooChartResponse) -> Result<Vec<RawPriceRow>> {
    if let Some(error) = data.chart.error {
        return Err(anyhow!(
            "Yahoo Finance API error for {}: {} - {}",
            ticker,
            error.code,
            error.description
        ));
    }

    let result = data
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| anyhow!("No data returned from Yahoo Finance for {}", ticker))?;

    // A range with no trading days comes back without timestamps
    let Some(timestamps) = result.timestamp else {
        return Ok(Vec::new());
    };

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No quote data"))?;

    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.ok_or_else(|| anyhow!("No close prices"))?;
    let volumes = quote.volume.unwrap_or_default();

    let field = |values: &[Option<f64>], i: usize| {
        values
            .get(i)
            .and_then(|&v| v)
            .and_then(Decimal::from_f64_retain)
    };

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| anyhow!("Invalid timestamp"))?
            .date_naive();

        let Some(close) = field(&closes, i) else {
            debug!("{}: no close on {}, skipping", ticker, date);
            continue;
        };

        rows.push(RawPriceRow {
            date,
            open: field(&opens, i),
            high: field(&highs, i),
            low: field(&lows, i),
            close,
            volume: volumes.get(i).and_then(|&v| v),
        });
    }

    Ok(rows)
}

/// Fetch daily history for one ticker from Yahoo Finance
///
/// # Arguments
/// * `ticker` - Yahoo symbol (e.g. `AAPL`, `^GSPC`)
/// * `from` - Start date
/// * `to` - End date
pub async fn fetch_historical_prices(
    ticker: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<RawPriceRow>> {
    info!("Fetching historical prices for {} from {} to {}", ticker, from, to);

    let url = chart_url(ticker, from, to)?;
    let response = HTTP_CLIENT
        .get(&url)
        .send()
        .await
        .context("Failed to send request to Yahoo Finance")?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Yahoo Finance returned error status for {}: {}",
            ticker,
            response.status()
        ));
    }

    let data: YahooChartResponse = response
        .json()
        .await
        .context("Failed to parse Yahoo Finance response")?;

    let rows = parse_chart(ticker, data)?;
    debug!("Fetched {} historical prices for {}", rows.len(), ticker);
    Ok(rows)
}

/// Fetch several tickers one after another.
///
/// Tickers that fail are logged and left out of the table, the same way a
/// vendor omits symbols it has no data for.
pub async fn fetch_daily_prices(
    tickers: &[String],
    from: NaiveDate,
    to: NaiveDate,
) -> RawPriceTable {
    let mut table = RawPriceTable::new();
    for ticker in tickers {
        match fetch_historical_prices(ticker, from, to).await {
            Ok(rows) if !rows.is_empty() => {
                table.insert(ticker.clone(), rows);
            }
            Ok(_) => warn!("Yahoo Finance has no rows for {} in range", ticker),
            Err(e) => warn!("Skipping {}: {:#}", ticker, e),
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn should_skip_online_tests() -> bool {
        std::env::var("FOLIO_SKIP_ONLINE_TESTS")
            .map(|v| v != "0")
            .unwrap_or(false)
    }

    #[test]
    fn test_parse_chart_skips_missing_closes() {
        let json = r#"{
            "chart": {
                "result": [{
                    "meta": {"symbol": "ABC"},
                    "timestamp": [1692624600, 1692711000, 1692797400],
                    "indicators": {"quote": [{
                        "open": [50.0, null, 51.0],
                        "high": [51.0, null, 52.0],
                        "low": [49.5, null, 50.5],
                        "close": [50.5, null, 51.5],
                        "volume": [1000, null, 1200]
                    }]}
                }],
                "error": null
            }
        }"#;
        let data: YahooChartResponse = serde_json::from_str(json).unwrap();
        let rows = parse_chart("ABC", data).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2023, 8, 21).unwrap());
        assert_eq!(rows[0].close, Decimal::from_f64_retain(50.5).unwrap());
        assert_eq!(rows[1].volume, Some(1200));
    }

    #[test]
    fn test_parse_chart_reports_api_error() {
        let json = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let data: YahooChartResponse = serde_json::from_str(json).unwrap();
        let err = parse_chart("GONE", data).unwrap_err();
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_chart_url_covers_whole_days() {
        let from = NaiveDate::from_ymd_opt(2023, 8, 14).unwrap();
        let to = NaiveDate::from_ymd_opt(2023, 11, 20).unwrap();
        let url = chart_url("^GSPC", from, to).unwrap();
        assert!(url.contains("/chart/^GSPC?"));
        assert!(url.contains("period1=1691971200"));
        assert!(url.ends_with("interval=1d"));
    }

    #[tokio::test]
    async fn test_fetch_historical_prices() {
        if should_skip_online_tests() {
            return;
        }

        let from = NaiveDate::from_ymd_opt(2023, 8, 21).unwrap();
        let to = NaiveDate::from_ymd_opt(2023, 9, 21).unwrap();

        let result = fetch_historical_prices("AAPL", from, to).await;
        if let Err(e) = &result {
            eprintln!("Skipping Yahoo historical prices test: {}", e);
            return;
        }
        let prices = result.unwrap();

        assert!(!prices.is_empty());
        println!("Fetched {} historical prices", prices.len());
    }
}
