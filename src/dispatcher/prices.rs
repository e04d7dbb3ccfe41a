//! Price download and cache preparation

use anyhow::{Context, Result};
use colored::Colorize;
use itertools::Itertools;
use tracing::{info, warn};

use folio::config::{is_offline, AppConfig};
use folio::pricing::{self, CsvPriceStore};

/// Open the configured price store, downloading missing tickers first unless offline
pub async fn prepare_store(
    config: &AppConfig,
    tickers: &[String],
    refresh: bool,
) -> Result<CsvPriceStore> {
    let store = CsvPriceStore::new(config.prices_dir()?);
    let window = &config.window;

    if is_offline() {
        info!("Offline mode: reading prices from {}", store.dir().display());
        return Ok(store);
    }

    let written = pricing::update_store(
        &store,
        tickers,
        window.fetch_start(),
        window.sell_date,
        refresh,
    )
    .await
    .context("Failed to update price store")?;

    if !written.is_empty() {
        info!("Downloaded prices for {}", written.iter().join(", "));
    }
    Ok(store)
}

/// Every ticker named by the configured portfolios and benchmark, deduplicated
fn configured_tickers(config: &AppConfig) -> Result<Vec<String>> {
    let mut tickers: Vec<String> = config
        .load_portfolios()?
        .iter()
        .flat_map(|p| p.tickers())
        .collect();
    tickers.extend(config.benchmark_tickers());
    Ok(tickers.into_iter().sorted().dedup().collect())
}

pub async fn dispatch_fetch(config: &AppConfig, tickers: Vec<String>, json_output: bool) -> Result<()> {
    let tickers = if tickers.is_empty() {
        configured_tickers(config)?
    } else {
        tickers.into_iter().map(|t| t.to_uppercase()).collect()
    };

    if tickers.is_empty() {
        warn!("No tickers given and none configured");
        if !json_output {
            println!("{} No tickers to fetch", "ℹ".blue().bold());
        }
        return Ok(());
    }

    if is_offline() {
        anyhow::bail!("FOLIO_OFFLINE is set; refusing to download prices");
    }

    let store = CsvPriceStore::new(config.prices_dir()?);
    let window = &config.window;
    let written = pricing::update_store(
        &store,
        &tickers,
        window.fetch_start(),
        window.sell_date,
        true,
    )
    .await?;
    let failed: Vec<&String> = tickers.iter().filter(|t| !written.contains(t)).collect();

    if json_output {
        let payload = serde_json::json!({
            "dir": store.dir(),
            "fetched": written,
            "failed": failed,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for ticker in &written {
            println!("{} {}", "✓".green().bold(), ticker);
        }
        for ticker in &failed {
            println!("{} {}", "✗".red().bold(), ticker);
        }
        println!(
            "\nStored {} of {} tickers in {}",
            written.len(),
            tickers.len(),
            store.dir().display()
        );
    }

    Ok(())
}
