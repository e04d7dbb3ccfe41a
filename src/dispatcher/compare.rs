//! Compare command dispatcher implementation

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use super::prices::prepare_store;
use crate::cli::formatters;
use folio::config::AppConfig;
use folio::engine::{validate_inputs, Comparator};
use folio::reports;

pub async fn dispatch_compare(
    config: &AppConfig,
    refresh: bool,
    export: Option<&Path>,
    json_output: bool,
) -> Result<()> {
    let portfolios = config.load_portfolios()?;
    if portfolios.is_empty() {
        if json_output {
            println!("{}", serde_json::json!({ "portfolios": [] }));
        } else {
            print!("{}", formatters::format_no_portfolios());
        }
        return Ok(());
    }
    let benchmark = config.benchmark_portfolio();
    validate_inputs(&config.window, portfolios.iter().chain(benchmark.as_ref()))
        .context("Comparison failed")?;

    let mut tickers: Vec<String> = portfolios.iter().flat_map(|p| p.tickers()).collect();
    tickers.extend(config.benchmark_tickers());
    tickers.sort();
    tickers.dedup();

    let store = prepare_store(config, &tickers, refresh).await?;

    let report = Comparator::new(&store, &config.window)
        .compare(&portfolios, benchmark.as_ref())
        .context("Comparison failed")?;

    if let Some(dir) = export {
        let written = reports::export_csv(&report, dir)?;
        if !json_output {
            for path in &written {
                println!("{} Wrote {}", "✓".green().bold(), path.display());
            }
        }
    }

    if json_output {
        let payload = serde_json::json!({
            "window": report.window,
            "returns": report.return_records(),
            "aggregates": report.aggregates(),
            "holdings": report.holding_summaries(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print!("{}", formatters::format_comparison(&report));
    }

    Ok(())
}
