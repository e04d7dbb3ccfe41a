//! Value command dispatcher implementation

use anyhow::{Context, Result};
use std::path::Path;

use super::prices::prepare_store;
use crate::cli::formatters;
use folio::config::AppConfig;
use folio::engine::{validate_inputs, Comparator};
use folio::holdings::load_holdings;

pub async fn dispatch_value(
    config: &AppConfig,
    holdings_path: &Path,
    id: &str,
    json_output: bool,
) -> Result<()> {
    let portfolio = load_holdings(holdings_path, id)?;
    validate_inputs(&config.window, [&portfolio])
        .with_context(|| format!("Failed to value portfolio '{}'", id))?;
    let store = prepare_store(config, &portfolio.tickers(), false).await?;

    let evaluation = Comparator::new(&store, &config.window)
        .evaluate(&portfolio)
        .with_context(|| format!("Failed to value portfolio '{}'", id))?;

    if json_output {
        let payload = serde_json::json!({
            "portfolio": evaluation.portfolio_id,
            "series": evaluation.series.points(),
            "returns": evaluation.returns,
            "holdings": evaluation.holdings,
            "aggregate": evaluation.aggregate,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print!("{}", formatters::format_evaluation(&evaluation));
    }

    Ok(())
}
