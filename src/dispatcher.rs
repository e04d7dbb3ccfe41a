//! Command dispatcher that routes parsed CLI commands to their handlers.

mod compare;
mod prices;
mod value;

use anyhow::Result;
use tracing::debug;

use crate::cli::{formatters, Cli, Commands};
use folio::config::AppConfig;

/// Route a parsed command line to its handler
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    debug!(
        "Window {}..{} with {} period(s)",
        config.window.purchase_date,
        config.window.sell_date,
        config.window.periods.len()
    );

    match cli.command {
        Commands::Compare { refresh, export } => {
            compare::dispatch_compare(&config, refresh, export.as_deref(), cli.json).await
        }
        Commands::Value { holdings, id } => {
            value::dispatch_value(&config, &holdings, &id, cli.json).await
        }
        Commands::Fetch { tickers } => prices::dispatch_fetch(&config, tickers, cli.json).await,
        Commands::Window => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&config.window)?);
            } else {
                print!("{}", formatters::format_window(&config.window));
            }
            Ok(())
        }
    }
}
