use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Buy-and-hold portfolio valuation and comparison")]
#[command(
    long_about = "Value simulated equity portfolios from daily closing prices and compare their period returns against each other and a benchmark index."
)]
pub struct Cli {
    /// Path to folio.toml (defaults to the fall 2023 window with no portfolios)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare the configured portfolios and benchmark over the window
    Compare {
        /// Download prices again even when cached files exist
        #[arg(long)]
        refresh: bool,

        /// Write returns, aggregate and holding tables as CSV into this directory
        #[arg(long, value_name = "DIR")]
        export: Option<PathBuf>,
    },

    /// Value a single holdings file over the window
    Value {
        /// Path to the holdings CSV file
        holdings: PathBuf,

        /// Portfolio id used in the output
        #[arg(long, default_value = "portfolio")]
        id: String,
    },

    /// Download daily prices into the price directory
    Fetch {
        /// Tickers to download (defaults to every configured ticker)
        tickers: Vec<String>,
    },

    /// Show the effective analysis window
    Window,
}
