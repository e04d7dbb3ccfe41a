//! Analysis window and application configuration
//!
//! The observation window (purchase date, sell date and comparison periods)
//! is an explicit immutable value handed to the engine. The application
//! config adds where holdings and price files live and which benchmark to use;
//! it is read from a TOML file.

use anyhow::{anyhow, Context};
use chrono::{Days, NaiveDate};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{EngineError, EngineResult, Result};
use crate::holdings::{load_holdings, Portfolio};

/// Days fetched before the purchase date so a non-trading purchase day can
/// take the prior close.
pub const DEFAULT_LOOKBACK_DAYS: u64 = 7;

/// Expected annual returns are compared against a quarter of a year.
pub const DEFAULT_PERIODS_PER_YEAR: u32 = 4;

/// A labelled closed date interval `[start, end]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }
}

/// The shared purchase/sell window and its comparison periods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub purchase_date: NaiveDate,
    pub sell_date: NaiveDate,
    pub periods: Vec<Period>,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u64,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,
}

fn default_lookback_days() -> u64 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_periods_per_year() -> u32 {
    DEFAULT_PERIODS_PER_YEAR
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    // Only called with literal calendar dates below
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

impl AnalysisWindow {
    /// Build and validate a window
    pub fn new(
        purchase_date: NaiveDate,
        sell_date: NaiveDate,
        periods: Vec<Period>,
    ) -> EngineResult<Self> {
        let window = Self {
            purchase_date,
            sell_date,
            periods,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        };
        window.validate()?;
        Ok(window)
    }

    /// The August–November 2023 window the sentiment portfolios were built for.
    ///
    /// Period 2 ends and period 3 starts on 2023-10-21.
    pub fn fall_2023() -> Self {
        Self {
            purchase_date: ymd(2023, 8, 21),
            sell_date: ymd(2023, 11, 20),
            periods: vec![
                Period::new("month 1", ymd(2023, 8, 22), ymd(2023, 9, 21)),
                Period::new("month 2", ymd(2023, 9, 22), ymd(2023, 10, 21)),
                Period::new("month 3", ymd(2023, 10, 21), ymd(2023, 11, 18)),
            ],
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }

    /// First day requested from the price source
    pub fn fetch_start(&self) -> NaiveDate {
        self.purchase_date
            .checked_sub_days(Days::new(self.lookback_days))
            .unwrap_or(self.purchase_date)
    }

    /// Check ordering and containment of the window and its periods.
    ///
    /// Adjacent periods may share one boundary date; overlapping interiors
    /// are rejected. Labels key the returns tables and must be unique.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |reason: String| Err(EngineError::InvalidWindow { reason });

        if self.purchase_date >= self.sell_date {
            return invalid(format!(
                "purchase date {} must be before sell date {}",
                self.purchase_date, self.sell_date
            ));
        }
        if self.periods.is_empty() {
            return invalid("at least one period is required".to_string());
        }
        if self.periods_per_year == 0 {
            return invalid("periods_per_year must be positive".to_string());
        }

        let duplicates: Vec<&str> = self
            .periods
            .iter()
            .map(|p| p.label.as_str())
            .duplicates()
            .collect();
        if !duplicates.is_empty() {
            return invalid(format!("duplicate period label(s): {}", duplicates.join(", ")));
        }

        let mut previous: Option<&Period> = None;
        for period in &self.periods {
            if period.start > period.end {
                return invalid(format!(
                    "period '{}' starts {} after it ends {}",
                    period.label, period.start, period.end
                ));
            }
            if period.start < self.purchase_date || period.end > self.sell_date {
                return invalid(format!(
                    "period '{}' [{}, {}] lies outside [{}, {}]",
                    period.label, period.start, period.end, self.purchase_date, self.sell_date
                ));
            }
            if let Some(prev) = previous {
                if period.start < prev.end {
                    return invalid(format!(
                        "period '{}' overlaps '{}' ({} < {})",
                        period.label, prev.label, period.start, prev.end
                    ));
                }
            }
            previous = Some(period);
        }

        Ok(())
    }

    /// Every calendar day of the window, purchase through sell inclusive
    pub fn calendar(&self) -> Vec<NaiveDate> {
        self.purchase_date
            .iter_days()
            .take_while(|d| *d <= self.sell_date)
            .collect()
    }
}

impl Default for AnalysisWindow {
    fn default() -> Self {
        Self::fall_2023()
    }
}

/// One portfolio entry in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioEntry {
    pub id: String,
    pub name: Option<String>,
    pub holdings: PathBuf,
}

/// Benchmark definition: representative equal amounts per ticker
#[derive(Debug, Clone, Deserialize)]
pub struct BenchmarkEntry {
    #[serde(default = "default_benchmark_id")]
    pub id: String,
    pub name: Option<String>,
    pub tickers: Vec<String>,
    #[serde(default = "default_benchmark_amount")]
    pub amount: Decimal,
}

fn default_benchmark_id() -> String {
    "benchmark".to_string()
}

fn default_benchmark_amount() -> Decimal {
    Decimal::from(100_000)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PricesEntry {
    pub dir: Option<PathBuf>,
}

/// Contents of `folio.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub window: AnalysisWindow,
    #[serde(default)]
    pub prices: PricesEntry,
    pub benchmark: Option<BenchmarkEntry>,
    #[serde(default)]
    pub portfolios: Vec<PortfolioEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: AnalysisWindow::fall_2023(),
            prices: PricesEntry::default(),
            benchmark: None,
            portfolios: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Parse a config from TOML text; relative paths resolve against `base_dir`
    pub fn from_toml_str(content: &str, base_dir: &Path) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(content).context("Failed to parse config")?;
        config.window.validate()?;

        for entry in &mut config.portfolios {
            if entry.holdings.is_relative() {
                entry.holdings = base_dir.join(&entry.holdings);
            }
        }
        if let Some(dir) = config.prices.dir.as_mut() {
            if dir.is_relative() {
                *dir = base_dir.join(&*dir);
            }
        }

        Ok(config)
    }

    /// Load a config file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("No config file given, using the fall 2023 window");
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&content, base_dir)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Directory holding `<TICKER>.csv` price files
    pub fn prices_dir(&self) -> Result<PathBuf> {
        match &self.prices.dir {
            Some(dir) => Ok(dir.clone()),
            None => default_prices_dir(),
        }
    }

    /// Every ticker referenced by the benchmark
    pub fn benchmark_tickers(&self) -> Vec<String> {
        self.benchmark
            .as_ref()
            .map(|b| b.tickers.clone())
            .unwrap_or_default()
    }

    /// Read every configured holdings file, in config order
    pub fn load_portfolios(&self) -> Result<Vec<Portfolio>> {
        self.portfolios
            .iter()
            .map(|entry| {
                let portfolio = load_holdings(&entry.holdings, &entry.id)?;
                Ok(match &entry.name {
                    Some(name) => portfolio.with_name(name.clone()),
                    None => portfolio,
                })
            })
            .collect()
    }

    pub fn benchmark_portfolio(&self) -> Option<Portfolio> {
        self.benchmark.as_ref().map(|b| {
            let portfolio = Portfolio::benchmark(b.id.clone(), &b.tickers, b.amount);
            match &b.name {
                Some(name) => portfolio.with_name(name.clone()),
                None => portfolio,
            }
        })
    }
}

/// `$XDG_CACHE_HOME/folio/prices`, falling back to the platform cache dir
pub fn default_prices_dir() -> Result<PathBuf> {
    let cache_dir = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(dir_spec::cache_home)
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    Ok(cache_dir.join("folio").join("prices"))
}

/// Network access is disabled when `FOLIO_OFFLINE` is set to anything but `0`
pub fn is_offline() -> bool {
    std::env::var("FOLIO_OFFLINE")
        .map(|v| v != "0")
        .unwrap_or(false)
}
