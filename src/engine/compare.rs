//! Portfolio comparison over one analysis window
//!
//! Every portfolio and the benchmark are valued against the same normalized
//! price table, fetched once for the union of their tickers. A portfolio whose
//! valuation fails aborts the whole comparison; partial reports are never
//! produced.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use super::flatten::{flatten, PortfolioValueSeries};
use super::normalize::{normalize, PriceTable};
use super::returns::{period_returns, ReturnRecord};
use super::summary::{self, summarize_holding, HoldingSummary, PortfolioAggregate};
use super::valuation::{value_portfolio, HoldingValuation};
use crate::config::AnalysisWindow;
use crate::error::EngineResult;
use crate::holdings::Portfolio;
use crate::pricing::PriceSource;

/// Everything computed for one portfolio
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioEvaluation {
    pub portfolio_id: String,
    pub name: String,
    pub valuations: Vec<HoldingValuation>,
    pub series: PortfolioValueSeries,
    pub returns: Vec<ReturnRecord>,
    pub holdings: Vec<HoldingSummary>,
    pub aggregate: PortfolioAggregate,
}

impl PortfolioEvaluation {
    pub fn return_for(&self, period: &str) -> Option<Decimal> {
        self.returns
            .iter()
            .find(|r| r.period == period)
            .map(|r| r.return_fraction)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub window: AnalysisWindow,
    pub portfolios: Vec<PortfolioEvaluation>,
    pub benchmark: Option<PortfolioEvaluation>,
}

impl ComparisonReport {
    /// Portfolios followed by the benchmark, in input order
    pub fn evaluations(&self) -> impl Iterator<Item = &PortfolioEvaluation> {
        self.portfolios.iter().chain(self.benchmark.iter())
    }

    pub fn return_records(&self) -> Vec<&ReturnRecord> {
        self.evaluations().flat_map(|e| e.returns.iter()).collect()
    }

    pub fn aggregates(&self) -> Vec<&PortfolioAggregate> {
        self.evaluations().map(|e| &e.aggregate).collect()
    }

    pub fn holding_summaries(&self) -> Vec<&HoldingSummary> {
        self.evaluations().flat_map(|e| e.holdings.iter()).collect()
    }

    pub fn evaluation(&self, portfolio_id: &str) -> Option<&PortfolioEvaluation> {
        self.evaluations().find(|e| e.portfolio_id == portfolio_id)
    }
}

/// Check the window and every portfolio before any price is fetched
pub fn validate_inputs<'p>(
    window: &AnalysisWindow,
    portfolios: impl IntoIterator<Item = &'p Portfolio>,
) -> EngineResult<()> {
    window.validate()?;
    for portfolio in portfolios {
        portfolio.validate()?;
    }
    Ok(())
}

/// Runs the valuation pipeline for a set of portfolios against one price source
pub struct Comparator<'a, S: PriceSource + ?Sized> {
    source: &'a S,
    window: &'a AnalysisWindow,
}

impl<'a, S: PriceSource + ?Sized> Comparator<'a, S> {
    pub fn new(source: &'a S, window: &'a AnalysisWindow) -> Self {
        Self { source, window }
    }

    pub fn window(&self) -> &AnalysisWindow {
        self.window
    }

    /// Value a single portfolio on its own
    pub fn evaluate(&self, portfolio: &Portfolio) -> EngineResult<PortfolioEvaluation> {
        validate_inputs(self.window, [portfolio])?;
        let table = normalize(self.source, &portfolio.tickers(), self.window)?;
        self.evaluate_with(&table, portfolio)
    }

    /// Compare portfolios and an optional benchmark over the window.
    ///
    /// Holdings are validated before any price is fetched.
    pub fn compare(
        &self,
        portfolios: &[Portfolio],
        benchmark: Option<&Portfolio>,
    ) -> EngineResult<ComparisonReport> {
        validate_inputs(self.window, portfolios.iter().chain(benchmark))?;

        let tickers: Vec<String> = portfolios
            .iter()
            .chain(benchmark)
            .flat_map(|p| p.tickers())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        info!(
            "Comparing {} portfolio(s){} across {} ticker(s)",
            portfolios.len(),
            if benchmark.is_some() { " and a benchmark" } else { "" },
            tickers.len()
        );

        let table = normalize(self.source, &tickers, self.window)?;

        let evaluated = portfolios
            .iter()
            .map(|p| self.evaluate_with(&table, p))
            .collect::<EngineResult<Vec<_>>>()?;

        let benchmark = benchmark
            .map(|b| self.evaluate_with(&table, b))
            .transpose()?;

        Ok(ComparisonReport {
            window: self.window.clone(),
            portfolios: evaluated,
            benchmark,
        })
    }

    fn evaluate_with(
        &self,
        table: &PriceTable,
        portfolio: &Portfolio,
    ) -> EngineResult<PortfolioEvaluation> {
        let window = self.window;

        let valuations = value_portfolio(table, portfolio, window.purchase_date)?;
        let series = flatten(&valuations)?;
        let returns = period_returns(&series, &portfolio.id, &window.periods)?;

        let holdings = portfolio
            .holdings
            .iter()
            .zip(&valuations)
            .map(|(holding, valuation)| {
                summarize_holding(&portfolio.id, holding, valuation, window)
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let aggregate = summary::aggregate(&portfolio.id, &portfolio.name, window, &holdings);

        debug!(
            "{}: {} holdings, actual return {}",
            portfolio.id,
            holdings.len(),
            aggregate.actual_return.round_dp(2)
        );

        Ok(PortfolioEvaluation {
            portfolio_id: portfolio.id.clone(),
            name: portfolio.name.clone(),
            valuations,
            series,
            returns,
            holdings,
            aggregate,
        })
    }
}
