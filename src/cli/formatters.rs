//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of valuation from presentation.

use colored::Colorize;
use rust_decimal::Decimal;
use tabled::{
    builder::Builder,
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use folio::config::AnalysisWindow;
use folio::engine::{ComparisonReport, HoldingSummary, PortfolioAggregate, PortfolioEvaluation};
use folio::reports::{best_portfolio, ReturnsMatrix};
use folio::utils::{format_currency, format_percent, format_percent_signed};

fn colored_percent(fraction: Decimal) -> String {
    let text = format_percent(fraction);
    if fraction >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

fn colored_currency(value: Decimal) -> String {
    let text = format_currency(value);
    if value >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

/// Format the analysis window and its periods
pub fn format_window(window: &AnalysisWindow) -> String {
    let mut output = format!("\n{} Analysis Window\n\n", "📅".cyan().bold());
    output.push_str(&format!("{:<16} {}\n", "Purchase:".bold(), window.purchase_date));
    output.push_str(&format!("{:<16} {}\n", "Sell:".bold(), window.sell_date));
    output.push_str(&format!(
        "{:<16} {} days before purchase\n\n",
        "Lookback:".bold(),
        window.lookback_days
    ));

    #[derive(Tabled)]
    struct PeriodRow {
        #[tabled(rename = "Period")]
        label: String,
        #[tabled(rename = "Start")]
        start: String,
        #[tabled(rename = "End")]
        end: String,
    }

    let rows: Vec<PeriodRow> = window
        .periods
        .iter()
        .map(|p| PeriodRow {
            label: p.label.clone(),
            start: p.start.to_string(),
            end: p.end.to_string(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    output.push_str(&table.to_string());
    output.push('\n');
    output
}

/// Period-by-portfolio returns, with the excess over the benchmark when present
pub fn format_returns_table(report: &ComparisonReport) -> String {
    let matrix = ReturnsMatrix::from_report(report);

    let mut builder = Builder::default();
    let mut header = vec!["Period".to_string(), "Start".to_string(), "End".to_string()];
    header.extend(matrix.portfolio_ids.iter().cloned());
    builder.push_record(header);

    for row in &matrix.rows {
        let excess = matrix.excess_over_benchmark(row);
        let mut record = vec![row.period.clone(), row.start.to_string(), row.end.to_string()];
        record.extend(row.returns.iter().zip(excess).map(|(r, ex)| match ex {
            Some(ex) => format!(
                "{} ({})",
                colored_percent(*r),
                format_percent_signed(ex).bright_black()
            ),
            None => colored_percent(*r),
        }));
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.modify(Columns::new(3..), Alignment::right());
    table.to_string()
}

/// One row per portfolio with period gains and the total return
pub fn format_aggregate_table(aggregates: &[&PortfolioAggregate]) -> String {
    let Some(first) = aggregates.first() else {
        return String::new();
    };

    let mut builder = Builder::default();
    let mut header = vec!["Portfolio".to_string(), "Invested".to_string()];
    header.extend(first.period_gains.iter().map(|(label, _)| format!("{} Gain", label)));
    header.push("Return".to_string());
    header.push("Return %".to_string());
    builder.push_record(header);

    for aggregate in aggregates {
        let mut record = vec![aggregate.name.clone(), format_currency(aggregate.invested)];
        record.extend(aggregate.period_gains.iter().map(|(_, g)| colored_currency(*g)));
        record.push(colored_currency(aggregate.actual_return));
        record.push(colored_percent(aggregate.actual_return_rate));
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());
    table.to_string()
}

/// Per-holding summary at the sell date
pub fn format_holdings_table(rows: &[&HoldingSummary]) -> String {
    #[derive(Tabled)]
    struct HoldingRow {
        #[tabled(rename = "Portfolio")]
        portfolio: String,
        #[tabled(rename = "Ticker")]
        ticker: String,
        #[tabled(rename = "Invested")]
        invested: String,
        #[tabled(rename = "Buy")]
        buy: String,
        #[tabled(rename = "Shares")]
        shares: String,
        #[tabled(rename = "Sell")]
        sell: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Return")]
        actual_return: String,
        #[tabled(rename = "Return %")]
        return_pct: String,
        #[tabled(rename = "Expected (adj)")]
        expected: String,
    }

    let table_rows: Vec<HoldingRow> = rows
        .iter()
        .map(|r| HoldingRow {
            portfolio: r.portfolio_id.clone(),
            ticker: r.ticker.clone(),
            invested: format_currency(r.invested_amount),
            buy: format!("{:.2}", r.purchase_price),
            shares: format!("{:.4}", r.shares),
            sell: format!("{:.2}", r.sell_price),
            value: format_currency(r.sell_value),
            actual_return: colored_currency(r.actual_return),
            return_pct: colored_percent(r.actual_return_rate),
            expected: r
                .adjusted_expected_return
                .map(format_percent)
                .unwrap_or_else(|| "N/A".to_string()),
        })
        .collect();

    let mut table = Table::new(&table_rows);
    table.with(Style::modern());
    // Right-align all columns except Portfolio (0) and Ticker (1)
    table.modify(Columns::new(2..), Alignment::right());
    table.to_string()
}

/// Full comparison: returns matrix, aggregates and holdings
pub fn format_comparison(report: &ComparisonReport) -> String {
    let mut output = format!(
        "\n{} Portfolio Comparison ({} → {})\n\n",
        "📈".cyan().bold(),
        report.window.purchase_date,
        report.window.sell_date
    );

    output.push_str(&format!("{}\n", "Period returns".bold()));
    output.push_str(&format_returns_table(report));

    output.push_str(&format!("\n\n{}\n", "Totals".bold()));
    output.push_str(&format_aggregate_table(&report.aggregates()));

    output.push_str(&format!("\n\n{}\n", "Holdings".bold()));
    output.push_str(&format_holdings_table(&report.holding_summaries()));

    if let Some((id, rate)) = best_portfolio(report) {
        output.push_str(&format!("\n\n{} Summary", "━".repeat(80).bright_black()));
        output.push_str(&format!(
            "\n{:<20} {} ({})",
            "Best portfolio:".bold(),
            id,
            colored_percent(rate)
        ));
        if let Some(benchmark) = &report.benchmark {
            output.push_str(&format!(
                "\n{:<20} {}",
                "Benchmark return:".bold(),
                colored_percent(benchmark.aggregate.actual_return_rate)
            ));
        }
        output.push('\n');
    }

    output
}

/// One portfolio's period returns and holdings
pub fn format_evaluation(evaluation: &PortfolioEvaluation) -> String {
    let mut output = format!(
        "\n{} {} ({} holdings)\n\n",
        "📊".cyan().bold(),
        evaluation.name,
        evaluation.holdings.len()
    );

    #[derive(Tabled)]
    struct ReturnRow {
        #[tabled(rename = "Period")]
        period: String,
        #[tabled(rename = "From")]
        start: String,
        #[tabled(rename = "To")]
        end: String,
        #[tabled(rename = "Start Value")]
        start_value: String,
        #[tabled(rename = "End Value")]
        end_value: String,
        #[tabled(rename = "Return")]
        return_pct: String,
    }

    let rows: Vec<ReturnRow> = evaluation
        .returns
        .iter()
        .map(|r| ReturnRow {
            period: r.period.clone(),
            start: r.start_date.to_string(),
            end: r.end_date.to_string(),
            start_value: format_currency(r.start_value),
            end_value: format_currency(r.end_value),
            return_pct: colored_percent(r.return_fraction),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(3..), Alignment::right());
    output.push_str(&table.to_string());

    output.push_str("\n\n");
    let holdings: Vec<&HoldingSummary> = evaluation.holdings.iter().collect();
    output.push_str(&format_holdings_table(&holdings));

    let aggregate = &evaluation.aggregate;
    output.push_str(&format!("\n\n{} Summary", "━".repeat(80).bright_black()));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Invested:".bold(),
        format_currency(aggregate.invested)
    ));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Total Return:".bold(),
        colored_currency(aggregate.actual_return)
    ));
    output.push_str(&format!(
        "\n{:<20} {}\n",
        "Return Rate:".bold(),
        colored_percent(aggregate.actual_return_rate)
    ));

    output
}

/// Message shown when the config names no portfolios
pub fn format_no_portfolios() -> String {
    format!(
        "{} No portfolios configured\nAdd [[portfolios]] entries to folio.toml or use: {} value <holdings.csv>\n",
        "ℹ".blue().bold(),
        "folio".bold()
    )
}
