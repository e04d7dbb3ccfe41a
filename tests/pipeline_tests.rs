//! End-to-end valuation pipeline over the fixture price files

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::Path;

use folio::config::{AnalysisWindow, AppConfig, Period};
use folio::engine::{normalize, Comparator, ComparisonReport};
use folio::error::EngineError;
use folio::holdings::{load_holdings, Holding, Portfolio};
use folio::pricing::CsvPriceStore;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn fixture_config() -> AppConfig {
    AppConfig::load(Some(Path::new("tests/fixtures/folio.toml"))).expect("fixture config")
}

fn fixture_report() -> ComparisonReport {
    let config = fixture_config();
    let store = CsvPriceStore::new(config.prices_dir().unwrap());
    let portfolios = config.load_portfolios().unwrap();
    let benchmark = config.benchmark_portfolio();

    Comparator::new(&store, &config.window)
        .compare(&portfolios, benchmark.as_ref())
        .expect("comparison over fixtures")
}

#[test]
fn aligned_series_cover_every_calendar_day() {
    let config = fixture_config();
    let store = CsvPriceStore::new(config.prices_dir().unwrap());
    let tickers = vec!["ABC".to_string(), "SPY".to_string(), "XYZ".to_string()];

    let table = normalize(&store, &tickers, &config.window).unwrap();
    assert_eq!(table.len(), 3);

    let days = config.window.calendar().len();
    for ticker in &tickers {
        let series = table.get(ticker).unwrap();
        assert_eq!(series.len(), days, "{} should have one row per day", ticker);
        assert_eq!(series.first_date(), Some(config.window.purchase_date));
        assert_eq!(series.last_date(), Some(config.window.sell_date));
    }

    // Weekend carries Friday's close
    let abc = table.get("ABC").unwrap();
    assert_eq!(abc.close_on(d("2024-01-13")), Some(dec!(55)));
    assert_eq!(abc.close_on(d("2024-01-14")), Some(dec!(55)));
}

#[test]
fn positive_portfolio_matches_hand_computed_values() {
    let report = fixture_report();
    let positive = report.evaluation("positive").unwrap();

    assert_eq!(positive.name, "Positive sentiment");
    assert_eq!(positive.valuations[0].shares, dec!(2000));
    assert_eq!(positive.series.value_on(d("2024-01-12")), Some(dec!(110000)));
    assert_eq!(positive.return_for("week 1"), Some(dec!(0.1)));

    let holding = &positive.holdings[0];
    assert_eq!(holding.periods[0].gain, dec!(10000));
    assert_eq!(holding.actual_return, dec!(20000));
    assert_eq!(holding.actual_return_rate, dec!(0.2));
    assert_eq!(holding.adjusted_expected_return, Some(dec!(0.05)));
}

#[test]
fn negative_portfolio_loses_value() {
    let report = fixture_report();
    let negative = report.evaluation("negative").unwrap();

    assert_eq!(negative.return_for("week 1"), Some(dec!(-0.1)));
    assert_eq!(negative.aggregate.actual_return, dec!(-12500));
    assert_eq!(negative.aggregate.actual_return_rate, dec!(-0.25));
}

#[test]
fn report_covers_every_portfolio_and_period() {
    let report = fixture_report();

    assert_eq!(report.portfolios.len(), 2);
    assert!(report.benchmark.is_some());
    assert_eq!(report.return_records().len(), 9);
    assert_eq!(report.aggregates().len(), 3);
    assert_eq!(report.holding_summaries().len(), 3);

    let benchmark = report.benchmark.as_ref().unwrap();
    assert_eq!(benchmark.name, "Index");
    let week1 = benchmark.return_for("week 1").unwrap();
    assert_eq!(week1.round_dp(6), dec!(0.010638));
}

#[test]
fn value_at_purchase_equals_invested() {
    let report = fixture_report();
    for evaluation in report.evaluations() {
        let at_purchase = evaluation
            .series
            .value_on(report.window.purchase_date)
            .unwrap();
        let diff = (at_purchase - evaluation.aggregate.invested).abs();
        assert!(diff < dec!(0.000001), "{} drifted by {}", evaluation.portfolio_id, diff);
    }
}

#[test]
fn return_sign_follows_value_direction() {
    let report = fixture_report();
    for record in report.return_records() {
        match record.end_value.cmp(&record.start_value) {
            std::cmp::Ordering::Greater => assert!(record.return_fraction > Decimal::ZERO),
            std::cmp::Ordering::Less => assert!(record.return_fraction < Decimal::ZERO),
            std::cmp::Ordering::Equal => assert!(record.return_fraction.is_zero()),
        }
    }
}

#[test]
fn repeated_runs_are_identical() {
    assert_eq!(fixture_report(), fixture_report());
}

#[test]
fn weekend_purchase_uses_prior_close() {
    let store = CsvPriceStore::new("tests/fixtures/prices");
    let window = AnalysisWindow::new(
        d("2024-01-13"),
        d("2024-01-26"),
        vec![Period::new("rest", d("2024-01-15"), d("2024-01-26"))],
    )
    .unwrap();
    let portfolio = Portfolio::new("weekend", vec![Holding::new("ABC", dec!(5500))]);

    let evaluation = Comparator::new(&store, &window).evaluate(&portfolio).unwrap();
    assert_eq!(evaluation.valuations[0].purchase_price, dec!(55));
    assert_eq!(evaluation.valuations[0].shares, dec!(100));
}

#[test]
fn missing_ticker_fails_without_partial_results() {
    let config = AppConfig::load(Some(Path::new("tests/fixtures/missing.toml"))).unwrap();
    let store = CsvPriceStore::new(config.prices_dir().unwrap());
    let portfolios = config.load_portfolios().unwrap();

    let result = Comparator::new(&store, &config.window).compare(&portfolios, None);
    match result {
        Err(EngineError::MissingTickerData { portfolio, ticker }) => {
            assert_eq!(portfolio, "missing");
            assert_eq!(ticker, "NOPE");
        }
        other => panic!("expected MissingTickerData, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn duplicate_holdings_are_rejected() {
    let store = CsvPriceStore::new("tests/fixtures/prices");
    let window = fixture_config().window;
    let portfolio = Portfolio::new(
        "dup",
        vec![Holding::new("ABC", dec!(1)), Holding::new("ABC", dec!(2))],
    );

    let result = Comparator::new(&store, &window).compare(&[portfolio], None);
    assert!(matches!(result, Err(EngineError::MalformedHoldings { .. })));
}

#[test]
fn holdings_fixture_parses_currency_and_percent() {
    let portfolio = load_holdings("tests/fixtures/holdings/positive.csv", "p").unwrap();
    assert_eq!(portfolio.holdings.len(), 1);
    assert_eq!(portfolio.holdings[0].invested_amount, dec!(100000));
    assert_eq!(portfolio.holdings[0].expected_annual_return, Some(dec!(0.2)));
}
