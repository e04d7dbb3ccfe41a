//! Valuation & returns engine
//!
//! Data flows one way through these stages, each producing a new value:
//!
//! raw prices → [`normalize`] → [`valuation`] → [`flatten`] → [`returns`] →
//! [`compare`] (with per-holding [`summary`] rows alongside).
//!
//! Nothing here touches the network or the filesystem; prices arrive through a
//! [`crate::pricing::PriceSource`] that the caller has already populated.

pub mod compare;
pub mod flatten;
pub mod normalize;
pub mod returns;
pub mod summary;
pub mod valuation;

pub use compare::{validate_inputs, Comparator, ComparisonReport, PortfolioEvaluation};
pub use flatten::{flatten, PortfolioValuePoint, PortfolioValueSeries};
pub use normalize::{normalize, AlignedPriceRow, AlignedPriceSeries, PriceTable};
pub use returns::{period_return, period_returns, ReturnRecord};
pub use summary::{summarize_holding, HoldingSummary, PeriodSnapshot, PortfolioAggregate};
pub use valuation::{value_holding, value_portfolio, HoldingValuation, ValuationPoint};
