// Reports module - comparison tables and their CSV exports

pub mod comparison;
pub mod export;

pub use comparison::{best_portfolio, ReturnsMatrix, ReturnsMatrixRow};
pub use export::{export_csv, write_value_series_csv};
