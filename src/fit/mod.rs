//! Model fitting orchestration.
//!
//! - `bank`: fit every candidate model on the full series
//! - `arima_search`: differencing choice and ARIMA order search
//! - `holdout`: refit on a training window and score out-of-sample forecasts

pub mod arima_search;
pub mod bank;
pub mod holdout;

pub use arima_search::*;
pub use bank::*;
pub use holdout::*;
