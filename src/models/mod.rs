//! Forecasting model families.
//!
//! Each family is a small configuration struct plus a pure fitting function
//! returning a [`FittedModel`], so the model bank and the hold-out harness can
//! treat them uniformly.

pub mod arima;
pub mod ets;
pub mod linear;
pub mod model;
pub mod moving_average;

pub use arima::{ArimaCoefficients, ArimaOrder, ArimaSpec, ArimaState, SeasonalOrder, fit_arima};
pub use ets::{EtsParams, EtsSpec, EtsState, fit_ets};
pub use linear::{LinearTrend, fit_linear_trend};
pub use model::*;
pub use moving_average::{MovingAverageSpec, centered_moving_average, fit_moving_average};
