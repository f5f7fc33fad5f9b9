//! Statistical diagnostics run before modelling.
//!
//! - stationarity tests (`stationarity`)
//! - autocorrelation functions and residual checks (`correlogram`)
//! - seasonal-trend decomposition (`stl`)

pub mod correlogram;
pub mod stationarity;
pub mod stl;

pub use correlogram::*;
pub use stationarity::*;
pub use stl::*;
