//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - calendar and price types (`YearMonth`, `PriceObservation`)
//! - the monthly series and its train/test partition (`TimeSeries`, `Split`)
//! - model identities and comparison rows (`ModelKind`, `EvaluationRow`)
//! - run configuration (`RunConfig`, `SearchPolicy`)

pub mod types;

pub use types::*;
