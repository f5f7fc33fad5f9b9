//! `ticker-forecast` library crate.
//!
//! The binary (`tf`) is a thin wrapper around this library so that:
//!
//! - the analysis is testable without spawning processes or touching the network
//! - price sources, diagnostics and models can be used on their own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod stats;
