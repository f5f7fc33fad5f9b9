//! Price data sources.

pub mod provider;
pub mod sample;
pub mod yahoo;

pub use provider::*;
pub use sample::{SampleConfig, SampleProvider, generate_prices};
pub use yahoo::YahooClient;
