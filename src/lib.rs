pub mod arbitrage;
pub mod config;
pub mod error;
pub mod market; // Rate snapshots and the simulated feed
pub mod simulation; // Paper trading on published opportunities
pub mod utils;

pub use arbitrage::{
    detect_spatial, detect_triangular, rank, ArbitrageDetector, DetectionLoop, Opportunity,
    OpportunityType,
};
pub use error::{ArbError, Result};
pub use market::{CurrencyPair, ForexDataSimulator, RateSnapshot, RateSnapshotProvider};
