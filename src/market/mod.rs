pub mod simulator;
pub mod snapshot;

pub use simulator::ForexDataSimulator;
pub use snapshot::{CurrencyPair, RateSnapshot, RateSnapshotProvider, StaticSnapshotProvider};
