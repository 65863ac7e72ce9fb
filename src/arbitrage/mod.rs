//! Arbitrage detection: the two scanners, the ranker, and the loop that drives them.

pub mod confidence;
pub mod detector;
pub mod engine;
pub mod filter;
pub mod opportunity;
pub mod ranker;
pub mod spatial;
pub mod triangular;
pub mod types;

pub use detector::ArbitrageDetector;
pub use engine::{DetectionLoop, PublishedOpportunities};
pub use filter::SnapshotFilter;
pub use opportunity::{OpportunitiesUpdate, Opportunity, OpportunityType};
pub use ranker::{rank, OpportunityRanker};
pub use spatial::detect_spatial;
pub use triangular::detect_triangular;
pub use types::DetectionMetrics;
