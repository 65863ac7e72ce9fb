use crate::market::RateSnapshot;
use std::collections::HashSet;

/// =====================================
///  Broker / pair inclusion filter
/// =====================================

/// Restricts which brokers and pairs a detection cycle looks at.
/// Broker names compare case-insensitively, pair symbols compare uppercased.
/// An empty inclusion list means "everything".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotFilter {
    included_brokers: HashSet<String>,
    excluded_brokers: HashSet<String>,
    included_pairs: HashSet<String>,
}

impl SnapshotFilter {
    /// New, accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lists(included_brokers: &[String], excluded_brokers: &[String], included_pairs: &[String]) -> Self {
        Self {
            included_brokers: included_brokers.iter().map(|b| b.trim().to_lowercase()).collect(),
            excluded_brokers: excluded_brokers.iter().map(|b| b.trim().to_lowercase()).collect(),
            included_pairs: included_pairs.iter().map(|p| p.trim().to_uppercase()).collect(),
        }
    }

    pub fn is_pass_through(&self) -> bool {
        self.included_brokers.is_empty() && self.excluded_brokers.is_empty() && self.included_pairs.is_empty()
    }

    pub fn accepts_broker(&self, broker: &str) -> bool {
        let broker = broker.to_lowercase();
        !self.excluded_brokers.contains(&broker)
            && (self.included_brokers.is_empty() || self.included_brokers.contains(&broker))
    }

    pub fn accepts_pair(&self, pair: &str) -> bool {
        self.included_pairs.is_empty() || self.included_pairs.contains(&pair.to_uppercase())
    }

    /// Filtered copy of `snapshot`; the original is never touched.
    pub fn apply(&self, snapshot: &RateSnapshot) -> RateSnapshot {
        if self.is_pass_through() {
            return snapshot.clone();
        }
        snapshot.retain(|b| self.accepts_broker(b), |p| self.accepts_pair(p))
    }
}
