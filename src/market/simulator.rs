//! Random-walk forex feed standing in for live broker connectivity.

use super::snapshot::{RateSnapshot, RateSnapshotProvider};
use crate::error::{ArbError, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub const DEFAULT_BASE_RATES: &[(&str, f64)] = &[
    ("EUR/USD", 1.0850),
    ("GBP/USD", 1.2650),
    ("USD/JPY", 155.50),
    ("AUD/USD", 0.6320),
    ("USD/CHF", 0.9180),
    ("USD/CAD", 1.4150),
    ("NZD/USD", 0.5680),
    ("EUR/GBP", 0.8580),
    ("EUR/JPY", 168.70),
    ("GBP/JPY", 196.60),
    ("AUD/JPY", 98.30),
    ("CHF/JPY", 169.40),
    ("CAD/JPY", 109.90),
];

pub const DEFAULT_BROKERS: &[&str] = &[
    "OANDA",
    "Interactive Brokers",
    "FXCM",
    "XM",
    "MetaTrader",
    "Plus500",
];

/// Absolute per-quote jitter around the base rate.
const MAX_VARIATION: f64 = 0.0005;

/// Quotes every base pair at every broker with independent uniform jitter.
#[derive(Debug)]
pub struct ForexDataSimulator {
    base_rates: BTreeMap<String, f64>,
    brokers: Vec<String>,
    max_variation: f64,
    rng: Mutex<StdRng>,
}

impl ForexDataSimulator {
    /// Deterministic simulator; the same seed always yields the same rate sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::build(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::build(StdRng::from_entropy())
    }

    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::from_entropy(),
        }
    }

    fn build(rng: StdRng) -> Self {
        Self {
            base_rates: DEFAULT_BASE_RATES
                .iter()
                .map(|(pair, rate)| (pair.to_string(), *rate))
                .collect(),
            brokers: DEFAULT_BROKERS.iter().map(|b| b.to_string()).collect(),
            max_variation: MAX_VARIATION,
            rng: Mutex::new(rng),
        }
    }

    pub fn with_brokers(mut self, brokers: Vec<String>) -> Self {
        self.brokers = brokers;
        self
    }

    pub fn with_base_rates(mut self, base_rates: BTreeMap<String, f64>) -> Self {
        self.base_rates = base_rates;
        self
    }

    pub fn brokers(&self) -> &[String] {
        &self.brokers
    }

    /// One round of simulated live rates across all brokers.
    pub fn get_live_rates(&self) -> Result<RateSnapshot> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|e| ArbError::SnapshotUnavailable(format!("simulator rng poisoned: {}", e)))?;

        let mut snapshot = RateSnapshot::new(BTreeMap::new(), Utc::now());
        for broker in &self.brokers {
            for (pair, base_rate) in &self.base_rates {
                let variation = rng.gen_range(-self.max_variation..=self.max_variation);
                snapshot.insert(broker, pair, round_to(base_rate + variation, 5));
            }
        }
        debug!(
            "Simulated {} brokers x {} pairs",
            self.brokers.len(),
            self.base_rates.len()
        );
        Ok(snapshot)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[async_trait]
impl RateSnapshotProvider for ForexDataSimulator {
    async fn snapshot(&self) -> Result<RateSnapshot> {
        self.get_live_rates()
    }

    fn name(&self) -> &str {
        "forex-simulator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_rates() {
        let a = ForexDataSimulator::with_seed(42).get_live_rates().unwrap();
        let b = ForexDataSimulator::with_seed(42).get_live_rates().unwrap();
        for broker in a.brokers() {
            assert_eq!(a.broker_rates(broker), b.broker_rates(broker));
        }
    }

    #[test]
    fn test_rates_stay_within_variation_band() {
        let sim = ForexDataSimulator::with_seed(7);
        let snapshot = sim.get_live_rates().unwrap();
        assert_eq!(snapshot.broker_count(), DEFAULT_BROKERS.len());

        for broker in snapshot.brokers() {
            for (pair, base) in DEFAULT_BASE_RATES {
                let rate = snapshot.rate(broker, pair).unwrap();
                // rounding to 5 decimals can add half a unit in the last place
                assert!((rate - base).abs() <= MAX_VARIATION + 0.000005, "{} {} {}", broker, pair, rate);
            }
        }
    }

    #[test]
    fn test_custom_brokers() {
        let sim = ForexDataSimulator::with_seed(1).with_brokers(vec!["A".into(), "B".into()]);
        let snapshot = sim.get_live_rates().unwrap();
        assert_eq!(snapshot.brokers().collect::<Vec<_>>(), vec!["A", "B"]);
    }
}
