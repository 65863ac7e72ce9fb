//! Point-in-time broker rate snapshots.
//!
//! A [`RateSnapshot`] is the only input the detection engine reads: every broker's quoted
//! pairs, captured at effectively the same instant. Snapshots are immutable; each detection
//! cycle asks a [`RateSnapshotProvider`] for a fresh one.

use crate::error::{ArbError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Ordered (base, quote) pair, written `BASE/QUOTE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        }
    }

    pub fn inverse(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = ArbError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None)
                if !base.trim().is_empty()
                    && !quote.trim().is_empty()
                    && !base.trim().eq_ignore_ascii_case(quote.trim()) =>
            {
                Ok(CurrencyPair::new(base.trim(), quote.trim()))
            }
            _ => Err(ArbError::InvalidPair(s.to_string())),
        }
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = ArbError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CurrencyPair> for String {
    fn from(pair: CurrencyPair) -> Self {
        pair.symbol()
    }
}

/// Checks that a quoted rate is usable for arithmetic.
pub fn validate_rate(broker: &str, pair: &str, rate: f64) -> Result<f64> {
    if !rate.is_finite() {
        return Err(ArbError::malformed(broker, pair, format!("non-finite rate {}", rate)));
    }
    if rate <= 0.0 {
        return Err(ArbError::malformed(broker, pair, format!("non-positive rate {}", rate)));
    }
    Ok(rate)
}

/// Canonical `BASE/QUOTE` form of a quoted symbol. Unparsable symbols are kept as given
/// (trimmed) so the scanners can still report them as malformed.
pub fn normalize_symbol(pair: &str) -> String {
    match pair.parse::<CurrencyPair>() {
        Ok(parsed) => parsed.symbol(),
        Err(_) => pair.trim().to_string(),
    }
}

/// broker -> pair symbol -> rate, plus the capture instant.
/// Symbols are stored normalized, so `eur/usd` and `EUR/USD` are the same pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    rates: BTreeMap<String, BTreeMap<String, f64>>,
    captured_at: DateTime<Utc>,
}

impl RateSnapshot {
    pub fn new(rates: BTreeMap<String, BTreeMap<String, f64>>, captured_at: DateTime<Utc>) -> Self {
        let mut snapshot = Self {
            rates: BTreeMap::new(),
            captured_at,
        };
        for (broker, pairs) in rates {
            let entry = snapshot.rates.entry(broker.clone()).or_default();
            for (pair, rate) in pairs {
                entry.insert(normalize_symbol(&pair), rate);
            }
        }
        snapshot
    }

    /// Empty snapshot stamped with the current time.
    pub fn empty() -> Self {
        Self::new(BTreeMap::new(), Utc::now())
    }

    /// Builder-style insert, mostly used by tests and adapters.
    pub fn with_rate(mut self, broker: &str, pair: &str, rate: f64) -> Self {
        self.insert(broker, pair, rate);
        self
    }

    pub fn insert(&mut self, broker: &str, pair: &str, rate: f64) {
        self.rates
            .entry(broker.to_string())
            .or_default()
            .insert(normalize_symbol(pair), rate);
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }

    /// No brokers, or no broker quotes any pair.
    pub fn is_empty(&self) -> bool {
        self.rates.values().all(|pairs| pairs.is_empty())
    }

    pub fn brokers(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    pub fn broker_count(&self) -> usize {
        self.rates.len()
    }

    pub fn broker_rates(&self, broker: &str) -> Option<&BTreeMap<String, f64>> {
        self.rates.get(broker)
    }

    /// Every pair symbol quoted by at least one broker, sorted.
    pub fn pairs(&self) -> BTreeSet<&str> {
        self.rates
            .values()
            .flat_map(|pairs| pairs.keys().map(String::as_str))
            .collect()
    }

    /// Validated rate for one broker/pair.
    pub fn rate(&self, broker: &str, pair: &str) -> Result<f64> {
        let symbol = normalize_symbol(pair);
        let rate = self
            .rates
            .get(broker)
            .and_then(|pairs| pairs.get(&symbol))
            .copied()
            .ok_or_else(|| ArbError::malformed(broker, pair, "missing rate"))?;
        validate_rate(broker, pair, rate)
    }

    /// All brokers quoting `pair`, in broker-name order, each with its validated rate.
    pub fn quotes_for_pair<'a>(&'a self, pair: &'a str) -> impl Iterator<Item = (&'a str, Result<f64>)> + 'a {
        self.rates.iter().filter_map(move |(broker, pairs)| {
            pairs
                .get(pair)
                .map(|&rate| (broker.as_str(), validate_rate(broker, pair, rate)))
        })
    }

    /// Keeps only the brokers and pairs accepted by the predicates.
    pub fn retain<B, P>(&self, mut keep_broker: B, mut keep_pair: P) -> Self
    where
        B: FnMut(&str) -> bool,
        P: FnMut(&str) -> bool,
    {
        let rates = self
            .rates
            .iter()
            .filter(|(broker, _)| keep_broker(broker))
            .map(|(broker, pairs)| {
                let pairs = pairs
                    .iter()
                    .filter(|(pair, _)| keep_pair(pair))
                    .map(|(pair, rate)| (pair.clone(), *rate))
                    .collect();
                (broker.clone(), pairs)
            })
            .collect();
        Self::new(rates, self.captured_at)
    }
}

/// Source of rate snapshots: the market simulator today, a live feed adapter later.
#[async_trait]
pub trait RateSnapshotProvider: Send + Sync {
    /// Captures a complete broker -> pair -> rate mapping for the current instant.
    async fn snapshot(&self) -> Result<RateSnapshot>;

    fn name(&self) -> &str;
}

/// Replays one fixed set of rates, re-stamped on every call.
#[derive(Debug, Clone)]
pub struct StaticSnapshotProvider {
    rates: RateSnapshot,
}

impl StaticSnapshotProvider {
    pub fn new(rates: RateSnapshot) -> Self {
        Self { rates }
    }
}

#[async_trait]
impl RateSnapshotProvider for StaticSnapshotProvider {
    async fn snapshot(&self) -> Result<RateSnapshot> {
        Ok(self.rates.clone().with_captured_at(Utc::now()))
    }

    fn name(&self) -> &str {
        "static"
    }
}
