//! Opportunity Module
//!
//! This module defines the structure emitted by the scanners for every detected
//! arbitrage opportunity, together with the wire message the publisher sends downstream.
//!
//! An opportunity is created fresh on every detection cycle and never mutated afterwards:
//!   - `id` is unique per detection, not per logical pairing.
//!   - `detected_at` lets the ranker and consumers drop anything from an older cycle.
//!   - spatial opportunities carry the buy/sell legs so an execution layer can act on them.

use crate::market::CurrencyPair;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Notional used for every detected opportunity.
pub const DEFAULT_POSITION_SIZE: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityType {
    Spatial,
    Triangular,
}

impl fmt::Display for OpportunityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpportunityType::Spatial => write!(f, "spatial"),
            OpportunityType::Triangular => write!(f, "triangular"),
        }
    }
}

/// A detected arbitrage opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Unique identifier, generated at detection time.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OpportunityType,
    /// One pair for spatial, three for triangular.
    pub currency_pairs: Vec<CurrencyPair>,
    /// Buy broker then sell broker for spatial; the single quoting broker for triangular.
    pub brokers: Vec<String>,
    pub buy_broker: Option<String>,
    pub sell_broker: Option<String>,
    pub buy_rate: Option<f64>,
    pub sell_rate: Option<f64>,
    /// Absolute rate difference (spatial) or cross-rate discrepancy (triangular).
    pub profit_potential: f64,
    pub profit_percentage: f64,
    pub position_size: f64,
    pub confidence_score: f64,
    pub detected_at: DateTime<Utc>,
}

impl Opportunity {
    pub fn spatial(
        pair: CurrencyPair,
        buy: (&str, f64),
        sell: (&str, f64),
        profit_percentage: f64,
        confidence_score: f64,
        detected_at: DateTime<Utc>,
    ) -> Self {
        let (buy_broker, buy_rate) = buy;
        let (sell_broker, sell_rate) = sell;
        Self {
            id: new_opportunity_id(),
            kind: OpportunityType::Spatial,
            currency_pairs: vec![pair],
            brokers: vec![buy_broker.to_string(), sell_broker.to_string()],
            buy_broker: Some(buy_broker.to_string()),
            sell_broker: Some(sell_broker.to_string()),
            buy_rate: Some(buy_rate),
            sell_rate: Some(sell_rate),
            profit_potential: sell_rate - buy_rate,
            profit_percentage,
            position_size: DEFAULT_POSITION_SIZE,
            confidence_score,
            detected_at,
        }
    }

    pub fn triangular(
        broker: &str,
        legs: [CurrencyPair; 3],
        discrepancy: f64,
        profit_percentage: f64,
        confidence_score: f64,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_opportunity_id(),
            kind: OpportunityType::Triangular,
            currency_pairs: legs.to_vec(),
            brokers: vec![broker.to_string()],
            buy_broker: None,
            sell_broker: None,
            buy_rate: None,
            sell_rate: None,
            profit_potential: discrepancy,
            profit_percentage,
            position_size: DEFAULT_POSITION_SIZE,
            confidence_score,
            detected_at,
        }
    }

    /// Same opportunity, new identity. Used when an id collides within one cycle.
    pub fn reissued(&self) -> Self {
        Self {
            id: new_opportunity_id(),
            ..self.clone()
        }
    }

    /// Identity of the logical pairing, independent of detection time.
    pub fn pairing_key(&self) -> String {
        let pairs = self
            .currency_pairs
            .iter()
            .map(CurrencyPair::symbol)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}|{}|{}", self.kind, pairs, self.brokers.join(","))
    }

    pub fn involves_pair(&self, symbol: &str) -> bool {
        self.currency_pairs.iter().any(|p| p.symbol() == symbol)
    }

    pub fn involves_broker(&self, broker: &str) -> bool {
        self.brokers.iter().any(|b| b.eq_ignore_ascii_case(broker))
    }

    /// Checks the structural invariants for this opportunity's type.
    pub fn is_well_formed(&self) -> bool {
        let confidence_ok = (0.0..=1.0).contains(&self.confidence_score);
        match self.kind {
            OpportunityType::Spatial => {
                confidence_ok
                    && self.currency_pairs.len() == 1
                    && self.brokers.len() == 2
                    && self.brokers[0] != self.brokers[1]
            }
            OpportunityType::Triangular => {
                confidence_ok
                    && self.currency_pairs.len() == 3
                    && self.brokers.len() == 1
                    && forms_triangle(&self.currency_pairs)
            }
        }
    }

    pub fn log_summary(&self) {
        let pairs = self
            .currency_pairs
            .iter()
            .map(CurrencyPair::symbol)
            .collect::<Vec<_>>()
            .join(" -> ");
        log::info!(
            "[ARB OPPORTUNITY ID: {}] Type: {} | Pairs: {} | Brokers: {} | Profit: {:.4}% | Confidence: {:.2}",
            self.id,
            self.kind,
            pairs,
            self.brokers.join(" -> "),
            self.profit_percentage,
            self.confidence_score
        );
    }
}

/// Three pairs spanning exactly three currencies, each currency appearing in two legs.
fn forms_triangle(pairs: &[CurrencyPair]) -> bool {
    let mut counts = std::collections::BTreeMap::new();
    for pair in pairs {
        *counts.entry(pair.base.as_str()).or_insert(0) += 1;
        *counts.entry(pair.quote.as_str()).or_insert(0) += 1;
    }
    counts.len() == 3 && counts.values().all(|&c| c == 2)
}

pub fn new_opportunity_id() -> String {
    Uuid::new_v4().to_string()
}

/// Message pushed to subscribers after each published cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunitiesUpdate {
    #[serde(rename = "type")]
    pub message_type: String,
    pub data: Vec<Opportunity>,
}

impl OpportunitiesUpdate {
    pub fn new(data: Vec<Opportunity>) -> Self {
        Self {
            message_type: "opportunities_update".to_string(),
            data,
        }
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(s: &str) -> CurrencyPair {
        s.parse().unwrap()
    }

    #[test]
    fn test_spatial_constructor_fills_legs() {
        let opp = Opportunity::spatial(
            pair("EUR/USD"),
            ("OANDA", 1.0850),
            ("FXCM", 1.0860),
            0.0921,
            0.6,
            Utc::now(),
        );
        assert_eq!(opp.brokers, vec!["OANDA", "FXCM"]);
        assert_eq!(opp.buy_broker.as_deref(), Some("OANDA"));
        assert!((opp.profit_potential - 0.001).abs() < 1e-12);
        assert!(opp.is_well_formed());
    }

    #[test]
    fn test_triangle_shape_check() {
        let now = Utc::now();
        let good = Opportunity::triangular(
            "OANDA",
            [pair("EUR/USD"), pair("USD/JPY"), pair("EUR/JPY")],
            1.0,
            0.8,
            0.7,
            now,
        );
        assert!(good.is_well_formed());

        let bad = Opportunity::triangular(
            "OANDA",
            [pair("EUR/USD"), pair("USD/JPY"), pair("GBP/JPY")],
            1.0,
            0.8,
            0.7,
            now,
        );
        assert!(!bad.is_well_formed());
    }

    #[test]
    fn test_reissued_changes_only_id() {
        let opp = Opportunity::spatial(pair("EUR/USD"), ("A", 1.0), ("B", 1.1), 10.0, 0.9, Utc::now());
        let again = opp.reissued();
        assert_ne!(opp.id, again.id);
        assert_eq!(opp.pairing_key(), again.pairing_key());
    }

    #[test]
    fn test_wire_format() {
        let opp = Opportunity::spatial(pair("EUR/USD"), ("A", 1.0), ("B", 1.1), 10.0, 0.9, Utc::now());
        let json = OpportunitiesUpdate::new(vec![opp]).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "opportunities_update");
        assert_eq!(value["data"][0]["type"], "spatial");
        assert_eq!(value["data"][0]["currency_pairs"][0], "EUR/USD");
        assert!(value["data"][0]["id"].is_string());
        // chrono serializes DateTime<Utc> as RFC 3339 / ISO-8601
        let ts = value["data"][0]["detected_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
