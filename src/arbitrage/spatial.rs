// src/arbitrage/spatial.rs
//! Cross-broker (spatial) scanner: same pair, different brokers.

use crate::{
    arbitrage::{confidence::spatial_confidence, opportunity::Opportunity},
    error::{ArbError, Result},
    market::{CurrencyPair, RateSnapshot},
};
use chrono::Utc;
use log::{debug, warn};

/// Finds, for every pair quoted by two or more brokers, the cheapest and dearest quote and
/// emits an opportunity when the spread clears `min_profit_threshold` (a fraction, e.g.
/// 0.00001 for 0.001%).
///
/// Ties on the minimum or maximum rate go to the lexicographically first broker name.
/// Malformed quotes are skipped individually; the rest of the pair is still scanned.
pub fn detect_spatial(snapshot: &RateSnapshot, min_profit_threshold: f64) -> Vec<Opportunity> {
    if snapshot.is_empty() {
        debug!("detect_spatial: empty snapshot");
        return Vec::new();
    }

    let mut opportunities = Vec::new();
    for pair in snapshot.pairs() {
        match evaluate_pair(snapshot, pair, min_profit_threshold) {
            Ok(Some(opp)) => opportunities.push(opp),
            Ok(None) => {}
            Err(e) => warn!("Skipping spatial candidate {}: {}", pair, e),
        }
    }
    debug!(
        "detect_spatial: {} opportunities over {} pairs",
        opportunities.len(),
        snapshot.pairs().len()
    );
    opportunities
}

fn evaluate_pair(snapshot: &RateSnapshot, pair: &str, min_profit_threshold: f64) -> Result<Option<Opportunity>> {
    let mut quotes: Vec<(&str, f64)> = Vec::new();
    for (broker, rate) in snapshot.quotes_for_pair(pair) {
        match rate {
            Ok(rate) => quotes.push((broker, rate)),
            Err(e) => debug!("Dropping quote: {}", e),
        }
    }
    if quotes.len() < 2 {
        return Ok(None);
    }
    let currency_pair: CurrencyPair = pair.parse()?;

    // quotes arrive in broker-name order, so strict comparisons keep the first broker on ties
    let (mut buy, mut sell) = (quotes[0], quotes[0]);
    for &(broker, rate) in &quotes[1..] {
        if rate < buy.1 {
            buy = (broker, rate);
        }
        if rate > sell.1 {
            sell = (broker, rate);
        }
    }
    if sell.1 <= buy.1 {
        return Ok(None);
    }

    let profit_percentage = (sell.1 - buy.1) / buy.1 * 100.0;
    if !profit_percentage.is_finite() {
        return Err(ArbError::malformed(buy.0, pair, "profit is not finite"));
    }
    if profit_percentage / 100.0 < min_profit_threshold {
        return Ok(None);
    }

    let confidence = spatial_confidence(profit_percentage, min_profit_threshold, quotes.len());
    debug!(
        "Spatial {}: buy {} @ {} / sell {} @ {} = {:.5}%",
        pair, buy.0, buy.1, sell.0, sell.1, profit_percentage
    );
    Ok(Some(Opportunity::spatial(
        currency_pair,
        buy,
        sell,
        profit_percentage,
        confidence,
        Utc::now(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_two_broker_spread() {
        let snapshot = RateSnapshot::empty()
            .with_rate("OANDA", "EUR/USD", 1.0850)
            .with_rate("FXCM", "EUR/USD", 1.0860);

        let opps = detect_spatial(&snapshot, 0.00001);
        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].brokers, vec!["OANDA".to_string(), "FXCM".to_string()]);
        assert_approx_eq!(opps[0].profit_percentage, 0.0921659, 1e-6);
        assert_eq!(opps[0].buy_rate, Some(1.0850));
        assert_eq!(opps[0].sell_rate, Some(1.0860));
    }

    #[test]
    fn test_symbol_case_does_not_split_a_pair() {
        let snapshot = RateSnapshot::empty()
            .with_rate("OANDA", "EUR/USD", 1.0850)
            .with_rate("FXCM", "eur/usd", 1.0860);

        let opps = detect_spatial(&snapshot, 0.00001);
        assert_eq!(opps.len(), 1);
        assert!(opps[0].involves_pair("EUR/USD"));
        assert_eq!(opps[0].brokers, vec!["OANDA".to_string(), "FXCM".to_string()]);
    }

    #[test]
    fn test_single_broker_pair_is_ignored() {
        let snapshot = RateSnapshot::empty()
            .with_rate("OANDA", "EUR/USD", 1.0850)
            .with_rate("OANDA", "GBP/USD", 1.2650)
            .with_rate("FXCM", "GBP/USD", 1.2650);
        assert!(detect_spatial(&snapshot, 0.0).is_empty());
    }

    #[test]
    fn test_threshold_filters_small_spreads() {
        let snapshot = RateSnapshot::empty()
            .with_rate("OANDA", "EUR/USD", 1.0850)
            .with_rate("FXCM", "EUR/USD", 1.0851);
        // ~0.0092% spread
        assert_eq!(detect_spatial(&snapshot, 0.0001).len(), 0);
        assert_eq!(detect_spatial(&snapshot, 0.00005).len(), 1);
    }

    #[test]
    fn test_ties_resolve_to_first_broker_name() {
        let snapshot = RateSnapshot::empty()
            .with_rate("XM", "EUR/USD", 1.0850)
            .with_rate("FXCM", "EUR/USD", 1.0850)
            .with_rate("Plus500", "EUR/USD", 1.0870)
            .with_rate("OANDA", "EUR/USD", 1.0870);

        let opps = detect_spatial(&snapshot, 0.0);
        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].brokers, vec!["FXCM".to_string(), "OANDA".to_string()]);
    }

    #[test]
    fn test_bad_quote_does_not_block_pair_or_others() {
        let snapshot = RateSnapshot::empty()
            .with_rate("A", "EUR/USD", 0.0)
            .with_rate("B", "EUR/USD", 1.0850)
            .with_rate("C", "EUR/USD", 1.0860)
            .with_rate("A", "GBP/USD", -1.0)
            .with_rate("B", "GBP/USD", 1.2650)
            .with_rate("C", "GBP/USD", 1.2660);

        let opps = detect_spatial(&snapshot, 0.00001);
        assert_eq!(opps.len(), 2);
        for opp in &opps {
            assert!(!opp.involves_broker("A"));
        }
    }

    #[test]
    fn test_more_corroboration_raises_confidence() {
        let two = RateSnapshot::empty()
            .with_rate("A", "EUR/USD", 1.0850)
            .with_rate("B", "EUR/USD", 1.0860);
        let four = two
            .clone()
            .with_rate("C", "EUR/USD", 1.0855)
            .with_rate("D", "EUR/USD", 1.0856);

        let c2 = detect_spatial(&two, 0.00001)[0].confidence_score;
        let c4 = detect_spatial(&four, 0.00001)[0].confidence_score;
        assert!(c4 > c2);
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(detect_spatial(&RateSnapshot::empty(), 0.00001).is_empty());
    }
}
