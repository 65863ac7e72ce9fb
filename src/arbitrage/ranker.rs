// src/arbitrage/ranker.rs
//! Merges scanner output into the single list published for a cycle.

use crate::{arbitrage::opportunity::Opportunity, error::Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::cmp::Ordering;
use std::collections::HashSet;

fn by_profit_desc(a: &Opportunity, b: &Opportunity) -> Ordering {
    b.profit_percentage.total_cmp(&a.profit_percentage)
}

/// Orders by descending `profit_percentage` and keeps the first `max_results`.
///
/// Pure: the same input always yields the same output. Equal profits keep their input
/// order. Entries with a non-finite profit are dropped.
///
/// # Panics
/// If `max_results` is zero; that is a caller bug, configuration validation rejects it.
pub fn rank(opportunities: &[Opportunity], max_results: usize) -> Vec<Opportunity> {
    assert!(max_results >= 1, "rank: max_results must be at least 1");
    let mut ranked: Vec<Opportunity> = opportunities
        .iter()
        .filter(|opp| opp.profit_percentage.is_finite())
        .cloned()
        .collect();
    ranked.sort_by(by_profit_desc);
    ranked.truncate(max_results);
    ranked
}

/// Stateless per-cycle ranker. Holds only its cap; nothing survives between calls.
#[derive(Debug, Clone, Copy)]
pub struct OpportunityRanker {
    max_results: usize,
}

impl OpportunityRanker {
    pub fn new(max_results: usize) -> Self {
        assert!(max_results >= 1, "OpportunityRanker: max_results must be at least 1");
        Self { max_results }
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Builds the published list for the cycle that started at `cycle_started_at`.
    ///
    /// * failed candidates and structurally invalid opportunities are dropped one by one
    /// * anything detected before the cycle started, or already published last cycle, is stale
    /// * duplicate ids inside the cycle are reissued
    /// * the same logical pairing is kept once, at its highest profit
    pub fn rank_cycle<I>(
        &self,
        candidates: I,
        previous: Option<&[Opportunity]>,
        cycle_started_at: DateTime<Utc>,
    ) -> Vec<Opportunity>
    where
        I: IntoIterator<Item = Result<Opportunity>>,
    {
        let previous_ids: HashSet<&str> = previous
            .unwrap_or_default()
            .iter()
            .map(|opp| opp.id.as_str())
            .collect();

        let mut fresh = Vec::new();
        for candidate in candidates {
            let opp = match candidate {
                Ok(opp) => opp,
                Err(e) => {
                    warn!("Dropping opportunity candidate: {}", e);
                    continue;
                }
            };
            if !opp.is_well_formed() {
                warn!("Dropping malformed opportunity {} ({})", opp.id, opp.pairing_key());
                continue;
            }
            if opp.detected_at < cycle_started_at || previous_ids.contains(opp.id.as_str()) {
                debug!("Dropping stale opportunity {}", opp.id);
                continue;
            }
            fresh.push(opp);
        }

        fresh.sort_by(by_profit_desc);

        let mut ids = HashSet::new();
        let mut pairings = HashSet::new();
        let mut unique = Vec::with_capacity(fresh.len());
        for opp in fresh {
            if !pairings.insert(opp.pairing_key()) {
                continue;
            }
            let opp = if ids.contains(&opp.id) { opp.reissued() } else { opp };
            ids.insert(opp.id.clone());
            unique.push(opp);
        }

        rank(&unique, self.max_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::opportunity::Opportunity;
    use crate::error::ArbError;
    use crate::market::CurrencyPair;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn spatial(pair: &str, buy: &str, sell: &str, profit: f64) -> Opportunity {
        let pair: CurrencyPair = pair.parse().unwrap();
        Opportunity::spatial(pair, (buy, 1.0), (sell, 1.0 + profit / 100.0), profit, 0.7, Utc::now())
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let opps: Vec<Opportunity> = (0..15)
            .map(|i| spatial("EUR/USD", &format!("B{}", i), "S", i as f64 * 0.01 + 0.01))
            .collect();

        let ranked = rank(&opps, 10);
        assert_eq!(ranked.len(), 10);
        let profits: Vec<f64> = ranked.iter().map(|o| o.profit_percentage).collect();
        let mut expected: Vec<f64> = opps.iter().map(|o| o.profit_percentage).collect();
        expected.sort_by(|a, b| b.total_cmp(a));
        expected.truncate(10);
        assert_eq!(profits, expected);
    }

    #[test]
    fn test_rank_is_idempotent() {
        let opps = vec![
            spatial("EUR/USD", "A", "B", 0.3),
            spatial("GBP/USD", "A", "B", 0.3),
            spatial("USD/JPY", "A", "B", 0.9),
        ];
        let first = rank(&opps, 2);
        let second = rank(&opps, 2);
        assert_eq!(first, second);
        assert_eq!(rank(&first, 2), first);
    }

    #[test]
    #[should_panic(expected = "max_results must be at least 1")]
    fn test_rank_rejects_zero_cap() {
        rank(&[], 0);
    }

    #[test]
    fn test_rank_cycle_drops_errors_and_stale_entries() {
        let started = Utc::now();
        let fresh = spatial("EUR/USD", "A", "B", 0.2);
        let mut old = spatial("GBP/USD", "A", "B", 0.5);
        old.detected_at = started - Duration::seconds(2);

        let candidates = vec![
            Ok(fresh.clone()),
            Ok(old),
            Err(ArbError::malformed("C", "USD/JPY", "missing rate")),
        ];
        let ranked = OpportunityRanker::new(10).rank_cycle(candidates, None, started);
        assert_eq!(ranked, vec![fresh]);
    }

    #[test]
    fn test_rank_cycle_never_carries_forward_previous_ids() {
        let started = Utc::now();
        let opp = spatial("EUR/USD", "A", "B", 0.2);
        let previous = vec![opp.clone()];

        let ranked = OpportunityRanker::new(10).rank_cycle(vec![Ok(opp)], Some(&previous), started);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_rank_cycle_dedups_pairings_and_ids() {
        let started = Utc::now();
        let better = spatial("EUR/USD", "A", "B", 0.4);
        let worse = spatial("EUR/USD", "A", "B", 0.1);
        let mut clash = spatial("GBP/USD", "A", "B", 0.2);
        clash.id = better.id.clone();

        let ranked = OpportunityRanker::new(10).rank_cycle(
            vec![Ok(worse), Ok(better.clone()), Ok(clash)],
            None,
            started,
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, better.id);
        assert_ne!(ranked[1].id, better.id);
    }

    #[test]
    fn test_rank_cycle_drops_malformed_shapes() {
        let started = Utc::now();
        let mut bad = spatial("EUR/USD", "A", "A", 0.4);
        bad.confidence_score = 1.5;
        let ranked = OpportunityRanker::new(5).rank_cycle(vec![Ok(bad)], None, started);
        assert!(ranked.is_empty());
    }
}
