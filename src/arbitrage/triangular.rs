// src/arbitrage/triangular.rs
//! Single-broker (triangular) scanner.
//!
//! For every set of three currencies a broker quotes pairwise, the implied cross rate
//! `rate(A/B) * rate(B/C)` is compared with the quoted `rate(A/C)`. Each currency set is
//! scanned in exactly one canonical orientation:
//!
//! 1. Orientations are tried in lexicographic permutation order of the sorted currencies.
//! 2. The first orientation whose three legs A/B, B/C, A/C are all quoted directly wins.
//! 3. Failing that, the first orientation with A/B and B/C quoted and only the inverse
//!    C/A quoted wins, and `direct` becomes `1 / rate(C/A)`.
//!
//! Currency sets come from 3-combinations of the broker's sorted currency set, so each
//! set is visited once and always as its sorted triple.
//!
//! Brokers are scanned in parallel; output order is broker-name order either way.

use crate::{
    arbitrage::{confidence::triangular_confidence, opportunity::Opportunity},
    market::{CurrencyPair, RateSnapshot},
};
use chrono::Utc;
use itertools::Itertools;
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Index permutations of a sorted currency triple, in lexicographic order.
const ORIENTATIONS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Validated quotes of one broker, keyed by (base, quote).
pub type QuoteBook = BTreeMap<(String, String), f64>;

/// A triangle in its canonical orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub legs: [CurrencyPair; 3],
    pub implied: f64,
    pub direct: f64,
    /// The third leg is quoted as C/A rather than A/C.
    pub inverted: bool,
}

/// Scans every broker independently for cross-rate inconsistencies whose profit clears
/// `min_profit_threshold` (a fraction).
pub fn detect_triangular(snapshot: &RateSnapshot, min_profit_threshold: f64) -> Vec<Opportunity> {
    if snapshot.is_empty() {
        debug!("detect_triangular: empty snapshot");
        return Vec::new();
    }

    let brokers: Vec<&str> = snapshot.brokers().collect();
    let per_broker: Vec<Vec<Opportunity>> = brokers
        .par_iter()
        .map(|broker| scan_broker(snapshot, broker, min_profit_threshold))
        .collect();

    let opportunities: Vec<Opportunity> = per_broker.into_iter().flatten().collect();
    debug!(
        "detect_triangular: {} opportunities over {} brokers",
        opportunities.len(),
        brokers.len()
    );
    opportunities
}

fn scan_broker(snapshot: &RateSnapshot, broker: &str, min_profit_threshold: f64) -> Vec<Opportunity> {
    let book = quote_book(snapshot, broker);
    let currencies: BTreeSet<&str> = book
        .keys()
        .flat_map(|(base, quote)| [base.as_str(), quote.as_str()])
        .collect();

    let mut opportunities = Vec::new();

    // combinations of a sorted set are already sorted and distinct
    for combo in currencies.iter().copied().combinations(3) {
        let key = [combo[0], combo[1], combo[2]];
        let Some(triangle) = canonical_triangle(&book, key) else {
            continue;
        };
        if !triangle.direct.is_finite() || triangle.direct <= 0.0 || !triangle.implied.is_finite() {
            warn!(
                "Skipping triangle {:?} at {}: unusable rates (implied {}, direct {})",
                key, broker, triangle.implied, triangle.direct
            );
            continue;
        }

        let discrepancy = (triangle.implied - triangle.direct).abs();
        let profit_percentage = discrepancy / triangle.direct * 100.0;
        if profit_percentage / 100.0 < min_profit_threshold {
            continue;
        }

        let detected_at = Utc::now();
        let staleness_secs =
            (detected_at - snapshot.captured_at()).num_milliseconds() as f64 / 1000.0;
        let confidence = triangular_confidence(profit_percentage, min_profit_threshold, staleness_secs);
        debug!(
            "Triangular {} {:?}: implied {:.6} vs direct {:.6} = {:.5}%",
            broker, key, triangle.implied, triangle.direct, profit_percentage
        );
        opportunities.push(Opportunity::triangular(
            broker,
            triangle.legs,
            discrepancy,
            profit_percentage,
            confidence,
            detected_at,
        ));
    }
    opportunities
}

fn quote_book(snapshot: &RateSnapshot, broker: &str) -> QuoteBook {
    let mut book = QuoteBook::new();
    let Some(rates) = snapshot.broker_rates(broker) else {
        return book;
    };
    for symbol in rates.keys() {
        let pair: CurrencyPair = match symbol.parse() {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Ignoring quote at {}: {}", broker, e);
                continue;
            }
        };
        match snapshot.rate(broker, symbol) {
            Ok(rate) => {
                book.insert((pair.base, pair.quote), rate);
            }
            Err(e) => debug!("Dropping quote: {}", e),
        }
    }
    book
}

fn lookup(book: &QuoteBook, base: &str, quote: &str) -> Option<f64> {
    book.get(&(base.to_string(), quote.to_string())).copied()
}

/// Picks the canonical orientation of a sorted triple, or `None` when a leg is missing.
pub fn canonical_triangle(book: &QuoteBook, key: [&str; 3]) -> Option<Triangle> {
    let oriented = |[i, j, k]: [usize; 3]| (key[i], key[j], key[k]);

    for orientation in ORIENTATIONS {
        let (a, b, c) = oriented(orientation);
        if let (Some(ab), Some(bc), Some(ac)) =
            (lookup(book, a, b), lookup(book, b, c), lookup(book, a, c))
        {
            return Some(Triangle {
                legs: [
                    CurrencyPair::new(a, b),
                    CurrencyPair::new(b, c),
                    CurrencyPair::new(a, c),
                ],
                implied: ab * bc,
                direct: ac,
                inverted: false,
            });
        }
    }

    for orientation in ORIENTATIONS {
        let (a, b, c) = oriented(orientation);
        if let (Some(ab), Some(bc), Some(ca)) =
            (lookup(book, a, b), lookup(book, b, c), lookup(book, c, a))
        {
            return Some(Triangle {
                legs: [
                    CurrencyPair::new(a, b),
                    CurrencyPair::new(b, c),
                    CurrencyPair::new(c, a),
                ],
                implied: ab * bc,
                direct: 1.0 / ca,
                inverted: true,
            });
        }
    }
    None
}
