use assert_approx_eq::assert_approx_eq;
use forex_arb_engine::arbitrage::{detect_spatial, detect_triangular, rank, OpportunityType};
use forex_arb_engine::market::{ForexDataSimulator, RateSnapshot};
use pretty_assertions::assert_eq;

fn simulated_snapshots(seed: u64, rounds: usize) -> Vec<RateSnapshot> {
    let simulator = ForexDataSimulator::with_seed(seed);
    (0..rounds)
        .map(|_| simulator.get_live_rates().unwrap())
        .collect()
}

#[test]
fn spatial_results_always_clear_threshold() {
    let _ = env_logger::try_init();
    for snapshot in simulated_snapshots(7, 20) {
        for threshold in [0.0, 0.00001, 0.0002, 0.0005] {
            for opp in detect_spatial(&snapshot, threshold) {
                assert!(opp.profit_percentage / 100.0 >= threshold);
                assert_eq!(opp.kind, OpportunityType::Spatial);
                assert!(opp.is_well_formed());
            }
        }
    }
}

#[test]
fn triangular_legs_come_from_one_broker() {
    for snapshot in simulated_snapshots(11, 10) {
        for opp in detect_triangular(&snapshot, 0.0) {
            assert_eq!(opp.brokers.len(), 1);
            let broker = &opp.brokers[0];
            for pair in &opp.currency_pairs {
                assert!(
                    snapshot.rate(broker, &pair.symbol()).is_ok(),
                    "{} not quoted by {}",
                    pair,
                    broker
                );
            }
        }
    }
}

#[test]
fn triangular_never_repeats_a_currency_set_per_broker() {
    for snapshot in simulated_snapshots(3, 5) {
        let opps = detect_triangular(&snapshot, 0.0);
        let mut keys: Vec<(String, Vec<String>)> = opps
            .iter()
            .map(|o| {
                let mut currencies: Vec<String> = o
                    .currency_pairs
                    .iter()
                    .flat_map(|p| [p.base.clone(), p.quote.clone()])
                    .collect();
                currencies.sort();
                currencies.dedup();
                (o.brokers[0].clone(), currencies)
            })
            .collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }
}

#[test]
fn rank_is_idempotent_over_real_detections() {
    for snapshot in simulated_snapshots(5, 5) {
        let mut all = detect_spatial(&snapshot, 0.0);
        all.extend(detect_triangular(&snapshot, 0.0));
        let once = rank(&all, 10);
        let twice = rank(&all, 10);
        assert_eq!(once, twice);
        assert!(once.len() <= 10);
        assert!(once
            .windows(2)
            .all(|w| w[0].profit_percentage >= w[1].profit_percentage));
    }
}

#[test]
fn documented_spatial_example() {
    let snapshot = RateSnapshot::empty()
        .with_rate("OANDA", "EUR/USD", 1.0850)
        .with_rate("FXCM", "EUR/USD", 1.0860);

    let opps = detect_spatial(&snapshot, 0.00001);
    assert_eq!(opps.len(), 1);
    assert_eq!(opps[0].brokers, vec!["OANDA".to_string(), "FXCM".to_string()]);
    assert_approx_eq!(opps[0].profit_percentage, 0.0921659, 1e-6);
}

#[test]
fn documented_triangular_example() {
    let snapshot = RateSnapshot::empty()
        .with_rate("OANDA", "EUR/USD", 1.2)
        .with_rate("OANDA", "USD/JPY", 100.0)
        .with_rate("OANDA", "EUR/JPY", 121.0);

    let opps = detect_triangular(&snapshot, 0.0001);
    assert_eq!(opps.len(), 1);
    assert_approx_eq!(opps[0].profit_potential, 1.0, 1e-9);
    assert_approx_eq!(opps[0].profit_percentage, 0.826446, 1e-5);
}

#[test]
fn bad_rate_only_affects_its_own_pair() {
    let snapshot = RateSnapshot::empty()
        .with_rate("OANDA", "EUR/USD", 1.0850)
        .with_rate("FXCM", "EUR/USD", -1.0)
        .with_rate("XM", "EUR/USD", 1.0870)
        .with_rate("OANDA", "GBP/USD", 1.2650)
        .with_rate("FXCM", "GBP/USD", 1.2680);

    let opps = detect_spatial(&snapshot, 0.00001);
    assert_eq!(opps.len(), 2);
    for opp in &opps {
        assert!(!opp.brokers.contains(&"FXCM".to_string()) || opp.involves_pair("GBP/USD"));
    }
    let eur = opps.iter().find(|o| o.involves_pair("EUR/USD")).unwrap();
    assert_eq!(eur.brokers, vec!["OANDA".to_string(), "XM".to_string()]);
}
