// src/arbitrage/detector.rs
use crate::{
    arbitrage::{
        filter::SnapshotFilter,
        opportunity::{Opportunity, OpportunityType},
        ranker::OpportunityRanker,
        spatial::detect_spatial,
        triangular::detect_triangular,
    },
    config::Config,
    error::{ArbError, Result},
    market::RateSnapshot,
};
use chrono::Utc;
use log::{debug, info};

/// One full detection pass: filter, scan both ways, rank.
#[derive(Debug, Clone)]
pub struct ArbitrageDetector {
    spatial_min_profit: f64,
    triangular_min_profit: f64,
    ranker: OpportunityRanker,
    filter: SnapshotFilter,
}

impl ArbitrageDetector {
    pub fn new(spatial_min_profit: f64, triangular_min_profit: f64, max_results: usize) -> Result<Self> {
        for (name, value) in [
            ("spatial", spatial_min_profit),
            ("triangular", triangular_min_profit),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ArbError::ConfigError(format!(
                    "{} min profit must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if max_results == 0 {
            return Err(ArbError::ConfigError("max_results must be at least 1".to_string()));
        }
        debug!(
            "ArbitrageDetector initialized with: Spatial Min Profit = {:.6}, Triangular Min Profit = {:.6}, Max Results = {}",
            spatial_min_profit, triangular_min_profit, max_results
        );
        Ok(Self {
            spatial_min_profit,
            triangular_min_profit,
            ranker: OpportunityRanker::new(max_results),
            filter: SnapshotFilter::new(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config.spatial_min_profit,
            config.triangular_min_profit,
            config.max_results,
        )?
        .with_filter(SnapshotFilter::from_lists(
            &config.included_brokers,
            &config.excluded_brokers,
            &config.included_pairs,
        )))
    }

    pub fn with_filter(mut self, filter: SnapshotFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn min_profit_for(&self, kind: OpportunityType) -> f64 {
        match kind {
            OpportunityType::Spatial => self.spatial_min_profit,
            OpportunityType::Triangular => self.triangular_min_profit,
        }
    }

    pub fn max_results(&self) -> usize {
        self.ranker.max_results()
    }

    /// Detects and ranks everything in `snapshot`. `previous` is the list published last
    /// cycle; none of it is ever carried forward.
    pub fn run_cycle(&self, snapshot: &RateSnapshot, previous: Option<&[Opportunity]>) -> Vec<Opportunity> {
        let cycle_started_at = Utc::now();

        if snapshot.is_empty() {
            debug!("Empty snapshot, nothing to scan");
            return Vec::new();
        }

        let snapshot = self.filter.apply(snapshot);
        let (spatial, triangular) = rayon::join(
            || detect_spatial(&snapshot, self.spatial_min_profit),
            || detect_triangular(&snapshot, self.triangular_min_profit),
        );
        let (spatial_found, triangular_found) = (spatial.len(), triangular.len());

        let candidates = spatial
            .into_iter()
            .chain(triangular)
            .filter(|opp| opp.profit_percentage / 100.0 >= self.min_profit_for(opp.kind))
            .map(Ok);

        let ranked = self.ranker.rank_cycle(candidates, previous, cycle_started_at);
        info!(
            "Detection cycle: {} spatial, {} triangular found across {} brokers; publishing {}",
            spatial_found,
            triangular_found,
            snapshot.broker_count(),
            ranked.len()
        );
        ranked
    }
}
