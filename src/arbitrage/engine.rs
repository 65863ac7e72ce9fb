// src/arbitrage/engine.rs

use crate::{
    arbitrage::{
        detector::ArbitrageDetector,
        opportunity::{OpportunitiesUpdate, Opportunity},
        types::DetectionMetrics,
    },
    config::{Config, ConfigSource},
    error::{ArbError, Result},
    market::RateSnapshotProvider,
    simulation::{PaperTrader, PerformanceSummary, TradingStatus},
    utils::timing::{PerformanceTracker, Timer},
};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::{broadcast, watch, Mutex, RwLock};

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// The list published by one cycle. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedOpportunities {
    pub cycle: u64,
    pub published_at: DateTime<Utc>,
    pub opportunities: Vec<Opportunity>,
}

impl PublishedOpportunities {
    fn initial() -> Self {
        Self {
            cycle: 0,
            published_at: Utc::now(),
            opportunities: Vec::new(),
        }
    }
}

/// Periodic driver around the detection core: pulls a snapshot, runs detection with the
/// settings of that instant, publishes the ranked list, then hands it to paper trading.
pub struct DetectionLoop {
    provider: Arc<dyn RateSnapshotProvider>,
    config_source: Arc<dyn ConfigSource>,
    active_config: RwLock<Config>,
    published_tx: watch::Sender<Arc<PublishedOpportunities>>,
    updates_tx: broadcast::Sender<OpportunitiesUpdate>,
    paper_trader: Mutex<Option<PaperTrader>>,
    metrics: Mutex<DetectionMetrics>,
    performance: Mutex<PerformanceTracker>,
    cycle_counter: AtomicU64,
}

impl DetectionLoop {
    pub fn new(provider: Arc<dyn RateSnapshotProvider>, config_source: Arc<dyn ConfigSource>) -> Self {
        let (published_tx, _) = watch::channel(Arc::new(PublishedOpportunities::initial()));
        let (updates_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        info!("Detection loop created with snapshot provider '{}'", provider.name());
        Self {
            provider,
            config_source,
            active_config: RwLock::new(Config::default()),
            published_tx,
            updates_tx,
            paper_trader: Mutex::new(None),
            metrics: Mutex::new(DetectionMetrics::new()),
            performance: Mutex::new(PerformanceTracker::new()),
            cycle_counter: AtomicU64::new(0),
        }
    }

    /// Wire messages, one per published cycle (failed cycles publish an empty list).
    pub fn subscribe(&self) -> broadcast::Receiver<OpportunitiesUpdate> {
        self.updates_tx.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<Arc<PublishedOpportunities>> {
        self.published_tx.subscribe()
    }

    /// The most recently published list.
    pub fn current(&self) -> Arc<PublishedOpportunities> {
        self.published_tx.borrow().clone()
    }

    pub async fn metrics(&self) -> DetectionMetrics {
        self.metrics.lock().await.clone()
    }

    /// The last configuration that loaded and validated.
    pub async fn active_config(&self) -> Config {
        self.active_config.read().await.clone()
    }

    pub async fn trading_status(&self, now: DateTime<Utc>) -> Result<TradingStatus> {
        let guard = self.paper_trader.lock().await;
        let trader = guard
            .as_ref()
            .ok_or_else(|| ArbError::ExecutionDisabled("paper trading is not enabled".to_string()))?;
        Ok(trader.status(now))
    }

    pub async fn trading_performance(&self) -> Result<PerformanceSummary> {
        let guard = self.paper_trader.lock().await;
        let trader = guard
            .as_ref()
            .ok_or_else(|| ArbError::ExecutionDisabled("paper trading is not enabled".to_string()))?;
        Ok(trader.performance())
    }

    pub async fn log_performance(&self) {
        self.performance.lock().await.print_summary();
        if let Ok(summary) = self.trading_performance().await {
            summary.log_summary();
        }
    }

    /// Runs one detection cycle and publishes its result.
    ///
    /// Configuration is reloaded and revalidated first; an invalid configuration fails
    /// the cycle before any snapshot is taken.
    pub async fn run_cycle(&self) -> Result<Arc<PublishedOpportunities>> {
        let mut timer = Timer::start("detection_cycle");

        let config = self.config_source.load()?;
        let detector = ArbitrageDetector::from_config(&config)?;
        {
            let mut active = self.active_config.write().await;
            if *active != config {
                debug!("Configuration changed, applying from this cycle");
                *active = config.clone();
            }
        }
        timer.checkpoint("config");

        let snapshot = self.provider.snapshot().await?;
        timer.checkpoint("snapshot");

        // rayon work stays off the async workers
        let previous = self.current();
        let opportunities = tokio::task::spawn_blocking(move || {
            detector.run_cycle(&snapshot, Some(&previous.opportunities))
        })
        .await
        .map_err(|e| ArbError::Unknown(format!("detection task failed: {}", e)))?;
        timer.checkpoint("detect");

        let published = self.publish(opportunities);
        timer.checkpoint("publish");

        if config.paper_trading {
            let mut guard = self.paper_trader.lock().await;
            let trader = guard.get_or_insert_with(|| PaperTrader::new(config.auto_trade.clone()));
            trader.update_config(config.auto_trade.clone());
            let trades = trader.process_cycle(&published.opportunities, Utc::now());
            if !trades.is_empty() {
                info!("Cycle #{}: {} paper trade legs executed", published.cycle, trades.len());
            }
            timer.checkpoint("paper_trading");
        }

        self.performance.lock().await.record_timer(&timer);
        let duration = timer.finish_with_threshold(config.cycle_interval_ms);
        self.metrics
            .lock()
            .await
            .record_cycle(duration, published.opportunities.len(), published.published_at);

        Ok(published)
    }

    fn publish(&self, opportunities: Vec<Opportunity>) -> Arc<PublishedOpportunities> {
        let cycle = self.cycle_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let published = Arc::new(PublishedOpportunities {
            cycle,
            published_at: Utc::now(),
            opportunities,
        });
        self.published_tx.send_replace(published.clone());

        for opp in &published.opportunities {
            opp.log_summary();
        }
        // No subscribers is fine; the watch channel still holds the list.
        let _ = self
            .updates_tx
            .send(OpportunitiesUpdate::new(published.opportunities.clone()));
        published
    }

    /// Drives cycles until `max_cycles` have run, `shutdown` flips to true, or its sender
    /// is dropped.
    /// A failed cycle clears the published list and waits `error_backoff_ms` before retrying.
    pub async fn run(&self, max_cycles: Option<u64>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut completed: u64 = 0;
        info!("Detection loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let cycle = self.run_cycle();
            tokio::pin!(cycle);
            let outcome = loop {
                tokio::select! {
                    outcome = &mut cycle => break Some(outcome),
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break None;
                        }
                    }
                }
            };
            let Some(outcome) = outcome else {
                info!("Shutdown requested mid-cycle, discarding it");
                break;
            };

            let config = self.active_config().await;
            let delay = match outcome {
                Ok(published) => {
                    debug!(
                        "Cycle #{} published {} opportunities",
                        published.cycle,
                        published.opportunities.len()
                    );
                    Duration::from_millis(config.cycle_interval_ms)
                }
                Err(e) => {
                    self.metrics.lock().await.record_failure();
                    if e.is_recoverable() {
                        warn!("Detection cycle failed ({:?}): {}", e.categorize(), e);
                    } else {
                        error!("Detection cycle failed ({:?}): {}", e.categorize(), e);
                    }
                    self.publish(Vec::new());
                    Duration::from_millis(config.error_backoff_ms)
                }
            };

            completed += 1;
            if max_cycles.map_or(false, |max| completed >= max) {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Detection loop stopped after {} cycles", completed);
        self.log_performance().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SharedConfigSource;
    use crate::market::{RateSnapshot, StaticSnapshotProvider};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct FailingProvider;

    #[async_trait]
    impl RateSnapshotProvider for FailingProvider {
        async fn snapshot(&self) -> Result<RateSnapshot> {
            Err(ArbError::SnapshotUnavailable("feed down".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct SlowProvider {
        rates: RateSnapshot,
        delay: Duration,
    }

    #[async_trait]
    impl RateSnapshotProvider for SlowProvider {
        async fn snapshot(&self) -> Result<RateSnapshot> {
            tokio::time::sleep(self.delay).await;
            Ok(self.rates.clone().with_captured_at(Utc::now()))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn slow_loop() -> DetectionLoop {
        let mut config = Config::default();
        config.cycle_interval_ms = 5;
        let provider = SlowProvider {
            rates: rates(),
            delay: Duration::from_millis(60),
        };
        DetectionLoop::new(Arc::new(provider), Arc::new(SharedConfigSource::new(config)))
    }

    fn rates() -> RateSnapshot {
        RateSnapshot::empty()
            .with_rate("OANDA", "EUR/USD", 1.0850)
            .with_rate("FXCM", "EUR/USD", 1.0860)
    }

    #[tokio::test]
    async fn test_cycle_publishes_fresh_ids() {
        let source = Arc::new(SharedConfigSource::new(Config::default()));
        let detection = DetectionLoop::new(Arc::new(StaticSnapshotProvider::new(rates())), source);

        let first = detection.run_cycle().await.unwrap();
        let second = detection.run_cycle().await.unwrap();

        assert_eq!(first.cycle, 1);
        assert_eq!(second.cycle, 2);
        assert_eq!(first.opportunities.len(), 1);
        assert_eq!(second.opportunities.len(), 1);
        assert_ne!(first.opportunities[0].id, second.opportunities[0].id);
        assert_eq!(detection.current().cycle, 2);
        assert_eq!(detection.metrics().await.total_detection_cycles, 2);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_cycle() {
        let source = Arc::new(SharedConfigSource::new(Config::default()));
        let detection = DetectionLoop::new(Arc::new(StaticSnapshotProvider::new(rates())), source.clone());

        source.update(|c| c.max_results = 0).unwrap();
        let err = detection.run_cycle().await.unwrap_err();
        assert!(matches!(err, ArbError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_failed_cycle_clears_published_list() {
        let mut config = Config::default();
        config.error_backoff_ms = 1;
        let source = Arc::new(SharedConfigSource::new(config));
        let detection = DetectionLoop::new(Arc::new(FailingProvider), source);
        let (_tx, rx) = watch::channel(false);

        detection.run(Some(2), rx).await.unwrap();
        let metrics = detection.metrics().await;
        assert_eq!(metrics.failed_detection_cycles, 2);
        assert_eq!(metrics.total_detection_cycles, 0);
        assert!(detection.current().opportunities.is_empty());
        assert_eq!(detection.current().cycle, 2);
    }

    #[tokio::test]
    async fn test_non_shutdown_signal_mid_cycle_is_ignored() {
        let detection = slow_loop();
        let (tx, rx) = watch::channel(false);

        let (result, _) = tokio::join!(detection.run(Some(3), rx), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(false).unwrap();
        });

        assert!(result.is_ok());
        assert_eq!(detection.current().cycle, 3);
        assert_eq!(detection.metrics().await.total_detection_cycles, 3);
    }

    #[tokio::test]
    async fn test_shutdown_mid_cycle_discards_it() {
        let detection = slow_loop();
        let (tx, rx) = watch::channel(false);

        let (result, _) = tokio::join!(detection.run(Some(3), rx), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(true).unwrap();
        });

        assert!(result.is_ok());
        assert_eq!(detection.current().cycle, 0);
        assert_eq!(detection.metrics().await.total_detection_cycles, 0);
    }

    #[tokio::test]
    async fn test_trading_queries_require_paper_trading() {
        let source = Arc::new(SharedConfigSource::new(Config::default()));
        let detection = DetectionLoop::new(Arc::new(StaticSnapshotProvider::new(rates())), source);
        detection.run_cycle().await.unwrap();

        assert!(matches!(
            detection.trading_performance().await,
            Err(ArbError::ExecutionDisabled(_))
        ));
    }
}
