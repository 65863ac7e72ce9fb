//! Timing utilities for the detection loop
//!
//! `Timer` measures one cycle (with optional checkpoints per stage), and
//! `PerformanceTracker` aggregates stage durations across cycles.

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// A timer for measuring operation durations
#[derive(Debug)]
pub struct Timer {
    start_time: Instant,
    operation_name: String,
    checkpoints: Vec<(String, Instant)>,
}

impl Timer {
    pub fn start(operation_name: &str) -> Self {
        debug!("⏱️ Starting timer for: {}", operation_name);
        Self {
            start_time: Instant::now(),
            operation_name: operation_name.to_string(),
            checkpoints: Vec::new(),
        }
    }

    /// Marks the end of a stage.
    pub fn checkpoint(&mut self, checkpoint_name: &str) {
        let now = Instant::now();
        self.checkpoints.push((checkpoint_name.to_string(), now));
        debug!(
            "📍 {} - {}: {}µs",
            self.operation_name,
            checkpoint_name,
            now.duration_since(self.start_time).as_micros()
        );
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Durations between consecutive checkpoints, starting from the timer start.
    pub fn segments(&self) -> Vec<(String, Duration)> {
        let mut last_time = self.start_time;
        self.checkpoints
            .iter()
            .map(|(name, time)| {
                let segment = time.duration_since(last_time);
                last_time = *time;
                (name.clone(), segment)
            })
            .collect()
    }

    pub fn finish(self) -> Duration {
        let total_duration = self.start_time.elapsed();
        self.log_completion(total_duration);
        total_duration
    }

    /// Finish with a warning if the operation took longer than `threshold_ms`.
    pub fn finish_with_threshold(self, threshold_ms: u64) -> Duration {
        let total_duration = self.start_time.elapsed();
        self.log_completion(total_duration);
        if total_duration.as_millis() > threshold_ms as u128 {
            warn!(
                "⚠️ {} took {}ms (exceeds threshold of {}ms)",
                self.operation_name,
                total_duration.as_millis(),
                threshold_ms
            );
        }
        total_duration
    }

    fn log_completion(&self, total_duration: Duration) {
        debug!(
            "🕐 {} completed in {:.3}ms",
            self.operation_name,
            total_duration.as_secs_f64() * 1000.0
        );
        for (name, segment) in self.segments() {
            debug!("   └─ {}: {:.3}ms", name, segment.as_secs_f64() * 1000.0);
        }
    }
}

/// Aggregated durations per named operation
#[derive(Debug, Default)]
pub struct PerformanceTracker {
    operation_stats: BTreeMap<String, OperationStats>,
}

#[derive(Debug, Clone, Copy)]
pub struct OperationStats {
    pub count: u64,
    pub total_duration: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub last_duration: Duration,
}

impl OperationStats {
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        self.total_duration.div_f64(self.count as f64)
    }
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_operation(&mut self, operation_name: &str, duration: Duration) {
        let stats = self
            .operation_stats
            .entry(operation_name.to_string())
            .or_insert(OperationStats {
                count: 0,
                total_duration: Duration::ZERO,
                min_duration: duration,
                max_duration: duration,
                last_duration: duration,
            });

        stats.count += 1;
        stats.total_duration += duration;
        stats.last_duration = duration;
        stats.min_duration = stats.min_duration.min(duration);
        stats.max_duration = stats.max_duration.max(duration);
    }

    /// Folds every checkpoint segment of `timer` into the per-stage statistics.
    pub fn record_timer(&mut self, timer: &Timer) {
        for (name, segment) in timer.segments() {
            self.record_operation(&name, segment);
        }
    }

    pub fn stats(&self, operation_name: &str) -> Option<OperationStats> {
        self.operation_stats.get(operation_name).copied()
    }

    pub fn get_average_duration(&self, operation_name: &str) -> Option<Duration> {
        self.operation_stats.get(operation_name).map(OperationStats::average)
    }

    pub fn print_summary(&self) {
        if self.operation_stats.is_empty() {
            info!("📊 No performance data available");
            return;
        }
        info!("📊 PERFORMANCE SUMMARY");
        for (operation, stats) in &self.operation_stats {
            info!(
                "📈 {}: Count: {} | Avg: {:.3}ms | Min: {:.3}ms | Max: {:.3}ms | Last: {:.3}ms",
                operation,
                stats.count,
                stats.average().as_secs_f64() * 1000.0,
                stats.min_duration.as_secs_f64() * 1000.0,
                stats.max_duration.as_secs_f64() * 1000.0,
                stats.last_duration.as_secs_f64() * 1000.0
            );
        }
    }
}
