// src/arbitrage/types.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Performance tracking metrics for the detection loop
#[derive(Debug, Default, Clone, Serialize)]
pub struct DetectionMetrics {
    pub total_detection_cycles: u64,
    pub failed_detection_cycles: u64,
    pub total_opportunities_published: u64,
    pub average_detection_time_ms: f64,
    pub last_detection_timestamp: Option<DateTime<Utc>>,
}

impl DetectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed cycle and folds its duration into the running average.
    pub fn record_cycle(&mut self, duration: Duration, published: usize, at: DateTime<Utc>) {
        let completed = self.total_detection_cycles as f64;
        let ms = duration.as_secs_f64() * 1000.0;
        self.average_detection_time_ms = (self.average_detection_time_ms * completed + ms) / (completed + 1.0);
        self.total_detection_cycles += 1;
        self.total_opportunities_published += published as u64;
        self.last_detection_timestamp = Some(at);
    }

    pub fn record_failure(&mut self) {
        self.failed_detection_cycles += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_running_average() {
        let mut metrics = DetectionMetrics::new();
        metrics.record_cycle(Duration::from_millis(10), 3, Utc::now());
        metrics.record_cycle(Duration::from_millis(20), 2, Utc::now());
        metrics.record_failure();

        assert_eq!(metrics.total_detection_cycles, 2);
        assert_eq!(metrics.failed_detection_cycles, 1);
        assert_eq!(metrics.total_opportunities_published, 5);
        assert_approx_eq!(metrics.average_detection_time_ms, 15.0);
        assert!(metrics.last_detection_timestamp.is_some());
    }
}
