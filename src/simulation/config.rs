//! Configuration for autonomous paper trading

use serde::{Deserialize, Serialize};

/// Criteria and limits for executing detected opportunities on paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoTradeConfig {
    pub starting_capital: f64,
    /// Minimum profit as a fraction (0.005 = 0.5%).
    pub auto_min_profit_pct: f64,
    /// Share of capital committed per trade.
    pub auto_max_risk_pct: f64,
    pub auto_min_confidence: f64,
    pub auto_max_trades_per_hour: usize,
    /// Share of capital that may be lost in one UTC day before trading stops.
    pub auto_max_daily_loss: f64,
    pub auto_preferred_pairs: Vec<String>,
    pub auto_excluded_brokers: Vec<String>,
    pub auto_trade_spatial: bool,
    pub auto_trade_triangular: bool,
    pub auto_max_trades_per_cycle: usize,
}

impl Default for AutoTradeConfig {
    fn default() -> Self {
        Self {
            starting_capital: 10_000.0,
            auto_min_profit_pct: 0.005,
            auto_max_risk_pct: 0.02,
            auto_min_confidence: 0.8,
            auto_max_trades_per_hour: 10,
            auto_max_daily_loss: 0.05,
            auto_preferred_pairs: vec!["EUR/USD".into(), "GBP/USD".into(), "USD/JPY".into()],
            auto_excluded_brokers: Vec::new(),
            auto_trade_spatial: true,
            auto_trade_triangular: true,
            auto_max_trades_per_cycle: 3,
        }
    }
}

impl AutoTradeConfig {
    /// Notional committed to each executed opportunity.
    pub fn position_value(&self) -> f64 {
        self.starting_capital * self.auto_max_risk_pct
    }

    pub fn daily_loss_limit(&self) -> f64 {
        self.auto_max_daily_loss * self.starting_capital
    }

    /// Range checks, returned as human-readable problems.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(self.starting_capital > 0.0) {
            problems.push(format!("STARTING_CAPITAL must be positive, got {}", self.starting_capital));
        }
        if !(0.01..=1.0).contains(&self.auto_max_risk_pct) {
            problems.push(format!("AUTO_MAX_RISK_PCT must be in [0.01, 1.0], got {}", self.auto_max_risk_pct));
        }
        if !(0.0..=1.0).contains(&self.auto_min_confidence) {
            problems.push(format!("AUTO_MIN_CONFIDENCE must be in [0, 1], got {}", self.auto_min_confidence));
        }
        if !(self.auto_min_profit_pct >= 0.0) {
            problems.push(format!("AUTO_MIN_PROFIT_PCT must be non-negative, got {}", self.auto_min_profit_pct));
        }
        if !(0.0..=1.0).contains(&self.auto_max_daily_loss) {
            problems.push(format!("AUTO_MAX_DAILY_LOSS must be in [0, 1], got {}", self.auto_max_daily_loss));
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = AutoTradeConfig::default();
        assert!(config.problems().is_empty());
        assert_approx_eq!(config.position_value(), 200.0);
        assert_approx_eq!(config.daily_loss_limit(), 500.0);
    }

    #[test]
    fn test_out_of_range_values_reported() {
        let config = AutoTradeConfig {
            auto_max_risk_pct: 2.0,
            auto_min_confidence: -0.1,
            ..AutoTradeConfig::default()
        };
        assert_eq!(config.problems().len(), 2);
    }
}
