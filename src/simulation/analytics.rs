// src/simulation/analytics.rs
//! Analytics and performance tracking for paper trading

use super::portfolio::PaperPortfolio;
use serde::{Deserialize, Serialize};

/// Running counters kept by the paper trader across cycles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationAnalytics {
    pub cycles_processed: u64,
    pub cycles_blocked_by_limits: u64,
    pub opportunities_analyzed: u64,
    pub opportunities_executed: u64,
    pub opportunities_ineligible: u64,
}

impl SimulationAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_opportunity_analyzed(&mut self, eligible: bool) {
        self.opportunities_analyzed += 1;
        if !eligible {
            self.opportunities_ineligible += 1;
        }
    }

    pub fn record_execution(&mut self) {
        self.opportunities_executed += 1;
    }

    pub fn execution_rate(&self) -> f64 {
        if self.opportunities_analyzed > 0 {
            self.opportunities_executed as f64 / self.opportunities_analyzed as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// Account-level performance of the paper portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub starting_capital: f64,
    pub current_balance: f64,
    pub total_profit: f64,
    pub total_trades: usize,
    /// Share of trade legs with positive profit, in percent.
    pub win_rate: f64,
    pub roi_percentage: f64,
}

impl PerformanceSummary {
    pub fn from_portfolio(portfolio: &PaperPortfolio) -> Self {
        let trades = portfolio.trades();
        let total_profit = portfolio.total_profit();
        let winners = trades.iter().filter(|t| t.profit > 0.0).count();
        let roi_percentage = if portfolio.starting_capital > 0.0 {
            total_profit / portfolio.starting_capital * 100.0
        } else {
            0.0
        };

        Self {
            starting_capital: portfolio.starting_capital,
            current_balance: portfolio.current_balance(),
            total_profit,
            total_trades: trades.len(),
            win_rate: winners as f64 / trades.len().max(1) as f64 * 100.0,
            roi_percentage,
        }
    }

    pub fn log_summary(&self) {
        log::info!(
            "📊 Paper trading: balance {:.2} (start {:.2}) | profit {:.4} | trades {} | win rate {:.1}% | ROI {:.4}%",
            self.current_balance,
            self.starting_capital,
            self.total_profit,
            self.total_trades,
            self.win_rate,
            self.roi_percentage
        );
    }
}
