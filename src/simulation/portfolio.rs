// src/simulation/portfolio.rs
//! Paper portfolio: the ledger of simulated trades and the counters derived from it

use crate::arbitrage::opportunity::OpportunityType;
use crate::market::CurrencyPair;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    Triangular,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "buy"),
            TradeAction::Sell => write!(f, "sell"),
            TradeAction::Triangular => write!(f, "triangular"),
        }
    }
}

/// One executed paper trade leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub opportunity_id: String,
    #[serde(rename = "type")]
    pub kind: OpportunityType,
    pub currency_pairs: Vec<CurrencyPair>,
    pub action: TradeAction,
    pub broker: String,
    pub amount: f64,
    pub rate: f64,
    pub profit: f64,
    pub execution_time: DateTime<Utc>,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn executed(
        opportunity_id: &str,
        kind: OpportunityType,
        currency_pairs: Vec<CurrencyPair>,
        action: TradeAction,
        broker: &str,
        amount: f64,
        rate: f64,
        profit: f64,
        execution_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            opportunity_id: opportunity_id.to_string(),
            kind,
            currency_pairs,
            action,
            broker: broker.to_string(),
            amount,
            rate,
            profit,
            execution_time,
        }
    }
}

/// Trades executed so far plus the opportunities they came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperPortfolio {
    pub starting_capital: f64,
    trades: Vec<Trade>,
    executed_opportunities: HashSet<String>,
}

impl PaperPortfolio {
    pub fn new(starting_capital: f64) -> Self {
        Self {
            starting_capital,
            ..Self::default()
        }
    }

    pub fn record(&mut self, trades: Vec<Trade>) {
        for trade in trades {
            self.executed_opportunities.insert(trade.opportunity_id.clone());
            self.trades.push(trade);
        }
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn is_executed(&self, opportunity_id: &str) -> bool {
        self.executed_opportunities.contains(opportunity_id)
    }

    pub fn executed_opportunities(&self) -> &HashSet<String> {
        &self.executed_opportunities
    }

    /// Sum of losses (as a positive number) on trades executed since UTC midnight of `now`.
    pub fn daily_loss(&self, now: DateTime<Utc>) -> f64 {
        let start_of_day = now.date_naive().and_hms_opt(0, 0, 0).map(|d| d.and_utc());
        self.trades
            .iter()
            .filter(|t| start_of_day.map_or(true, |start| t.execution_time >= start))
            .filter(|t| t.profit < 0.0)
            .map(|t| t.profit.abs())
            .sum()
    }

    /// Trade legs executed within the hour before `now`.
    pub fn hourly_trade_count(&self, now: DateTime<Utc>) -> usize {
        let one_hour_ago = now - Duration::hours(1);
        self.trades
            .iter()
            .filter(|t| t.execution_time >= one_hour_ago)
            .count()
    }

    /// Up to `limit` trades from the last hour, newest first.
    pub fn recent_trades(&self, now: DateTime<Utc>, limit: usize) -> Vec<Trade> {
        let one_hour_ago = now - Duration::hours(1);
        let mut recent: Vec<Trade> = self
            .trades
            .iter()
            .filter(|t| t.execution_time >= one_hour_ago)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.execution_time.cmp(&a.execution_time));
        recent.truncate(limit);
        recent
    }

    pub fn total_profit(&self) -> f64 {
        self.trades.iter().map(|t| t.profit).sum()
    }

    pub fn current_balance(&self) -> f64 {
        self.starting_capital + self.total_profit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use chrono::TimeZone;

    fn trade(opportunity_id: &str, profit: f64, at: DateTime<Utc>) -> Trade {
        Trade::executed(
            opportunity_id,
            OpportunityType::Spatial,
            vec![CurrencyPair::new("EUR", "USD")],
            TradeAction::Sell,
            "FXCM",
            200.0,
            1.086,
            profit,
            at,
        )
    }

    #[test]
    fn test_daily_loss_only_counts_today_losses() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let mut portfolio = PaperPortfolio::new(10_000.0);
        portfolio.record(vec![
            trade("a", -3.0, now - Duration::hours(1)),
            trade("b", 5.0, now - Duration::hours(2)),
            trade("c", -7.0, now - Duration::days(1)),
        ]);

        assert_approx_eq!(portfolio.daily_loss(now), 3.0);
        assert_approx_eq!(portfolio.total_profit(), -5.0);
        assert_approx_eq!(portfolio.current_balance(), 9_995.0);
    }

    #[test]
    fn test_hourly_window_and_recent_order() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let mut portfolio = PaperPortfolio::new(10_000.0);
        portfolio.record(vec![
            trade("a", 1.0, now - Duration::minutes(50)),
            trade("b", 1.0, now - Duration::minutes(10)),
            trade("c", 1.0, now - Duration::minutes(61)),
        ]);

        assert_eq!(portfolio.hourly_trade_count(now), 2);
        let recent = portfolio.recent_trades(now, 10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].opportunity_id, "b");
        assert!(portfolio.is_executed("c"));
        assert!(!portfolio.is_executed("d"));
    }
}
