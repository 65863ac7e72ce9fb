//! Paper execution of published opportunities
//!
//! The trader owns every cross-cycle counter (daily loss, hourly trade count, executed
//! opportunity ids); the detection core stays stateless.

use super::{
    analytics::{PerformanceSummary, SimulationAnalytics},
    config::AutoTradeConfig,
    portfolio::{PaperPortfolio, Trade, TradeAction},
};
use crate::{
    arbitrage::opportunity::{Opportunity, OpportunityType, DEFAULT_POSITION_SIZE},
    error::{ArbError, Result},
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;

/// Whether `opp` meets the autonomous trading criteria in `config`.
pub fn is_opportunity_eligible(
    opp: &Opportunity,
    config: &AutoTradeConfig,
    executed_ids: &HashSet<String>,
) -> bool {
    if opp.profit_percentage / 100.0 < config.auto_min_profit_pct {
        return false;
    }
    if opp.confidence_score < config.auto_min_confidence {
        return false;
    }
    let type_enabled = match opp.kind {
        OpportunityType::Spatial => config.auto_trade_spatial,
        OpportunityType::Triangular => config.auto_trade_triangular,
    };
    if !type_enabled {
        return false;
    }
    if !config.auto_preferred_pairs.is_empty()
        && !config
            .auto_preferred_pairs
            .iter()
            .any(|pair| opp.involves_pair(&pair.trim().to_uppercase()))
    {
        return false;
    }
    if config
        .auto_excluded_brokers
        .iter()
        .any(|broker| opp.involves_broker(broker.trim()))
    {
        return false;
    }
    !executed_ids.contains(&opp.id)
}

/// Snapshot of the trader's limits, as reported to operators.
#[derive(Debug, Clone, Serialize)]
pub struct TradingStatus {
    pub auto_trading_active: bool,
    pub daily_loss: f64,
    pub daily_loss_limit: f64,
    pub daily_loss_limit_hit: bool,
    pub hourly_trades: usize,
    pub hourly_trades_limit: usize,
    pub hourly_limit_hit: bool,
    pub recent_trades: Vec<Trade>,
}

#[derive(Debug)]
pub struct PaperTrader {
    config: AutoTradeConfig,
    portfolio: PaperPortfolio,
    analytics: SimulationAnalytics,
}

impl PaperTrader {
    pub fn new(config: AutoTradeConfig) -> Self {
        info!(
            "Paper trader started with capital {:.2}, {:.1}% per trade, max {} trades/hour",
            config.starting_capital,
            config.auto_max_risk_pct * 100.0,
            config.auto_max_trades_per_hour
        );
        Self {
            portfolio: PaperPortfolio::new(config.starting_capital),
            analytics: SimulationAnalytics::new(),
            config,
        }
    }

    pub fn config(&self) -> &AutoTradeConfig {
        &self.config
    }

    /// Applies new criteria from the next cycle on. The trade ledger is kept.
    pub fn update_config(&mut self, config: AutoTradeConfig) {
        if config != self.config {
            debug!("Paper trader criteria updated: {:?}", config);
            self.portfolio.starting_capital = config.starting_capital;
            self.config = config;
        }
    }

    pub fn portfolio(&self) -> &PaperPortfolio {
        &self.portfolio
    }

    pub fn analytics(&self) -> &SimulationAnalytics {
        &self.analytics
    }

    /// `LimitReached` when the daily loss or hourly trade limit is exhausted.
    pub fn check_limits(&self, now: DateTime<Utc>) -> Result<()> {
        let daily_loss = self.portfolio.daily_loss(now);
        if daily_loss >= self.config.daily_loss_limit() {
            return Err(ArbError::LimitReached(format!(
                "daily loss {:.2} reached limit {:.2}",
                daily_loss,
                self.config.daily_loss_limit()
            )));
        }
        let hourly = self.portfolio.hourly_trade_count(now);
        if hourly >= self.config.auto_max_trades_per_hour {
            return Err(ArbError::LimitReached(format!(
                "{} trades in the last hour (limit {})",
                hourly, self.config.auto_max_trades_per_hour
            )));
        }
        Ok(())
    }

    /// Executes up to `auto_max_trades_per_cycle` eligible opportunities from one
    /// published list, in published (ranked) order.
    pub fn process_cycle(&mut self, opportunities: &[Opportunity], now: DateTime<Utc>) -> Vec<Trade> {
        self.analytics.cycles_processed += 1;
        if let Err(e) = self.check_limits(now) {
            info!("Skipping paper trades this cycle: {}", e);
            self.analytics.cycles_blocked_by_limits += 1;
            return Vec::new();
        }

        let mut eligible = Vec::new();
        for opp in opportunities {
            let ok = is_opportunity_eligible(opp, &self.config, self.portfolio.executed_opportunities());
            self.analytics.record_opportunity_analyzed(ok);
            if ok {
                eligible.push(opp);
            }
        }

        let mut executed = Vec::new();
        for opp in eligible.into_iter().take(self.config.auto_max_trades_per_cycle) {
            match self.execute(opp, now) {
                Ok(trades) => {
                    info!(
                        "Executed paper trade for opportunity {} ({} legs)",
                        opp.id,
                        trades.len()
                    );
                    executed.extend(trades);
                }
                Err(e) => warn!("Could not execute opportunity {}: {}", opp.id, e),
            }
        }
        executed
    }

    /// Books the trade legs for a single opportunity.
    pub fn execute(&mut self, opp: &Opportunity, now: DateTime<Utc>) -> Result<Vec<Trade>> {
        if self.portfolio.is_executed(&opp.id) {
            return Err(ArbError::ExecutionDisabled(format!(
                "opportunity {} already executed",
                opp.id
            )));
        }

        let position_value = self.config.position_value();
        let profit = opp.profit_potential * (position_value / DEFAULT_POSITION_SIZE);

        let trades = match opp.kind {
            OpportunityType::Spatial => {
                let (Some(buy_broker), Some(sell_broker), Some(buy_rate), Some(sell_rate)) = (
                    opp.buy_broker.as_deref(),
                    opp.sell_broker.as_deref(),
                    opp.buy_rate,
                    opp.sell_rate,
                ) else {
                    return Err(ArbError::Unknown(format!(
                        "spatial opportunity {} has no buy/sell legs",
                        opp.id
                    )));
                };
                vec![
                    Trade::executed(
                        &opp.id,
                        opp.kind,
                        opp.currency_pairs.clone(),
                        TradeAction::Buy,
                        buy_broker,
                        position_value,
                        buy_rate,
                        0.0,
                        now,
                    ),
                    Trade::executed(
                        &opp.id,
                        opp.kind,
                        opp.currency_pairs.clone(),
                        TradeAction::Sell,
                        sell_broker,
                        position_value,
                        sell_rate,
                        profit,
                        now,
                    ),
                ]
            }
            OpportunityType::Triangular => {
                let broker = opp.brokers.first().ok_or_else(|| {
                    ArbError::Unknown(format!("triangular opportunity {} has no broker", opp.id))
                })?;
                vec![Trade::executed(
                    &opp.id,
                    opp.kind,
                    opp.currency_pairs.clone(),
                    TradeAction::Triangular,
                    broker,
                    position_value,
                    1.0,
                    profit,
                    now,
                )]
            }
        };

        self.portfolio.record(trades.clone());
        self.analytics.record_execution();
        Ok(trades)
    }

    pub fn status(&self, now: DateTime<Utc>) -> TradingStatus {
        let daily_loss = self.portfolio.daily_loss(now);
        let daily_loss_limit = self.config.daily_loss_limit();
        let hourly_trades = self.portfolio.hourly_trade_count(now);
        let daily_loss_limit_hit = daily_loss >= daily_loss_limit;
        let hourly_limit_hit = hourly_trades >= self.config.auto_max_trades_per_hour;

        TradingStatus {
            auto_trading_active: !daily_loss_limit_hit && !hourly_limit_hit,
            daily_loss,
            daily_loss_limit,
            daily_loss_limit_hit,
            hourly_trades,
            hourly_trades_limit: self.config.auto_max_trades_per_hour,
            hourly_limit_hit,
            recent_trades: self.portfolio.recent_trades(now, 10),
        }
    }

    pub fn performance(&self) -> PerformanceSummary {
        PerformanceSummary::from_portfolio(&self.portfolio)
    }
}
