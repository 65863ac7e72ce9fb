use crate::error::{ArbError, Result};
use crate::simulation::config::AutoTradeConfig;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Minimum spatial profit, as a fraction (0.00001 = 0.001%).
    pub spatial_min_profit: f64,
    /// Minimum triangular profit, as a fraction.
    pub triangular_min_profit: f64,
    pub max_results: usize,
    pub cycle_interval_ms: u64,
    pub error_backoff_ms: u64,
    pub included_brokers: Vec<String>,
    pub excluded_brokers: Vec<String>,
    pub included_pairs: Vec<String>,
    pub simulator_seed: Option<u64>,
    pub log_level: String,
    pub paper_trading: bool,
    pub auto_trade: AutoTradeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            spatial_min_profit: 0.00001,
            triangular_min_profit: 0.00002,
            max_results: 10,
            cycle_interval_ms: 1000,
            error_backoff_ms: 5000,
            included_brokers: Vec::new(),
            excluded_brokers: Vec::new(),
            included_pairs: Vec::new(),
            simulator_seed: None,
            log_level: "info".to_string(),
            paper_trading: false,
            auto_trade: AutoTradeConfig::default(),
        }
    }
}

impl Config {
    /// Reads every setting from the process environment, defaulting the unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let auto = defaults.auto_trade.clone();

        let config = Config {
            spatial_min_profit: parse_or(&lookup, "SPATIAL_MIN_PROFIT", defaults.spatial_min_profit)?,
            triangular_min_profit: parse_or(&lookup, "TRIANGULAR_MIN_PROFIT", defaults.triangular_min_profit)?,
            max_results: parse_or(&lookup, "MAX_RESULTS", defaults.max_results)?,
            cycle_interval_ms: parse_or(&lookup, "CYCLE_INTERVAL_MS", defaults.cycle_interval_ms)?,
            error_backoff_ms: parse_or(&lookup, "ERROR_BACKOFF_MS", defaults.error_backoff_ms)?,
            included_brokers: list_or(&lookup, "INCLUDED_BROKERS", Vec::new()),
            excluded_brokers: list_or(&lookup, "EXCLUDED_BROKERS", Vec::new()),
            included_pairs: list_or(&lookup, "INCLUDED_PAIRS", Vec::new()),
            simulator_seed: match non_empty(&lookup, "SIMULATOR_SEED") {
                Some(raw) => Some(parse_value("SIMULATOR_SEED", &raw)?),
                None => None,
            },
            log_level: non_empty(&lookup, "LOG_LEVEL").unwrap_or(defaults.log_level),
            paper_trading: parse_or(&lookup, "PAPER_TRADING", defaults.paper_trading)?,
            auto_trade: AutoTradeConfig {
                starting_capital: parse_or(&lookup, "STARTING_CAPITAL", auto.starting_capital)?,
                auto_min_profit_pct: parse_or(&lookup, "AUTO_MIN_PROFIT_PCT", auto.auto_min_profit_pct)?,
                auto_max_risk_pct: parse_or(&lookup, "AUTO_MAX_RISK_PCT", auto.auto_max_risk_pct)?,
                auto_min_confidence: parse_or(&lookup, "AUTO_MIN_CONFIDENCE", auto.auto_min_confidence)?,
                auto_max_trades_per_hour: parse_or(
                    &lookup,
                    "AUTO_MAX_TRADES_PER_HOUR",
                    auto.auto_max_trades_per_hour,
                )?,
                auto_max_daily_loss: parse_or(&lookup, "AUTO_MAX_DAILY_LOSS", auto.auto_max_daily_loss)?,
                auto_preferred_pairs: list_or(&lookup, "AUTO_PREFERRED_PAIRS", auto.auto_preferred_pairs),
                auto_excluded_brokers: list_or(&lookup, "AUTO_EXCLUDED_BROKERS", auto.auto_excluded_brokers),
                auto_trade_spatial: parse_or(&lookup, "AUTO_TRADE_SPATIAL", auto.auto_trade_spatial)?,
                auto_trade_triangular: parse_or(&lookup, "AUTO_TRADE_TRIANGULAR", auto.auto_trade_triangular)?,
                auto_max_trades_per_cycle: parse_or(
                    &lookup,
                    "AUTO_MAX_TRADES_PER_CYCLE",
                    auto.auto_max_trades_per_cycle,
                )?,
            },
        };
        Ok(config)
    }

    /// Rejects settings the detection loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if !(self.spatial_min_profit >= 0.0) || !self.spatial_min_profit.is_finite() {
            problems.push(format!("SPATIAL_MIN_PROFIT must be non-negative, got {}", self.spatial_min_profit));
        }
        if !(self.triangular_min_profit >= 0.0) || !self.triangular_min_profit.is_finite() {
            problems.push(format!(
                "TRIANGULAR_MIN_PROFIT must be non-negative, got {}",
                self.triangular_min_profit
            ));
        }
        if self.max_results == 0 {
            problems.push("MAX_RESULTS must be at least 1".to_string());
        }
        if self.cycle_interval_ms == 0 {
            problems.push("CYCLE_INTERVAL_MS must be positive".to_string());
        }
        if self.paper_trading {
            problems.extend(self.auto_trade.problems());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ArbError::ConfigError(problems.join("; ")))
        }
    }

    pub fn log_settings(&self) {
        log::info!("Application Configuration Loaded:");
        log::info!(
            "  thresholds: spatial {:.6}, triangular {:.6}",
            self.spatial_min_profit,
            self.triangular_min_profit
        );
        log::info!(
            "  max results {}, cycle {} ms, error backoff {} ms",
            self.max_results,
            self.cycle_interval_ms,
            self.error_backoff_ms
        );
        if !self.included_brokers.is_empty() || !self.excluded_brokers.is_empty() {
            log::info!(
                "  brokers: include {:?}, exclude {:?}",
                self.included_brokers,
                self.excluded_brokers
            );
        }
        if !self.included_pairs.is_empty() {
            log::info!("  pairs: {:?}", self.included_pairs);
        }
        if let Some(seed) = self.simulator_seed {
            log::info!("  simulator seed {}", seed);
        }
        if self.paper_trading {
            log::info!("  paper trading ON: {:?}", self.auto_trade);
        } else {
            log::debug!("  paper trading off");
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| ArbError::ConfigError(format!("{} has an invalid value '{}'", key, raw)))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match non_empty(lookup, key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn list_or<F>(lookup: &F, key: &str, default: Vec<String>) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        None => default,
    }
}
