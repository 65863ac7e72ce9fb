pub mod analytics;
pub mod config;
pub mod engine;
pub mod portfolio;

pub use analytics::{PerformanceSummary, SimulationAnalytics};
pub use config::AutoTradeConfig;
pub use engine::{is_opportunity_eligible, PaperTrader, TradingStatus};
pub use portfolio::{PaperPortfolio, Trade, TradeAction};
