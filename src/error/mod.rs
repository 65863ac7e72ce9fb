use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ArbError {
    /// A broker/pair rate is missing, non-positive or non-finite
    #[error("Malformed snapshot entry {broker}/{pair}: {reason}")]
    MalformedSnapshotEntry {
        broker: String,
        pair: String,
        reason: String,
    },

    /// Currency pair symbol could not be parsed
    #[error("Invalid currency pair: {0}")]
    InvalidPair(String),

    /// Configuration errors
    #[error("Config Error: {0}")]
    ConfigError(String),

    /// Snapshot provider could not produce rates
    #[error("Snapshot Unavailable: {0}")]
    SnapshotUnavailable(String),

    /// Paper trading is switched off
    #[error("Execution Disabled: {0}")]
    ExecutionDisabled(String),

    /// Hourly or daily trading limit hit
    #[error("Limit Reached: {0}")]
    LimitReached(String),

    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// Unknown/unclassified errors
    #[error("Unknown Error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, ArbError>;

impl From<serde_json::Error> for ArbError {
    fn from(err: serde_json::Error) -> Self {
        ArbError::SerializationError(err.to_string())
    }
}

impl ArbError {
    pub fn malformed(broker: &str, pair: &str, reason: impl Into<String>) -> Self {
        ArbError::MalformedSnapshotEntry {
            broker: broker.to_string(),
            pair: pair.to_string(),
            reason: reason.into(),
        }
    }

    /// Determines if the next detection cycle can be expected to succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            ArbError::MalformedSnapshotEntry { .. } => true, // next snapshot may be clean
            ArbError::InvalidPair(_) => false,
            ArbError::ConfigError(_) => false, // Config needs fixing
            ArbError::SnapshotUnavailable(_) => true,
            ArbError::ExecutionDisabled(_) => false,
            ArbError::LimitReached(_) => true, // limits roll over with time
            ArbError::SerializationError(_) => false,
            ArbError::Unknown(_) => true,
        }
    }

    /// Categorizes error for metrics and monitoring
    pub fn categorize(&self) -> ErrorCategory {
        match self {
            ArbError::MalformedSnapshotEntry { .. } => ErrorCategory::Data,
            ArbError::InvalidPair(_) => ErrorCategory::Data,
            ArbError::ConfigError(_) => ErrorCategory::Configuration,
            ArbError::SnapshotUnavailable(_) => ErrorCategory::DataFeed,
            ArbError::ExecutionDisabled(_) => ErrorCategory::Trading,
            ArbError::LimitReached(_) => ErrorCategory::Safety,
            ArbError::SerializationError(_) => ErrorCategory::Infrastructure,
            ArbError::Unknown(_) => ErrorCategory::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    DataFeed,
    Trading,
    Data,
    Safety,
    Configuration,
    Infrastructure,
    Critical,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_entry_is_recoverable_data_error() {
        let err = ArbError::malformed("OANDA", "EUR/USD", "non-positive rate -1");
        assert!(err.is_recoverable());
        assert_eq!(err.categorize(), ErrorCategory::Data);
        assert_eq!(
            err.to_string(),
            "Malformed snapshot entry OANDA/EUR/USD: non-positive rate -1"
        );
    }

    #[test]
    fn test_config_error_is_not_recoverable() {
        let err = ArbError::ConfigError("MAX_RESULTS must be at least 1".to_string());
        assert!(!err.is_recoverable());
        assert_eq!(err.categorize(), ErrorCategory::Configuration);
    }
}
