//! Confidence scoring for detected opportunities.
//!
//! Both scores start at 0.5 for an opportunity sitting exactly on its threshold and rise
//! with the profit margin above it. Spatial scores also rise with the number of brokers
//! corroborating the pair; triangular scores fall as the snapshot ages.

/// Score at the profit threshold.
pub const BASE_CONFIDENCE: f64 = 0.5;

/// Margin (fractional profit above threshold) at which the profit term reaches ~63%.
const PROFIT_SCALE: f64 = 0.001;

const SPATIAL_PROFIT_WEIGHT: f64 = 0.35;
const SPATIAL_CORROBORATION_WEIGHT: f64 = 0.15;

const TRIANGULAR_PROFIT_WEIGHT: f64 = 0.45;
/// Maximum deduction for stale rates.
const TRIANGULAR_STALENESS_WEIGHT: f64 = 0.25;
/// Snapshot age at which the full staleness deduction applies.
pub const STALENESS_HORIZON_SECS: f64 = 5.0;

/// Saturating 0..1 term for the profit margin over threshold.
fn profit_term(profit_percentage: f64, threshold: f64) -> f64 {
    let excess = (profit_percentage / 100.0 - threshold.max(0.0)).max(0.0);
    1.0 - (-excess / PROFIT_SCALE).exp()
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Spatial confidence from profit and the number of brokers quoting the pair.
pub fn spatial_confidence(profit_percentage: f64, threshold: f64, quoting_brokers: usize) -> f64 {
    let corroboration = if quoting_brokers <= 2 {
        0.0
    } else {
        1.0 - 2.0 / quoting_brokers as f64
    };
    clamp_unit(
        BASE_CONFIDENCE
            + SPATIAL_PROFIT_WEIGHT * profit_term(profit_percentage, threshold)
            + SPATIAL_CORROBORATION_WEIGHT * corroboration,
    )
}

/// Triangular confidence from profit and snapshot age in seconds.
pub fn triangular_confidence(profit_percentage: f64, threshold: f64, staleness_secs: f64) -> f64 {
    let staleness = (staleness_secs.max(0.0) / STALENESS_HORIZON_SECS).min(1.0);
    clamp_unit(
        BASE_CONFIDENCE + TRIANGULAR_PROFIT_WEIGHT * profit_term(profit_percentage, threshold)
            - TRIANGULAR_STALENESS_WEIGHT * staleness,
    )
}
