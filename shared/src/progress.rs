//! Goal progress calculations
//!
//! Progress is always a percentage in `[0, 100]`. Scalar metrics grow
//! linearly towards their target; heart rate is scored against a range,
//! where being inside the band is 100% and leaving it decays the score.

use crate::models::{GoalSet, GoalTarget, HeartRateRange, Metric};
use serde::{Deserialize, Serialize};

/// Share of `max` above the range at which heart-rate progress reaches 0%
const HEART_RATE_OVERAGE_BAND: f64 = 0.5;

/// Highest score a reading below the heart-rate range can reach
const BELOW_RANGE_CAP: f64 = 99.0;

/// Progress summary for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub metric: Metric,
    pub current: f64,
    pub target: GoalTarget,
    pub percent: f64,
    pub achieved: bool,
}

/// Calculate progress of `current` against the goal for `metric`
pub fn calculate_progress(metric: Metric, current: f64, goals: &GoalSet) -> f64 {
    match goals.target(metric) {
        GoalTarget::Scalar(target) => scalar_progress(current, target),
        GoalTarget::Range(range) => heart_rate_progress(current, &range),
    }
}

/// Build the full progress summary for a metric
pub fn goal_progress(metric: Metric, current: f64, goals: &GoalSet) -> GoalProgress {
    let percent = calculate_progress(metric, current, goals);
    GoalProgress {
        metric,
        current,
        target: goals.target(metric),
        percent,
        achieved: percent >= 100.0,
    }
}

/// Progress towards a scalar target
///
/// Formula: min(current / target × 100, 100), never negative
pub fn scalar_progress(current: f64, target: f64) -> f64 {
    if !current.is_finite() || current <= 0.0 || target <= 0.0 {
        return 0.0;
    }
    (current / target * 100.0).min(100.0)
}

/// Progress of a heart-rate reading against a healthy range
///
/// - inside `[min, max]`: 100
/// - below `min`: min(current / min × 100, 99), so it never completes below range
/// - above `max`: linear decay reaching 0 at `max + max × 0.5`
pub fn heart_rate_progress(current: f64, range: &HeartRateRange) -> f64 {
    if !current.is_finite() {
        return 0.0;
    }
    if current >= range.min && current <= range.max {
        return 100.0;
    }
    if current < range.min {
        if current <= 0.0 || range.min <= 0.0 {
            return 0.0;
        }
        return (current / range.min * 100.0).min(BELOW_RANGE_CAP);
    }

    let overage_band = range.max * HEART_RATE_OVERAGE_BAND;
    if overage_band <= 0.0 {
        return 0.0;
    }
    (100.0 - (current - range.max) / overage_band * 100.0).max(0.0)
}
