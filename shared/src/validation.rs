//! Input validation functions
//!
//! Sensor readings and goal targets are checked here before they reach the
//! smoothing buffer or the goal store.

use crate::errors::DomainError;
use crate::models::{GoalTarget, Metric};

/// Lowest heart rate accepted from the sensor (bpm)
pub const MIN_VALID_BPM: u32 = 40;

/// Highest heart rate accepted from the sensor (bpm)
pub const MAX_VALID_BPM: u32 = 200;

/// Check a raw sensor reading against the plausible band
///
/// Missing readings and zeros are sensor noise, as is anything outside
/// `[min_bpm, max_bpm]`.
pub fn is_plausible_heart_rate(reading: Option<u32>, min_bpm: u32, max_bpm: u32) -> bool {
    matches!(reading, Some(bpm) if bpm != 0 && bpm >= min_bpm && bpm <= max_bpm)
}

/// Validate a goal target for the given metric
pub fn validate_goal_target(metric: Metric, target: &GoalTarget) -> Result<(), DomainError> {
    match (metric.has_scalar_goal(), target) {
        (true, GoalTarget::Scalar(value)) => {
            if !value.is_finite() {
                return Err(DomainError::InvalidGoal(format!(
                    "{} goal must be a valid number",
                    metric
                )));
            }
            if *value <= 0.0 {
                return Err(DomainError::InvalidGoal(format!(
                    "{} goal must be positive",
                    metric
                )));
            }
            Ok(())
        }
        (false, GoalTarget::Range(range)) => {
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err(DomainError::InvalidGoal(
                    "Heart rate range must be valid numbers".to_string(),
                ));
            }
            if range.min <= 0.0 {
                return Err(DomainError::InvalidGoal(
                    "Heart rate minimum must be positive".to_string(),
                ));
            }
            if range.min >= range.max {
                return Err(DomainError::InvalidGoal(
                    "Heart rate minimum must be below maximum".to_string(),
                ));
            }
            Ok(())
        }
        (true, GoalTarget::Range(_)) => Err(DomainError::InvalidGoal(format!(
            "{} goal must be a single number",
            metric
        ))),
        (false, GoalTarget::Scalar(_)) => Err(DomainError::InvalidGoal(
            "Heart rate goal must be a min-max range".to_string(),
        )),
    }
}
