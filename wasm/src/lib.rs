//! Health Tracker WASM Module
//!
//! WebAssembly bindings for the pure calculations a front-end needs without
//! a round trip: goal progress, chart labels and heart-rate smoothing.

use chrono::NaiveDate;
use health_tracker_shared::{
    calculate_progress, labels_for, GoalSet, Granularity, HeartRateSmoother, Metric, SmootherConfig,
};
use wasm_bindgen::prelude::*;

/// Progress percentage of `current` against the goal for `metric`
///
/// `goals_json` is the stored goal document; missing or malformed fields
/// fall back to the defaults. Unknown metrics score 0.
#[wasm_bindgen]
pub fn goal_progress(metric: &str, current: f64, goals_json: &str) -> f64 {
    let Ok(metric) = metric.parse::<Metric>() else {
        return 0.0;
    };
    let goals: GoalSet = serde_json::from_str(goals_json).unwrap_or_default();
    calculate_progress(metric, current, &goals)
}

/// Chart labels as a JSON array
///
/// `iso_date` is `YYYY-MM-DD`. Invalid input yields `[]`.
#[wasm_bindgen]
pub fn chart_labels(granularity: &str, iso_date: &str) -> String {
    let labels = match (
        granularity.parse::<Granularity>(),
        NaiveDate::parse_from_str(iso_date, "%Y-%m-%d"),
    ) {
        (Ok(granularity), Ok(date)) => labels_for(granularity, date),
        _ => Vec::new(),
    };
    serde_json::to_string(&labels).unwrap_or_else(|_| "[]".to_string())
}

/// Smoothed heart rate after feeding `readings` in order
///
/// Zero and out-of-range readings are skipped as noise. Returns `undefined`
/// when no reading was accepted.
#[wasm_bindgen]
pub fn smoothed_heart_rate(readings: &[u32], capacity: usize) -> Option<u32> {
    let mut smoother = HeartRateSmoother::new(SmootherConfig {
        capacity: capacity.max(1),
        ..SmootherConfig::default()
    });
    for &reading in readings {
        smoother.push(Some(reading));
    }
    smoother.smoothed()
}
