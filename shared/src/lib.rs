//! Health Tracker Shared Library
//!
//! This crate contains the pure domain of the health tracker: metric and
//! goal types, goal progress, chart labels, series synthesis and heart-rate
//! smoothing. It performs no I/O and is shared by the core services and the
//! WASM bindings.

pub mod errors;
pub mod labels;
pub mod models;
pub mod progress;
pub mod smoothing;
pub mod synthesis;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use labels::{labels_for, labels_for_tab, week_of_month};
pub use models::{
    ChartSeries, EventSource, GoalSet, GoalTarget, Granularity, HeartRateEvent, HeartRateRange,
    Metric,
};
pub use progress::{calculate_progress, goal_progress, GoalProgress};
pub use smoothing::{smoothed_mean, HeartRateSmoother, SampleOutcome, SmootherConfig};
pub use synthesis::{synthesize, synthesize_for_tab, DaySeed};
