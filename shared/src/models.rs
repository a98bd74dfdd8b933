//! Data models for the Health Tracker

use crate::errors::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Metrics
// ============================================================================

/// A tracked health metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Steps,
    Sleep,
    Cycling,
    HeartRate,
}

impl Metric {
    /// Every tracked metric, in display order
    pub const ALL: [Metric; 4] = [Metric::Steps, Metric::HeartRate, Metric::Sleep, Metric::Cycling];

    /// Wire name of the metric
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Steps => "steps",
            Metric::Sleep => "sleep",
            Metric::Cycling => "cycling",
            Metric::HeartRate => "heartRate",
        }
    }

    /// Whether the goal for this metric is a single number (as opposed to a range)
    pub fn has_scalar_goal(&self) -> bool {
        !matches!(self, Metric::HeartRate)
    }

    /// Storage key holding the chart history for this metric
    pub fn history_key(&self) -> &'static str {
        match self {
            Metric::Steps => "stepsHistory",
            Metric::Sleep => "sleepHistory",
            Metric::Cycling => "cyclingHistory",
            Metric::HeartRate => "heartRateHistory",
        }
    }

    /// Storage key holding the chart labels for this metric
    pub fn labels_key(&self) -> &'static str {
        match self {
            Metric::Steps => "stepsLabels",
            Metric::Sleep => "sleepLabels",
            Metric::Cycling => "cyclingLabels",
            Metric::HeartRate => "heartRateLabels",
        }
    }

    /// Display unit
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Steps => "steps",
            Metric::Sleep => "h",
            Metric::Cycling => "km",
            Metric::HeartRate => "bpm",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "steps" => Ok(Metric::Steps),
            "sleep" => Ok(Metric::Sleep),
            "cycling" => Ok(Metric::Cycling),
            "heartRate" | "heart_rate" | "heartrate" => Ok(Metric::HeartRate),
            other => Err(DomainError::UnknownMetric(other.to_string())),
        }
    }
}

// ============================================================================
// Goals
// ============================================================================

/// Healthy heart-rate band used as the heart-rate goal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartRateRange {
    pub min: f64,
    pub max: f64,
}

impl Default for HeartRateRange {
    fn default() -> Self {
        Self { min: 60.0, max: 140.0 }
    }
}

/// Per-metric targets
///
/// Deserialization backfills any missing key from [`GoalSet::default`], so a
/// loaded set always carries all four metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalSet {
    pub steps: f64,
    pub sleep: f64,
    pub cycling: f64,
    #[serde(rename = "heartRate")]
    pub heart_rate: HeartRateRange,
}

impl Default for GoalSet {
    fn default() -> Self {
        Self {
            steps: 10_000.0,
            sleep: 8.0,
            cycling: 10.0,
            heart_rate: HeartRateRange::default(),
        }
    }
}

impl GoalSet {
    /// Current target for a metric
    pub fn target(&self, metric: Metric) -> GoalTarget {
        match metric {
            Metric::Steps => GoalTarget::Scalar(self.steps),
            Metric::Sleep => GoalTarget::Scalar(self.sleep),
            Metric::Cycling => GoalTarget::Scalar(self.cycling),
            Metric::HeartRate => GoalTarget::Range(self.heart_rate),
        }
    }

    /// Replace the target of a single metric, leaving the others untouched
    pub fn with_target(mut self, metric: Metric, target: GoalTarget) -> Result<Self, DomainError> {
        crate::validation::validate_goal_target(metric, &target)?;
        match (metric, target) {
            (Metric::Steps, GoalTarget::Scalar(v)) => self.steps = v,
            (Metric::Sleep, GoalTarget::Scalar(v)) => self.sleep = v,
            (Metric::Cycling, GoalTarget::Scalar(v)) => self.cycling = v,
            (Metric::HeartRate, GoalTarget::Range(range)) => self.heart_rate = range,
            (metric, _) => {
                return Err(DomainError::InvalidGoal(format!(
                    "Target shape does not match metric {}",
                    metric
                )))
            }
        }
        Ok(self)
    }
}

/// A goal value: a scalar target or a heart-rate range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoalTarget {
    Scalar(f64),
    Range(HeartRateRange),
}

impl fmt::Display for GoalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalTarget::Scalar(v) => write!(f, "{}", v),
            GoalTarget::Range(r) => write!(f, "{}-{}", r.min, r.max),
        }
    }
}

impl FromStr for GoalTarget {
    type Err = DomainError;

    /// Parses `"10000"` as a scalar and `"55-150"` as a range
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| DomainError::InvalidGoal(format!("Not a number: {}", v.trim())))
        };

        match s.split_once('-') {
            Some((min, max)) if !min.trim().is_empty() => Ok(GoalTarget::Range(HeartRateRange {
                min: parse(min)?,
                max: parse(max)?,
            })),
            _ => Ok(GoalTarget::Scalar(parse(s)?)),
        }
    }
}

// ============================================================================
// Reporting granularity
// ============================================================================

/// Reporting window for a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "Daily",
            Granularity::Weekly => "Weekly",
            Granularity::Monthly => "Monthly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Granularity::Daily),
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            _ => Err(DomainError::UnknownGranularity(s.to_string())),
        }
    }
}

// ============================================================================
// Chart series
// ============================================================================

/// Chart values with their parallel axis labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct ChartSeries {
    values: Vec<f64>,
    labels: Vec<String>,
}

#[derive(Deserialize)]
struct RawSeries {
    values: Vec<f64>,
    labels: Vec<String>,
}

impl TryFrom<RawSeries> for ChartSeries {
    type Error = DomainError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        ChartSeries::new(raw.values, raw.labels)
    }
}

impl ChartSeries {
    /// Build a series, rejecting mismatched lengths
    pub fn new(values: Vec<f64>, labels: Vec<String>) -> Result<Self, DomainError> {
        if values.len() != labels.len() {
            return Err(DomainError::SeriesLengthMismatch {
                values: values.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { values, labels })
    }

    /// Build a series from parts already known to be aligned
    pub(crate) fn from_aligned(values: Vec<f64>, labels: Vec<String>) -> Self {
        debug_assert_eq!(values.len(), labels.len());
        Self { values, labels }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Most recent value, if any
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<String>) {
        (self.values, self.labels)
    }
}

// ============================================================================
// Heart-rate events
// ============================================================================

/// What started a monitoring session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Manual,
    Auto,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Manual => "manual",
            EventSource::Auto => "auto",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a completed heart-rate monitoring session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateEvent {
    pub timestamp: DateTime<Utc>,
    pub value: u32,
    pub source: EventSource,
}
