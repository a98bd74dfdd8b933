//! Heart-rate smoothing and publication throttle
//!
//! Raw sensor readings pass through a plausibility gate, then into a small
//! FIFO buffer. The smoothed value is the rounded mean of whatever the buffer
//! holds. Publication is throttled: a smoothed value is surfaced only when it
//! moved by a significant amount, or periodically so a flat signal still
//! refreshes.

use crate::validation::{is_plausible_heart_rate, MAX_VALID_BPM, MIN_VALID_BPM};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Tuning for [`HeartRateSmoother`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmootherConfig {
    /// Readings kept in the moving-average window
    pub capacity: usize,
    /// Minimum change (bpm) that publishes immediately
    pub significant_change_bpm: u32,
    /// Publish at least once every this many accepted readings
    pub refresh_every: u32,
    pub min_valid_bpm: u32,
    pub max_valid_bpm: u32,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            significant_change_bpm: 3,
            refresh_every: 3,
            min_valid_bpm: MIN_VALID_BPM,
            max_valid_bpm: MAX_VALID_BPM,
        }
    }
}

/// What happened to a single raw reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Reading was noise and did not touch the buffer
    Rejected,
    /// Reading entered the buffer; `publish` says whether the throttle passed it
    Accepted { smoothed: u32, publish: bool },
}

/// Rounded integer mean of a set of readings
pub fn smoothed_mean(readings: &[u32]) -> Option<u32> {
    if readings.is_empty() {
        return None;
    }
    let sum: u64 = readings.iter().map(|&r| r as u64).sum();
    Some((sum as f64 / readings.len() as f64).round() as u32)
}

/// Moving-average smoother with a publication throttle
#[derive(Debug, Clone)]
pub struct HeartRateSmoother {
    config: SmootherConfig,
    buffer: VecDeque<u32>,
    smoothed: Option<u32>,
    last_published: Option<u32>,
    accepted: u32,
    rejected: u32,
    min: Option<u32>,
    max: Option<u32>,
}

impl Default for HeartRateSmoother {
    fn default() -> Self {
        Self::new(SmootherConfig::default())
    }
}

impl HeartRateSmoother {
    pub fn new(config: SmootherConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            config: SmootherConfig { capacity, ..config },
            buffer: VecDeque::with_capacity(capacity),
            smoothed: None,
            last_published: None,
            accepted: 0,
            rejected: 0,
            min: None,
            max: None,
        }
    }

    /// Feed one raw reading
    ///
    /// The periodic refresh counts accepted readings; rejected ones never
    /// advance it.
    pub fn push(&mut self, reading: Option<u32>) -> SampleOutcome {
        let (min_bpm, max_bpm) = (self.config.min_valid_bpm, self.config.max_valid_bpm);
        let bpm = match reading {
            Some(bpm) if is_plausible_heart_rate(reading, min_bpm, max_bpm) => bpm,
            _ => {
                self.rejected += 1;
                return SampleOutcome::Rejected;
            }
        };

        if self.buffer.len() == self.config.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(bpm);
        self.accepted += 1;

        let (front, back) = self.buffer.as_slices();
        let window: Vec<u32> = front.iter().chain(back).copied().collect();
        let Some(smoothed) = smoothed_mean(&window) else {
            return SampleOutcome::Rejected;
        };

        self.smoothed = Some(smoothed);
        self.min = Some(self.min.map_or(smoothed, |m| m.min(smoothed)));
        self.max = Some(self.max.map_or(smoothed, |m| m.max(smoothed)));

        let significant = match self.last_published {
            None => true,
            Some(last) => last.abs_diff(smoothed) >= self.config.significant_change_bpm,
        };
        let refresh_every = self.config.refresh_every;
        let periodic = refresh_every > 0 && self.accepted % refresh_every == 0;
        let publish = significant || periodic;
        if publish {
            self.last_published = Some(smoothed);
        }

        SampleOutcome::Accepted { smoothed, publish }
    }

    /// Latest smoothed value, published or not
    pub fn smoothed(&self) -> Option<u32> {
        self.smoothed
    }

    pub fn last_published(&self) -> Option<u32> {
        self.last_published
    }

    pub fn min(&self) -> Option<u32> {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Current buffer contents, oldest first
    pub fn window(&self) -> Vec<u32> {
        self.buffer.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_leading_zero_ignored() {
        let mut smoother = HeartRateSmoother::default();
        assert_eq!(smoother.push(Some(0)), SampleOutcome::Rejected);
        smoother.push(Some(72));
        smoother.push(Some(75));
        smoother.push(Some(78));
        assert_eq!(smoother.smoothed(), Some(75));
        assert_eq!(smoother.window(), vec![72, 75, 78]);
    }

    #[test]
    fn test_out_of_band_reading_never_enters_buffer() {
        let mut smoother = HeartRateSmoother::default();
        smoother.push(Some(70));
        assert_eq!(smoother.push(Some(205)), SampleOutcome::Rejected);
        assert_eq!(smoother.push(None), SampleOutcome::Rejected);
        assert_eq!(smoother.window(), vec![70]);
        assert_eq!(smoother.smoothed(), Some(70));
        assert_eq!(smoother.rejected(), 2);
    }

    fn accepted(smoothed: u32, publish: bool) -> SampleOutcome {
        SampleOutcome::Accepted { smoothed, publish }
    }

    #[test]
    fn test_partial_buffer_mean() {
        let mut smoother = HeartRateSmoother::default();
        smoother.push(Some(60));
        assert_eq!(smoother.push(Some(65)), accepted(63, true));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut smoother = HeartRateSmoother::default();
        for bpm in [60, 70, 80, 90] {
            smoother.push(Some(bpm));
        }
        assert_eq!(smoother.window(), vec![70, 80, 90]);
        assert_eq!(smoother.smoothed(), Some(80));
    }

    #[test]
    fn test_throttle_suppresses_small_changes() {
        let mut smoother = HeartRateSmoother::default();
        // First value always publishes
        assert_eq!(smoother.push(Some(70)), accepted(70, true));
        // Mean 71: change of 1, second accepted reading
        assert_eq!(smoother.push(Some(72)), accepted(71, false));
        // Third accepted reading publishes regardless of magnitude
        assert_eq!(smoother.push(Some(71)), accepted(71, true));
        assert_eq!(smoother.last_published(), Some(71));
    }

    #[test]
    fn test_rejected_readings_do_not_advance_refresh() {
        let mut smoother = HeartRateSmoother::default();
        assert_eq!(smoother.push(Some(70)), accepted(70, true));
        assert_eq!(smoother.push(None), SampleOutcome::Rejected);
        // Third raw reading but only the second accepted one
        assert_eq!(smoother.push(Some(71)), accepted(71, false));
        assert_eq!(smoother.push(Some(0)), SampleOutcome::Rejected);
        assert_eq!(smoother.push(Some(71)), accepted(71, true));
        assert_eq!(smoother.accepted(), 3);
        assert_eq!(smoother.rejected(), 2);
    }

    #[test]
    fn test_throttle_publishes_significant_change() {
        let mut smoother = HeartRateSmoother::default();
        smoother.push(Some(70));
        // Mean 75: change of 5
        assert_eq!(smoother.push(Some(80)), accepted(75, true));
    }

    #[test]
    fn test_min_max_track_every_accepted_reading() {
        let mut smoother = HeartRateSmoother::default();
        for bpm in [70, 72, 71, 90, 95] {
            smoother.push(Some(bpm));
        }
        assert_eq!(smoother.min(), Some(70));
        assert_eq!(smoother.max(), Some(85));
    }

    #[test]
    fn test_smoothed_mean() {
        assert_eq!(smoothed_mean(&[]), None);
        assert_eq!(smoothed_mean(&[72, 75, 78]), Some(75));
        assert_eq!(smoothed_mean(&[70, 71]), Some(71));
    }

    proptest! {
        /// Property: the smoothed value stays inside the accepted band
        #[test]
        fn prop_smoothed_within_band(readings in prop::collection::vec(0u32..300, 1..50)) {
            let mut smoother = HeartRateSmoother::default();
            for r in readings {
                smoother.push(Some(r));
            }
            if let Some(v) = smoother.smoothed() {
                prop_assert!((MIN_VALID_BPM..=MAX_VALID_BPM).contains(&v));
            }
        }
    }
}
