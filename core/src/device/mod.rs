//! Wearable device interface
//!
//! The core never talks to Bluetooth itself. It consumes a
//! [`DeviceDataSource`] that can answer one-shot queries and push a live
//! heart-rate stream to a callback.

pub mod simulated;

use crate::error::CoreResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use simulated::SimulatedDevice;

/// Receives raw heart-rate readings; `None` is a reading the sensor could not resolve
pub type ReadingCallback = Arc<dyn Fn(Option<u32>) + Send + Sync>;

/// Cycling totals reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CyclingData {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub calories: f64,
}

/// Live reading subscription
///
/// Stopping is idempotent, and dropping the subscription stops it.
pub struct Subscription {
    stop: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub fn new<F>(stop: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            stop: Mutex::new(Some(Box::new(stop))),
        }
    }

    /// Stop delivering readings
    pub fn stop(&self) {
        let stop = self.stop.lock().take();
        if let Some(stop) = stop {
            stop();
        }
    }

    pub fn is_active(&self) -> bool {
        self.stop.lock().is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A connected wearable
#[async_trait]
pub trait DeviceDataSource: Send + Sync {
    /// Whether the device is currently reachable
    fn is_connected(&self) -> bool;

    /// Steps counted today
    async fn step_count(&self) -> CoreResult<u64>;

    /// Cycling totals for today
    async fn cycling_data(&self) -> CoreResult<CyclingData>;

    /// Start pushing live heart-rate readings to `callback`
    fn start_realtime_heart_rate(&self, callback: ReadingCallback) -> CoreResult<Subscription>;
}
