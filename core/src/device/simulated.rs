//! Simulated wearable for the CLI and local development

use super::{CyclingData, DeviceDataSource, ReadingCallback, Subscription};
use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

/// Chance that a simulated reading is a dropout (`None` or `0`)
const DROPOUT_RATE: f64 = 0.05;

/// Device that produces plausible synthetic data
pub struct SimulatedDevice {
    connected: AtomicBool,
    steps: Mutex<u64>,
    cycling: Mutex<CyclingData>,
    resting_bpm: u32,
    reading_interval: Duration,
}

impl SimulatedDevice {
    pub fn new(resting_bpm: u32, reading_interval: Duration) -> Self {
        Self {
            connected: AtomicBool::new(true),
            steps: Mutex::new(6_420),
            cycling: Mutex::new(CyclingData {
                distance_km: 7.4,
                duration_minutes: 28.0,
                calories: 212.0,
            }),
            resting_bpm,
            reading_interval,
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_steps(&self, steps: u64) {
        *self.steps.lock() = steps;
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new(72, Duration::from_secs(1))
    }
}

#[async_trait]
impl DeviceDataSource for SimulatedDevice {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn step_count(&self) -> CoreResult<u64> {
        if !self.is_connected() {
            return Err(CoreError::device("device not connected"));
        }
        Ok(*self.steps.lock())
    }

    async fn cycling_data(&self) -> CoreResult<CyclingData> {
        if !self.is_connected() {
            return Err(CoreError::device("device not connected"));
        }
        Ok(*self.cycling.lock())
    }

    fn start_realtime_heart_rate(&self, callback: ReadingCallback) -> CoreResult<Subscription> {
        if !self.is_connected() {
            return Err(CoreError::device("device not connected"));
        }
        let runtime = Handle::try_current()
            .map_err(|e| CoreError::device(format!("no runtime for live stream: {}", e)))?;

        let resting = self.resting_bpm as f64;
        let interval = self.reading_interval;
        let stream = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut bpm = resting;
            loop {
                ticker.tick().await;
                let reading = {
                    let mut rng = rand::rng();
                    if rng.random_bool(DROPOUT_RATE) {
                        None
                    } else {
                        // Random walk pulled back towards the resting rate
                        bpm += rng.random_range(-3.0..3.0) + (resting - bpm) * 0.1;
                        Some(bpm.round().max(0.0) as u32)
                    }
                };
                callback(reading);
            }
        });

        debug!("Simulated heart-rate stream started");
        Ok(Subscription::new(move || {
            stream.abort();
            debug!("Simulated heart-rate stream stopped");
        }))
    }
}
