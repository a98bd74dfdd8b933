//! Common test utilities for integration tests
//!
//! Builds a tracker context over an in-memory store, a scripted device, a
//! virtual-time scheduler and a pinned clock.

#![allow(dead_code)]

use async_trait::async_trait;
use health_tracker_core::clock::FixedClock;
use health_tracker_core::config::TrackerConfig;
use health_tracker_core::device::{CyclingData, DeviceDataSource, ReadingCallback, Subscription};
use health_tracker_core::repositories::{MemoryStore, SqliteStore};
use health_tracker_core::scheduler::ManualScheduler;
use health_tracker_core::services::{HeartRateMonitor, MonitorStatus};
use health_tracker_core::{db, CoreError, CoreResult, TrackerContext};
use health_tracker_shared::HeartRateEvent;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Device whose readings and failures are scripted by the test
#[derive(Default)]
pub struct ScriptedDevice {
    offline: AtomicBool,
    steps: Mutex<Option<u64>>,
    cycling: Mutex<Option<CyclingData>>,
    callback: Mutex<Option<ReadingCallback>>,
    pub subscriptions: AtomicUsize,
    pub unsubscriptions: Arc<AtomicUsize>,
}

impl ScriptedDevice {
    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    pub fn set_steps(&self, steps: Option<u64>) {
        *self.steps.lock() = steps;
    }

    pub fn set_cycling(&self, cycling: Option<CyclingData>) {
        *self.cycling.lock() = cycling;
    }

    /// Push readings through the live stream, if one is open
    pub fn emit<I>(&self, readings: I)
    where
        I: IntoIterator<Item = Option<u32>>,
    {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            for reading in readings {
                callback(reading);
            }
        }
    }
}

#[async_trait]
impl DeviceDataSource for ScriptedDevice {
    fn is_connected(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }

    async fn step_count(&self) -> CoreResult<u64> {
        self.steps.lock().ok_or_else(|| CoreError::device("step count unavailable"))
    }

    async fn cycling_data(&self) -> CoreResult<CyclingData> {
        self.cycling.lock().ok_or_else(|| CoreError::device("cycling data unavailable"))
    }

    fn start_realtime_heart_rate(&self, callback: ReadingCallback) -> CoreResult<Subscription> {
        if !self.is_connected() {
            return Err(CoreError::device("device not connected"));
        }
        *self.callback.lock() = Some(callback);
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let unsubscriptions = Arc::clone(&self.unsubscriptions);
        Ok(Subscription::new(move || {
            unsubscriptions.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

/// Test tracker wrapper
pub struct TestTracker {
    pub ctx: TrackerContext,
    pub store: Arc<MemoryStore>,
    pub device: Arc<ScriptedDevice>,
    pub scheduler: Arc<ManualScheduler>,
    pub clock: Arc<FixedClock>,
}

impl TestTracker {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let device = Arc::new(ScriptedDevice::default());
        let scheduler = Arc::new(ManualScheduler::new());
        let clock = Arc::new(FixedClock::new(
            "2026-10-18T12:00:00Z".parse().expect("valid timestamp"),
        ));
        let ctx = TrackerContext::new(
            store.clone(),
            device.clone(),
            clock.clone(),
            TrackerConfig::default(),
        );

        Self { ctx, store, device, scheduler, clock }
    }

    /// A monitor wired to the virtual scheduler
    pub fn monitor(
        &self,
    ) -> (
        HeartRateMonitor,
        watch::Receiver<MonitorStatus>,
        mpsc::UnboundedReceiver<HeartRateEvent>,
    ) {
        self.ctx.monitor(self.scheduler.clone())
    }

    /// Move both the clock and the scheduler forward
    pub fn advance(&self, secs: u64) {
        self.clock.advance(chrono::Duration::seconds(secs as i64));
        self.scheduler.advance(Duration::from_secs(secs));
    }
}

/// Tracker context over a migrated in-memory SQLite store
pub async fn sqlite_context() -> TrackerContext {
    let pool = db::create_memory_pool().await.expect("Failed to create pool");
    db::run_migrations(&pool).await.expect("Failed to run migrations");

    TrackerContext::new(
        Arc::new(SqliteStore::new(pool)),
        Arc::new(ScriptedDevice::default()),
        Arc::new(FixedClock::new("2026-10-18T12:00:00Z".parse().expect("valid timestamp"))),
        TrackerConfig::default(),
    )
}
