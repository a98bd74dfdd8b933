//! Tracker context
//!
//! The shared resources every screen-level operation needs, bundled so they
//! can be handed around cheaply.
//!
//! # Design Principles
//!
//! 1. **Cheap cloning**: every field is an `Arc`
//! 2. **Injected collaborators**: storage, device and clock are trait objects
//! 3. **Serialized goal writes**: goal updates through the context never race

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::device::DeviceDataSource;
use crate::error::CoreResult;
use crate::repositories::KeyValueStore;
use crate::scheduler::Scheduler;
use crate::services::{GoalsService, HeartRateMonitor, MonitorStatus};
use health_tracker_shared::{GoalSet, GoalTarget, HeartRateEvent, Metric};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

/// Shared tracker state
#[derive(Clone)]
pub struct TrackerContext {
    store: Arc<dyn KeyValueStore>,
    device: Arc<dyn DeviceDataSource>,
    clock: Arc<dyn Clock>,
    config: Arc<TrackerConfig>,
    goal_writes: Arc<Mutex<()>>,
}

impl TrackerContext {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        device: Arc<dyn DeviceDataSource>,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            store,
            device,
            clock,
            config: Arc::new(config),
            goal_writes: Arc::new(Mutex::new(())),
        }
    }

    #[inline]
    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Owned handle to the store, for spawned tasks
    pub fn store_handle(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    #[inline]
    pub fn device(&self) -> &dyn DeviceDataSource {
        self.device.as_ref()
    }

    #[inline]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Owned handle to the clock, for spawned tasks
    pub fn clock_handle(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Update one goal target
    ///
    /// Updates issued through the same context are applied one at a time, so
    /// none is lost to a concurrent read-merge-write.
    pub async fn update_goal(&self, metric: Metric, target: GoalTarget) -> CoreResult<GoalSet> {
        let _guard = self.goal_writes.lock().await;
        GoalsService::update_goal(self.store(), metric, target).await
    }

    /// Build a heart-rate monitor over this context's device and clock
    pub fn monitor(
        &self,
        scheduler: Arc<dyn Scheduler>,
    ) -> (
        HeartRateMonitor,
        watch::Receiver<MonitorStatus>,
        mpsc::UnboundedReceiver<HeartRateEvent>,
    ) {
        HeartRateMonitor::new(
            Arc::clone(&self.device),
            scheduler,
            Arc::clone(&self.clock),
            self.config.monitoring.clone(),
        )
    }
}
