//! Heart-rate sampling loop
//!
//! A monitor is `Idle` or `Monitoring`. A session subscribes to the device's
//! live stream, smooths readings, and ends after a fixed duration. A session
//! that ends on its own emits a [`HeartRateEvent`] when its last smoothed
//! value is plausible; sessions stopped early emit nothing.
//!
//! Automatic monitoring re-arms an hourly check while enabled and the device
//! is connected.
//!
//! # Concurrency
//!
//! State lives behind one `parking_lot::Mutex`. The lock is never held while
//! calling into the device, the scheduler or a channel. Each session and each
//! auto timer carries a generation number; late callbacks from a cancelled
//! generation are ignored.

use crate::clock::Clock;
use crate::config::MonitoringConfig;
use crate::device::{DeviceDataSource, Subscription};
use crate::error::{CoreError, CoreResult};
use crate::scheduler::{Scheduler, TaskHandle};
use chrono::{DateTime, Utc};
use health_tracker_shared::{EventSource, HeartRateEvent, HeartRateSmoother, SampleOutcome};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorPhase {
    #[default]
    Idle,
    Monitoring,
}

/// Published view of the sampling loop
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MonitorStatus {
    pub phase: MonitorPhase,
    pub source: Option<EventSource>,
    /// Last published smoothed value
    pub bpm: Option<u32>,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub accepted: u32,
    pub auto_enabled: bool,
}

// ============================================================================
// Internal state
// ============================================================================

struct Session {
    generation: u64,
    id: Uuid,
    source: EventSource,
    smoother: HeartRateSmoother,
    subscription: Option<Subscription>,
    timeout: Option<TaskHandle>,
}

#[derive(Default)]
struct MonitorState {
    session: Option<Session>,
    session_generation: u64,
    auto_enabled: bool,
    auto_timer: Option<TaskHandle>,
    auto_generation: u64,
    last_auto_check: Option<DateTime<Utc>>,
    last_bpm: Option<u32>,
}

impl MonitorState {
    fn status(&self) -> MonitorStatus {
        match &self.session {
            Some(session) => MonitorStatus {
                phase: MonitorPhase::Monitoring,
                source: Some(session.source),
                bpm: session.smoother.last_published(),
                min: session.smoother.min(),
                max: session.smoother.max(),
                accepted: session.smoother.accepted(),
                auto_enabled: self.auto_enabled,
            },
            None => MonitorStatus {
                bpm: self.last_bpm,
                auto_enabled: self.auto_enabled,
                ..MonitorStatus::default()
            },
        }
    }

    /// Invalidate the auto timer and hand back its handle for cancellation
    fn disarm_auto(&mut self) -> Option<TaskHandle> {
        self.auto_generation += 1;
        self.auto_timer.take()
    }
}

struct MonitorInner {
    device: Arc<dyn DeviceDataSource>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    config: MonitoringConfig,
    state: Mutex<MonitorState>,
    status_tx: watch::Sender<MonitorStatus>,
    events_tx: mpsc::UnboundedSender<HeartRateEvent>,
}

// ============================================================================
// Monitor
// ============================================================================

/// Heart-rate sampling loop
///
/// Cloning yields another handle to the same loop.
#[derive(Clone)]
pub struct HeartRateMonitor {
    inner: Arc<MonitorInner>,
}

impl HeartRateMonitor {
    /// Build an idle monitor
    ///
    /// Returns the status receiver and the receiver of completed events.
    pub fn new(
        device: Arc<dyn DeviceDataSource>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        config: MonitoringConfig,
    ) -> (
        Self,
        watch::Receiver<MonitorStatus>,
        mpsc::UnboundedReceiver<HeartRateEvent>,
    ) {
        let (status_tx, status_rx) = watch::channel(MonitorStatus::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let monitor = Self {
            inner: Arc::new(MonitorInner {
                device,
                scheduler,
                clock,
                config,
                state: Mutex::new(MonitorState::default()),
                status_tx,
                events_tx,
            }),
        };
        (monitor, status_rx, events_rx)
    }

    /// Current status
    pub fn status(&self) -> MonitorStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Another receiver of status updates
    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn is_monitoring(&self) -> bool {
        self.inner.state.lock().session.is_some()
    }

    /// Start a user-initiated session
    pub fn start_manual(&self) -> CoreResult<()> {
        self.inner.start_session(EventSource::Manual)
    }

    /// Start an automatic session now, outside the hourly cadence
    pub fn start_auto(&self) -> CoreResult<()> {
        self.inner.start_session(EventSource::Auto)
    }

    /// End the active session early without recording an event
    ///
    /// Returns whether a session was running.
    pub fn stop(&self) -> bool {
        self.inner.stop_session()
    }

    /// Tear down everything: the active session and the auto timer
    ///
    /// Idempotent. The auto-monitoring preference is kept; call
    /// [`set_auto_monitoring`](Self::set_auto_monitoring) or
    /// [`device_connected`](Self::device_connected) to re-arm.
    pub fn shutdown(&self) {
        let timer = self.inner.state.lock().disarm_auto();
        if let Some(timer) = timer {
            self.inner.scheduler.cancel(timer);
        }
        self.inner.stop_session();
        debug!("Heart-rate monitor shut down");
    }

    /// Enable or disable automatic hourly sessions
    ///
    /// Enabling runs one check immediately when the last automatic check is
    /// more than an interval old (or never happened). Disabling also stops
    /// any active session.
    pub fn set_auto_monitoring(&self, enabled: bool) {
        if enabled {
            self.inner.state.lock().auto_enabled = true;
            info!("Auto-monitoring enabled");
            self.inner.arm_auto();
        } else {
            let timer = {
                let mut state = self.inner.state.lock();
                state.auto_enabled = false;
                state.disarm_auto()
            };
            if let Some(timer) = timer {
                self.inner.scheduler.cancel(timer);
            }
            info!("Auto-monitoring disabled");
            self.inner.stop_session();
            self.inner.publish();
        }
    }

    /// The device became reachable; re-arm automatic monitoring
    pub fn device_connected(&self) {
        debug!("Device connected");
        self.inner.arm_auto();
    }

    /// The device went away; stop the session and the auto timer
    pub fn device_disconnected(&self) {
        let timer = self.inner.state.lock().disarm_auto();
        if let Some(timer) = timer {
            self.inner.scheduler.cancel(timer);
        }
        if self.inner.stop_session() {
            warn!("Device disconnected during monitoring");
        }
    }
}

impl MonitorInner {
    fn publish(&self) {
        let status = self.state.lock().status();
        self.status_tx.send_replace(status);
    }

    fn session_duration(&self, source: EventSource) -> std::time::Duration {
        match source {
            EventSource::Manual => self.config.manual_duration(),
            EventSource::Auto => self.config.auto_duration(),
        }
    }

    fn start_session(self: &Arc<Self>, source: EventSource) -> CoreResult<()> {
        if !self.device.is_connected() {
            warn!(source = %source, "Cannot start monitoring: device not connected");
            return Err(CoreError::device("device not connected"));
        }

        let (generation, id) = {
            let mut state = self.state.lock();
            if state.session.is_some() {
                return Err(CoreError::AlreadyMonitoring);
            }
            state.session_generation += 1;
            let generation = state.session_generation;
            let id = Uuid::new_v4();
            state.session = Some(Session {
                generation,
                id,
                source,
                smoother: HeartRateSmoother::new(self.config.smoother()),
                subscription: None,
                timeout: None,
            });
            (generation, id)
        };
        self.publish();

        let weak = Arc::downgrade(self);
        let callback = {
            let weak = weak.clone();
            Arc::new(move |reading: Option<u32>| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_reading(generation, reading);
                }
            })
        };

        let subscription = match self.device.start_realtime_heart_rate(callback) {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(
                    session = %id,
                    source = %source,
                    error = %e,
                    "Heart-rate subscription failed"
                );
                {
                    let mut state = self.state.lock();
                    if state.session.as_ref().map(|s| s.generation) == Some(generation) {
                        state.session = None;
                    }
                }
                self.publish();
                return Err(e);
            }
        };

        let duration = self.session_duration(source);
        let timeout = self.scheduler.schedule(
            duration,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.on_timeout(generation);
                }
            }),
        );

        let orphaned = {
            let mut state = self.state.lock();
            match state.session.as_mut() {
                Some(session) if session.generation == generation => {
                    session.subscription = Some(subscription);
                    session.timeout = Some(timeout);
                    None
                }
                _ => Some(subscription),
            }
        };

        // Stopped while we were setting up
        if let Some(subscription) = orphaned {
            subscription.stop();
            self.scheduler.cancel(timeout);
            debug!(session = %id, "Session ended during setup");
            return Ok(());
        }

        info!(
            session = %id,
            source = %source,
            duration_secs = duration.as_secs(),
            "Heart-rate monitoring started"
        );
        Ok(())
    }

    fn on_reading(&self, generation: u64, reading: Option<u32>) {
        let status = {
            let mut state = self.state.lock();
            let Some(session) = state.session.as_mut() else {
                return;
            };
            if session.generation != generation {
                return;
            }
            match session.smoother.push(reading) {
                SampleOutcome::Accepted { publish: true, .. } => Some(state.status()),
                SampleOutcome::Accepted { .. } => None,
                SampleOutcome::Rejected => {
                    debug!(reading = ?reading, "Discarded heart-rate reading");
                    None
                }
            }
        };

        if let Some(status) = status {
            self.status_tx.send_replace(status);
        }
    }

    fn on_timeout(&self, generation: u64) {
        let mut session = {
            let mut state = self.state.lock();
            if state.session.as_ref().map(|s| s.generation) != Some(generation) {
                return;
            }
            let Some(session) = state.session.take() else {
                return;
            };
            state.last_bpm = session.smoother.smoothed();
            session
        };

        if let Some(subscription) = session.subscription.take() {
            subscription.stop();
        }

        let smoothed = session.smoother.smoothed();
        info!(
            session = %session.id,
            source = %session.source,
            bpm = ?smoothed,
            accepted = session.smoother.accepted(),
            rejected = session.smoother.rejected(),
            "Heart-rate monitoring finished"
        );

        match smoothed {
            Some(value) if value >= self.config.min_valid_bpm => {
                let event = HeartRateEvent {
                    timestamp: self.clock.now(),
                    value,
                    source: session.source,
                };
                if self.events_tx.send(event).is_err() {
                    debug!(session = %session.id, "No event recorder listening");
                }
            }
            _ => debug!(session = %session.id, "No valid reading; nothing recorded"),
        }

        self.publish();
    }

    fn stop_session(&self) -> bool {
        let session = self.state.lock().session.take();
        let Some(mut session) = session else {
            return false;
        };

        if let Some(timeout) = session.timeout.take() {
            self.scheduler.cancel(timeout);
        }
        if let Some(subscription) = session.subscription.take() {
            subscription.stop();
        }

        info!(session = %session.id, source = %session.source, "Heart-rate monitoring stopped");
        self.publish();
        true
    }

    fn arm_auto(self: &Arc<Self>) {
        if !self.device.is_connected() {
            debug!("Auto-monitoring waits for the device");
            return;
        }

        let now = self.clock.now();
        let interval = self.config.auto_interval();
        let (generation, previous, check_now) = {
            let mut state = self.state.lock();
            if !state.auto_enabled {
                return;
            }
            let previous = state.disarm_auto();
            let check_now = match state.last_auto_check {
                None => true,
                Some(last) => (now - last).to_std().is_ok_and(|elapsed| elapsed > interval),
            };
            (state.auto_generation, previous, check_now)
        };

        if let Some(previous) = previous {
            self.scheduler.cancel(previous);
        }
        self.publish();

        if check_now {
            self.auto_check();
        }
        self.schedule_auto_tick(generation);
    }

    fn schedule_auto_tick(self: &Arc<Self>, generation: u64) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = self.scheduler.schedule(
            self.config.auto_interval(),
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.on_auto_tick(generation);
                }
            }),
        );

        let stale = {
            let mut state = self.state.lock();
            if state.auto_generation == generation {
                state.auto_timer = Some(handle);
                false
            } else {
                true
            }
        };
        if stale {
            self.scheduler.cancel(handle);
        }
    }

    fn on_auto_tick(self: &Arc<Self>, generation: u64) {
        {
            let mut state = self.state.lock();
            if state.auto_generation != generation || !state.auto_enabled {
                return;
            }
            state.auto_timer = None;
        }

        if self.device.is_connected() {
            self.auto_check();
        } else {
            debug!("Skipping auto check: device not connected");
        }
        self.schedule_auto_tick(generation);
    }

    /// Record the check and start an automatic session if idle
    fn auto_check(self: &Arc<Self>) {
        let idle = {
            let mut state = self.state.lock();
            state.last_auto_check = Some(self.clock.now());
            state.session.is_none()
        };
        if !idle {
            debug!("Auto check skipped: session already running");
            return;
        }
        if let Err(e) = self.start_session(EventSource::Auto) {
            warn!(error = %e, "Automatic heart-rate check failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::device::{CyclingData, ReadingCallback};
    use crate::scheduler::ManualScheduler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Device whose live stream is driven by the test
    #[derive(Default)]
    struct ManualDevice {
        disconnected: AtomicBool,
        fail_stream: AtomicBool,
        callback: Mutex<Option<ReadingCallback>>,
        stops: Arc<AtomicUsize>,
    }

    impl ManualDevice {
        fn emit(&self, reading: Option<u32>) {
            let callback = self.callback.lock().clone();
            if let Some(callback) = callback {
                callback(reading);
            }
        }
    }

    #[async_trait]
    impl DeviceDataSource for ManualDevice {
        fn is_connected(&self) -> bool {
            !self.disconnected.load(Ordering::SeqCst)
        }

        async fn step_count(&self) -> CoreResult<u64> {
            Ok(0)
        }

        async fn cycling_data(&self) -> CoreResult<CyclingData> {
            Ok(CyclingData::default())
        }

        fn start_realtime_heart_rate(&self, callback: ReadingCallback) -> CoreResult<Subscription> {
            if self.fail_stream.load(Ordering::SeqCst) {
                return Err(CoreError::device("sensor busy"));
            }
            *self.callback.lock() = Some(callback);
            let stops = Arc::clone(&self.stops);
            Ok(Subscription::new(move || {
                stops.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    struct Harness {
        monitor: HeartRateMonitor,
        device: Arc<ManualDevice>,
        scheduler: Arc<ManualScheduler>,
        clock: Arc<FixedClock>,
        events: mpsc::UnboundedReceiver<HeartRateEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let device = Arc::new(ManualDevice::default());
            let scheduler = Arc::new(ManualScheduler::new());
            let clock = Arc::new(FixedClock::new("2026-10-18T09:00:00Z".parse().unwrap()));
            let (monitor, _status, events) = HeartRateMonitor::new(
                device.clone(),
                scheduler.clone(),
                clock.clone(),
                MonitoringConfig::default(),
            );
            Self { monitor, device, scheduler, clock, events }
        }

        fn advance(&self, secs: u64) {
            self.clock.advance(chrono::Duration::seconds(secs as i64));
            self.scheduler.advance(Duration::from_secs(secs));
        }
    }

    #[test]
    fn test_manual_session_emits_one_event() {
        let mut h = Harness::new();
        h.monitor.start_manual().unwrap();
        for bpm in [72, 75, 78] {
            h.device.emit(Some(bpm));
        }

        h.advance(29);
        assert!(h.monitor.is_monitoring());
        h.advance(1);
        assert!(!h.monitor.is_monitoring());

        let event = h.events.try_recv().unwrap();
        assert_eq!(event.value, 75);
        assert_eq!(event.source, EventSource::Manual);
        assert!(h.events.try_recv().is_err());
        assert_eq!(h.device.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_emits_nothing_and_cancels_timeout() {
        let mut h = Harness::new();
        h.monitor.start_manual().unwrap();
        h.device.emit(Some(80));

        assert!(h.monitor.stop());
        assert!(!h.monitor.stop());
        assert_eq!(h.scheduler.pending(), 0);

        h.advance(60);
        assert!(h.events.try_recv().is_err());
        assert_eq!(h.device.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_readings_after_stop_are_ignored() {
        let h = Harness::new();
        h.monitor.start_manual().unwrap();
        h.monitor.stop();
        h.device.emit(Some(90));
        assert_eq!(h.monitor.status().accepted, 0);
    }

    #[test]
    fn test_no_event_without_valid_readings() {
        let mut h = Harness::new();
        h.monitor.start_manual().unwrap();
        h.device.emit(None);
        h.device.emit(Some(0));
        h.device.emit(Some(230));
        h.advance(30);
        assert!(h.events.try_recv().is_err());
    }

    #[test]
    fn test_second_start_is_rejected() {
        let h = Harness::new();
        h.monitor.start_manual().unwrap();
        assert!(matches!(h.monitor.start_manual(), Err(CoreError::AlreadyMonitoring)));
    }

    #[test]
    fn test_subscription_failure_returns_to_idle() {
        let h = Harness::new();
        h.device.fail_stream.store(true, Ordering::SeqCst);
        assert!(h.monitor.start_manual().is_err());
        assert_eq!(h.monitor.status().phase, MonitorPhase::Idle);
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[test]
    fn test_status_is_throttled() {
        let h = Harness::new();
        h.monitor.start_manual().unwrap();
        h.device.emit(Some(72));
        assert_eq!(h.monitor.status().bpm, Some(72));

        // Mean of 73 is within the threshold on the second accepted reading
        h.device.emit(Some(74));
        assert_eq!(h.monitor.status().bpm, Some(72));
        assert_eq!(h.monitor.status().accepted, 1);
    }

    #[test]
    fn test_auto_session_lasts_fifteen_seconds() {
        let mut h = Harness::new();
        h.monitor.set_auto_monitoring(true);
        assert!(h.monitor.is_monitoring());
        assert_eq!(h.monitor.status().source, Some(EventSource::Auto));
        h.device.emit(Some(66));

        h.advance(15);
        assert!(!h.monitor.is_monitoring());
        assert_eq!(h.events.try_recv().unwrap().source, EventSource::Auto);
    }

    #[test]
    fn test_one_off_auto_session_arms_no_timer() {
        let mut h = Harness::new();
        h.monitor.start_auto().unwrap();
        assert!(!h.monitor.status().auto_enabled);
        h.device.emit(Some(68));

        h.advance(15);
        assert!(!h.monitor.is_monitoring());
        assert_eq!(h.events.try_recv().unwrap().source, EventSource::Auto);
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[test]
    fn test_auto_rearms_hourly() {
        let h = Harness::new();
        h.monitor.set_auto_monitoring(true);
        h.advance(15);
        assert!(!h.monitor.is_monitoring());

        h.advance(3600 - 15);
        assert!(h.monitor.is_monitoring());
    }

    #[test]
    fn test_reenable_within_hour_waits() {
        let h = Harness::new();
        h.monitor.set_auto_monitoring(true);
        h.advance(15);
        h.monitor.set_auto_monitoring(false);

        h.advance(600);
        h.monitor.set_auto_monitoring(true);
        assert!(!h.monitor.is_monitoring());
    }

    #[test]
    fn test_reenable_after_hour_checks_immediately() {
        let h = Harness::new();
        h.monitor.set_auto_monitoring(true);
        h.advance(15);
        h.monitor.set_auto_monitoring(false);

        h.advance(3601);
        h.monitor.set_auto_monitoring(true);
        assert!(h.monitor.is_monitoring());
    }

    #[test]
    fn test_shutdown_cancels_every_timer() {
        let mut h = Harness::new();
        h.monitor.set_auto_monitoring(true);
        h.monitor.shutdown();
        h.monitor.shutdown();

        assert_eq!(h.scheduler.pending(), 0);
        assert_eq!(h.scheduler.advance(Duration::from_secs(7200)), 0);
        assert!(h.events.try_recv().is_err());
    }

    #[test]
    fn test_disconnect_stops_and_reconnect_rearms() {
        let h = Harness::new();
        h.monitor.set_auto_monitoring(true);
        h.device.disconnected.store(true, Ordering::SeqCst);
        h.monitor.device_disconnected();
        assert!(!h.monitor.is_monitoring());
        assert_eq!(h.scheduler.pending(), 0);

        h.advance(7200);
        h.device.disconnected.store(false, Ordering::SeqCst);
        h.monitor.device_connected();
        assert!(h.monitor.is_monitoring());
    }

    #[test]
    fn test_disconnected_device_cannot_start() {
        let h = Harness::new();
        h.device.disconnected.store(true, Ordering::SeqCst);
        assert!(matches!(h.monitor.start_manual(), Err(CoreError::Device(_))));
    }
}
