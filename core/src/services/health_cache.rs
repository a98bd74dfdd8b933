//! Health data cache
//!
//! Persists the latest per-metric chart history, labels and current readings
//! so a screen can render cached data before a live device responds.
//!
//! Every field is stored under its own key. Saving writes only the fields
//! present in the update; loading reads every field independently and leaves
//! absent ones as `None`. Absence means "nothing cached yet", which callers
//! must not confuse with a zero reading.
//!
//! [`spawn_heart_rate_cacher`] keeps the heart-rate fields current while a
//! monitor runs.

use crate::clock::{display_timestamp, Clock};
use crate::repositories::snapshot::{
    ACTIVE_TAB_KEY, CURRENT_HEART_RATE_KEY, CURRENT_STEPS_KEY, LAST_UPDATED_KEY,
};
use crate::repositories::{KeyValueStore, SnapshotRepository};
use crate::services::monitor::MonitorStatus;
use health_tracker_shared::{synthesize, ChartSeries, Granularity, Metric};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Cached chart data for one metric
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedSeries {
    pub history: Option<Vec<f64>>,
    pub labels: Option<Vec<String>>,
}

impl CachedSeries {
    /// Both halves as a chart, when present and aligned
    pub fn to_chart(&self) -> Option<ChartSeries> {
        match (&self.history, &self.labels) {
            (Some(history), Some(labels)) => ChartSeries::new(history.clone(), labels.clone()).ok(),
            _ => None,
        }
    }
}

/// Everything the cache knows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthSnapshot {
    pub steps: CachedSeries,
    pub heart_rate: CachedSeries,
    pub sleep: CachedSeries,
    pub cycling: CachedSeries,
    pub current_steps: Option<i64>,
    pub current_heart_rate: Option<i64>,
    pub active_tab: Option<Granularity>,
    pub last_updated: Option<String>,
}

impl HealthSnapshot {
    pub fn series(&self, metric: Metric) -> &CachedSeries {
        match metric {
            Metric::Steps => &self.steps,
            Metric::HeartRate => &self.heart_rate,
            Metric::Sleep => &self.sleep,
            Metric::Cycling => &self.cycling,
        }
    }

    fn series_mut(&mut self, metric: Metric) -> &mut CachedSeries {
        match metric {
            Metric::Steps => &mut self.steps,
            Metric::HeartRate => &mut self.heart_rate,
            Metric::Sleep => &mut self.sleep,
            Metric::Cycling => &mut self.cycling,
        }
    }

    /// Cached current value for a metric
    ///
    /// Steps and heart rate have dedicated fields; sleep and cycling use the
    /// last point of their cached history.
    pub fn current(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Steps => self.current_steps.map(|v| v as f64),
            Metric::HeartRate => self.current_heart_rate.map(|v| v as f64),
            Metric::Sleep | Metric::Cycling => self
                .series(metric)
                .history
                .as_ref()
                .and_then(|h| h.last().copied()),
        }
    }
}

/// Fields to write in one save
#[derive(Debug, Clone, Default)]
pub struct SnapshotUpdate {
    series: Vec<(Metric, ChartSeries)>,
    current_steps: Option<i64>,
    current_heart_rate: Option<i64>,
    active_tab: Option<Granularity>,
}

impl SnapshotUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, metric: Metric, series: ChartSeries) -> Self {
        self.series.retain(|(m, _)| *m != metric);
        self.series.push((metric, series));
        self
    }

    pub fn with_current_steps(mut self, steps: i64) -> Self {
        self.current_steps = Some(steps);
        self
    }

    pub fn with_current_heart_rate(mut self, bpm: i64) -> Self {
        self.current_heart_rate = Some(bpm);
        self
    }

    pub fn with_active_tab(mut self, tab: Granularity) -> Self {
        self.active_tab = Some(tab);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
            && self.current_steps.is_none()
            && self.current_heart_rate.is_none()
            && self.active_tab.is_none()
    }
}

/// Health data cache service
pub struct HealthCacheService;

impl HealthCacheService {
    /// Write the provided fields and stamp a fresh last-updated time
    ///
    /// Individual write failures are logged and skipped. Returns the stamp.
    pub async fn save_snapshot(
        store: &dyn KeyValueStore,
        clock: &dyn Clock,
        update: SnapshotUpdate,
    ) -> String {
        for (metric, series) in &update.series {
            if let Err(e) = SnapshotRepository::set_history(store, *metric, series.values()).await {
                warn!(metric = %metric, error = %e, "Skipping history write");
            }
            if let Err(e) = SnapshotRepository::set_labels(store, *metric, series.labels()).await {
                warn!(metric = %metric, error = %e, "Skipping labels write");
            }
        }

        if let Some(steps) = update.current_steps {
            if let Err(e) = SnapshotRepository::set_integer(store, CURRENT_STEPS_KEY, steps).await {
                warn!(error = %e, "Skipping current steps write");
            }
        }

        if let Some(bpm) = update.current_heart_rate {
            let written = SnapshotRepository::set_integer(store, CURRENT_HEART_RATE_KEY, bpm).await;
            if let Err(e) = written {
                warn!(error = %e, "Skipping current heart rate write");
            }
        }

        if let Some(tab) = update.active_tab {
            let written = SnapshotRepository::set_text(store, ACTIVE_TAB_KEY, tab.as_str()).await;
            if let Err(e) = written {
                warn!(error = %e, "Skipping active tab write");
            }
        }

        let stamp = display_timestamp(clock.now());
        if let Err(e) = SnapshotRepository::set_text(store, LAST_UPDATED_KEY, &stamp).await {
            warn!(error = %e, "Skipping last-updated write");
        }

        debug!(series = update.series.len(), last_updated = %stamp, "Snapshot saved");
        stamp
    }

    /// Read every cached field independently
    pub async fn load_snapshot(store: &dyn KeyValueStore) -> HealthSnapshot {
        let mut snapshot = HealthSnapshot::default();

        for metric in Metric::ALL {
            let series = snapshot.series_mut(metric);
            series.history = SnapshotRepository::get_history(store, metric).await;
            series.labels = SnapshotRepository::get_labels(store, metric).await;
        }

        snapshot.current_steps = SnapshotRepository::get_integer(store, CURRENT_STEPS_KEY).await;
        snapshot.current_heart_rate =
            SnapshotRepository::get_integer(store, CURRENT_HEART_RATE_KEY).await;
        snapshot.active_tab = SnapshotRepository::get_text(store, ACTIVE_TAB_KEY)
            .await
            .and_then(|tab| tab.parse().ok());
        snapshot.last_updated = SnapshotRepository::get_text(store, LAST_UPDATED_KEY).await;

        snapshot
    }
}

/// Cache every new smoothed heart rate published on `status`
///
/// Each change writes the current heart rate and a daily chart ending at it.
/// Repeats of the last cached value are skipped. Runs until the monitor is
/// dropped and resolves to the number of values cached.
pub fn spawn_heart_rate_cacher(
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    mut status: watch::Receiver<MonitorStatus>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut cached = 0;
        let mut last = status.borrow_and_update().bpm;

        while status.changed().await.is_ok() {
            let bpm = status.borrow_and_update().bpm;
            let Some(value) = bpm.filter(|_| bpm != last) else {
                continue;
            };
            last = bpm;

            let series = synthesize(
                Granularity::Daily,
                f64::from(value),
                Metric::HeartRate,
                clock.today(),
                &mut rand::rng(),
            );
            let update = SnapshotUpdate::new()
                .with_series(Metric::HeartRate, series)
                .with_current_heart_rate(i64::from(value));
            HealthCacheService::save_snapshot(store.as_ref(), clock.as_ref(), update).await;
            cached += 1;
        }

        debug!(cached, "Heart-rate cacher finished");
        cached
    })
}
