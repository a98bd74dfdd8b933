//! Dashboard refresh
//!
//! One refresh of a metric card: read the current value, synthesize the
//! chart, cache it and score it against the stored goals. Nothing here
//! fails; every read degrades to a cached value or zero.

use crate::services::goals::GoalsService;
use crate::services::health_cache::{HealthCacheService, HealthSnapshot, SnapshotUpdate};
use crate::state::TrackerContext;
use health_tracker_shared::{
    goal_progress, synthesize, ChartSeries, GoalProgress, Granularity, Metric,
};
use serde::Serialize;
use tracing::{debug, warn};

/// Where a refresh got its current value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueOrigin {
    Device,
    Cache,
    Placeholder,
}

/// Everything a metric card renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricView {
    pub metric: Metric,
    pub granularity: Granularity,
    pub current: f64,
    pub origin: ValueOrigin,
    pub series: ChartSeries,
    pub progress: GoalProgress,
    pub last_updated: String,
}

/// Dashboard service
pub struct DashboardService;

impl DashboardService {
    /// Refresh one metric at one granularity
    pub async fn refresh(
        ctx: &TrackerContext,
        metric: Metric,
        granularity: Granularity,
    ) -> MetricView {
        let cached = HealthCacheService::load_snapshot(ctx.store()).await;
        let (current, origin) = Self::current_value(ctx, metric, &cached).await;

        let today = ctx.clock().today();
        let series = synthesize(granularity, current, metric, today, &mut rand::rng());

        let mut update = SnapshotUpdate::new()
            .with_series(metric, series.clone())
            .with_active_tab(granularity);
        if origin == ValueOrigin::Device && metric == Metric::Steps {
            update = update.with_current_steps(current.round() as i64);
        }
        let last_updated =
            HealthCacheService::save_snapshot(ctx.store(), ctx.clock(), update).await;

        let goals = GoalsService::load_goals(ctx.store()).await;
        let progress = goal_progress(metric, current, &goals);

        debug!(
            metric = %metric,
            granularity = %granularity,
            current,
            origin = ?origin,
            percent = progress.percent,
            "Dashboard refreshed"
        );

        MetricView {
            metric,
            granularity,
            current,
            origin,
            series,
            progress,
            last_updated,
        }
    }

    /// Current value for `metric`
    ///
    /// Steps and cycling come from the device; heart rate and sleep come from
    /// the cache. A failed device read falls back to the cache, then to zero.
    async fn current_value(
        ctx: &TrackerContext,
        metric: Metric,
        cached: &HealthSnapshot,
    ) -> (f64, ValueOrigin) {
        let live = match metric {
            Metric::Steps => Some(ctx.device().step_count().await.map(|steps| steps as f64)),
            Metric::Cycling => Some(ctx.device().cycling_data().await.map(|c| c.distance_km)),
            Metric::HeartRate | Metric::Sleep => None,
        };

        match live {
            Some(Ok(value)) => return (value, ValueOrigin::Device),
            Some(Err(e)) => {
                warn!(metric = %metric, error = %e, "Device read failed, using cached value")
            }
            None => {}
        }

        match cached.current(metric) {
            Some(value) => (value, ValueOrigin::Cache),
            None => (0.0, ValueOrigin::Placeholder),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::TrackerConfig;
    use crate::device::SimulatedDevice;
    use crate::repositories::snapshot::{ACTIVE_TAB_KEY, CURRENT_HEART_RATE_KEY, CURRENT_STEPS_KEY};
    use crate::repositories::MemoryStore;
    use std::sync::Arc;

    fn context(device: Arc<SimulatedDevice>, store: Arc<MemoryStore>) -> TrackerContext {
        TrackerContext::new(
            store,
            device,
            Arc::new(FixedClock::new("2026-10-18T12:00:00Z".parse().unwrap())),
            TrackerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_steps_from_device_are_cached() {
        let device = Arc::new(SimulatedDevice::default());
        device.set_steps(5000);
        let store = Arc::new(MemoryStore::new());
        let ctx = context(device, store.clone());

        let view = DashboardService::refresh(&ctx, Metric::Steps, Granularity::Daily).await;
        assert_eq!(view.origin, ValueOrigin::Device);
        assert_eq!(view.current, 5000.0);
        assert_eq!(view.series.last(), Some(5000.0));
        assert_eq!(view.progress.percent, 50.0);

        assert_eq!(store.raw(CURRENT_STEPS_KEY).as_deref(), Some("5000"));
        assert_eq!(store.raw(ACTIVE_TAB_KEY).as_deref(), Some("Daily"));
        assert!(store.raw("stepsHistory").is_some());
    }

    #[tokio::test]
    async fn test_device_failure_falls_back_to_cache() {
        let device = Arc::new(SimulatedDevice::default());
        device.set_connected(false);
        let store = Arc::new(MemoryStore::with_entries([(CURRENT_STEPS_KEY, "4200")]));
        let ctx = context(device, store);

        let view = DashboardService::refresh(&ctx, Metric::Steps, Granularity::Weekly).await;
        assert_eq!(view.origin, ValueOrigin::Cache);
        assert_eq!(view.current, 4200.0);
    }

    #[tokio::test]
    async fn test_nothing_anywhere_is_zero() {
        let device = Arc::new(SimulatedDevice::default());
        device.set_connected(false);
        let ctx = context(device, Arc::new(MemoryStore::new()));

        let view = DashboardService::refresh(&ctx, Metric::Cycling, Granularity::Daily).await;
        assert_eq!(view.origin, ValueOrigin::Placeholder);
        assert_eq!(view.current, 0.0);
        assert_eq!(view.progress.percent, 0.0);
    }

    #[tokio::test]
    async fn test_heart_rate_reads_cache() {
        let store = Arc::new(MemoryStore::with_entries([(CURRENT_HEART_RATE_KEY, "88")]));
        let ctx = context(Arc::new(SimulatedDevice::default()), store);

        let view = DashboardService::refresh(&ctx, Metric::HeartRate, Granularity::Daily).await;
        assert_eq!(view.origin, ValueOrigin::Cache);
        assert_eq!(view.series.last(), Some(88.0));
        assert!(view.progress.achieved);
    }
}
