//! Health snapshot repository
//!
//! Each snapshot field lives under its own key so fields can be written
//! independently. Histories and labels are JSON arrays; current readings are
//! decimal integer strings; the active tab and last-updated stamp are plain
//! strings.

use crate::error::CoreResult;
use crate::repositories::store::{read_json, write_json, KeyValueStore};
use health_tracker_shared::Metric;
use tracing::warn;

pub const CURRENT_STEPS_KEY: &str = "currentSteps";
pub const CURRENT_HEART_RATE_KEY: &str = "currentHeartRate";
pub const ACTIVE_TAB_KEY: &str = "activeTab";
pub const LAST_UPDATED_KEY: &str = "lastUpdated";

/// Snapshot repository
pub struct SnapshotRepository;

impl SnapshotRepository {
    pub async fn get_history(store: &dyn KeyValueStore, metric: Metric) -> Option<Vec<f64>> {
        read_json(store, metric.history_key()).await
    }

    pub async fn set_history(
        store: &dyn KeyValueStore,
        metric: Metric,
        history: &[f64],
    ) -> CoreResult<()> {
        write_json(store, metric.history_key(), history).await
    }

    pub async fn get_labels(store: &dyn KeyValueStore, metric: Metric) -> Option<Vec<String>> {
        read_json(store, metric.labels_key()).await
    }

    pub async fn set_labels(
        store: &dyn KeyValueStore,
        metric: Metric,
        labels: &[String],
    ) -> CoreResult<()> {
        write_json(store, metric.labels_key(), labels).await
    }

    /// Read a decimal integer stored as text
    pub async fn get_integer(store: &dyn KeyValueStore, key: &str) -> Option<i64> {
        let raw = Self::get_text(store, key).await?;
        match raw.trim().parse::<i64>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, raw = %raw, error = %e, "Ignoring non-integer cached value");
                None
            }
        }
    }

    pub async fn set_integer(store: &dyn KeyValueStore, key: &str, value: i64) -> CoreResult<()> {
        store.set(key, &value.to_string()).await
    }

    pub async fn get_text(store: &dyn KeyValueStore, key: &str) -> Option<String> {
        match store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cached value");
                None
            }
        }
    }

    pub async fn set_text(store: &dyn KeyValueStore, key: &str, value: &str) -> CoreResult<()> {
        store.set(key, value).await
    }
}
