//! Heart-rate event repository
//!
//! The event log is persisted as one JSON array, newest first.

use crate::error::CoreResult;
use crate::repositories::store::{read_json, write_json, KeyValueStore};
use health_tracker_shared::HeartRateEvent;

/// Storage key for the heart-rate event log
pub const EVENTS_KEY: &str = "heartRateEvents";

/// Heart-rate event repository
pub struct HeartRateEventRepository;

impl HeartRateEventRepository {
    /// Read the whole log; absent or malformed data is an empty log
    pub async fn get_all(store: &dyn KeyValueStore) -> Vec<HeartRateEvent> {
        read_json(store, EVENTS_KEY).await.unwrap_or_default()
    }

    /// Replace the whole log
    pub async fn save_all(store: &dyn KeyValueStore, events: &[HeartRateEvent]) -> CoreResult<()> {
        write_json(store, EVENTS_KEY, events).await
    }
}
