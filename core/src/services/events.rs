//! Heart-rate event log service
//!
//! A bounded, newest-first log of completed monitoring sessions. Every append
//! rewrites the whole list.

use crate::error::CoreResult;
use crate::repositories::{HeartRateEventRepository, KeyValueStore};
use health_tracker_shared::HeartRateEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default upper bound on stored events
pub const MAX_EVENTS: usize = 50;

/// Heart-rate event log service
pub struct HeartRateEventService;

impl HeartRateEventService {
    /// Prepend an event, evict beyond `max_events`, persist the full list
    ///
    /// Returns the list as written.
    pub async fn append(
        store: &dyn KeyValueStore,
        event: HeartRateEvent,
        max_events: usize,
    ) -> CoreResult<Vec<HeartRateEvent>> {
        let mut events = HeartRateEventRepository::get_all(store).await;
        events.insert(0, event);
        events.truncate(max_events);

        HeartRateEventRepository::save_all(store, &events).await?;
        debug!(count = events.len(), "Heart-rate event appended");
        Ok(events)
    }

    /// Stored events, newest first
    pub async fn load_events(store: &dyn KeyValueStore) -> Vec<HeartRateEvent> {
        HeartRateEventRepository::get_all(store).await
    }
}

/// Append every event received on `events` until the channel closes
///
/// Write failures are logged and the event is dropped. The task resolves to
/// the number of events recorded.
pub fn spawn_event_recorder(
    store: Arc<dyn KeyValueStore>,
    max_events: usize,
    mut events: mpsc::UnboundedReceiver<HeartRateEvent>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut recorded = 0;
        while let Some(event) = events.recv().await {
            let value = event.value;
            let source = event.source;
            match HeartRateEventService::append(store.as_ref(), event, max_events).await {
                Ok(_) => {
                    recorded += 1;
                    info!(bpm = value, source = %source, "Heart-rate event recorded");
                }
                Err(e) => warn!(bpm = value, error = %e, "Dropping heart-rate event"),
            }
        }
        debug!(recorded, "Event recorder finished");
        recorded
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MemoryStore, EVENTS_KEY};
    use chrono::{Duration, TimeZone, Utc};
    use health_tracker_shared::EventSource;

    fn event(minute: i64, value: u32) -> HeartRateEvent {
        HeartRateEvent {
            timestamp: Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap()
                + Duration::minutes(minute),
            value,
            source: EventSource::Manual,
        }
    }

    #[tokio::test]
    async fn test_append_newest_first() {
        let store = MemoryStore::new();
        HeartRateEventService::append(&store, event(0, 70), MAX_EVENTS).await.unwrap();
        let events = HeartRateEventService::append(&store, event(1, 80), MAX_EVENTS).await.unwrap();

        assert_eq!(events[0].value, 80);
        assert_eq!(events[1].value, 70);
        assert_eq!(HeartRateEventService::load_events(&store).await, events);
    }

    #[tokio::test]
    async fn test_log_is_bounded() {
        let store = MemoryStore::new();
        for i in 0..51 {
            HeartRateEventService::append(&store, event(i, 60 + i as u32), MAX_EVENTS)
                .await
                .unwrap();
        }

        let events = HeartRateEventService::load_events(&store).await;
        assert_eq!(events.len(), 50);
        assert_eq!(events[0].value, 110);
        // The very first event was evicted
        assert!(events.iter().all(|e| e.value != 60));
    }

    #[tokio::test]
    async fn test_malformed_log_is_empty() {
        let store = MemoryStore::with_entries([(EVENTS_KEY, "[{\"broken\"")]);
        assert!(HeartRateEventService::load_events(&store).await.is_empty());

        let events = HeartRateEventService::append(&store, event(0, 72), MAX_EVENTS).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_recorder_drains_channel() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = spawn_event_recorder(store.clone(), MAX_EVENTS, rx);

        tx.send(event(0, 71)).unwrap();
        tx.send(event(1, 74)).unwrap();
        drop(tx);

        assert_eq!(recorder.await.unwrap(), 2);
        let events = HeartRateEventService::load_events(store.as_ref()).await;
        assert_eq!(events.iter().map(|e| e.value).collect::<Vec<_>>(), vec![74, 71]);
    }
}
