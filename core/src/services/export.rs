//! Data export service
//!
//! Renders the heart-rate event log as CSV with a `timestamp,value,source`
//! header row.

use crate::error::{CoreError, CoreResult};
use crate::repositories::KeyValueStore;
use crate::services::events::HeartRateEventService;
use health_tracker_shared::HeartRateEvent;
use serde::Serialize;

/// One CSV row
#[derive(Debug, Serialize)]
struct EventRow<'a> {
    timestamp: String,
    value: u32,
    source: &'a str,
}

/// Export service
pub struct ExportService;

impl ExportService {
    /// Render events as CSV, in the order given
    ///
    /// The header row is written even when there are no events.
    pub fn events_csv(events: &[HeartRateEvent]) -> CoreResult<String> {
        let rows: Vec<EventRow<'_>> = events
            .iter()
            .map(|e| EventRow {
                timestamp: e.timestamp.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
                value: e.value,
                source: e.source.as_str(),
            })
            .collect();

        if rows.is_empty() {
            return Ok("timestamp,value,source\n".to_string());
        }
        Self::to_csv(&rows)
    }

    /// Export the stored event log as CSV
    pub async fn export_events_csv(store: &dyn KeyValueStore) -> CoreResult<String> {
        let events = HeartRateEventService::load_events(store).await;
        Self::events_csv(&events)
    }

    fn to_csv<T: Serialize>(data: &[T]) -> CoreResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record).map_err(|e| {
                CoreError::Internal(anyhow::anyhow!("CSV serialization error: {}", e))
            })?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| CoreError::Internal(anyhow::anyhow!("CSV flush error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| CoreError::Internal(anyhow::anyhow!("CSV encoding error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use health_tracker_shared::EventSource;

    #[test]
    fn test_empty_export_has_header() {
        assert_eq!(ExportService::events_csv(&[]).unwrap(), "timestamp,value,source\n");
    }

    #[test]
    fn test_events_csv_rows() {
        let events = vec![
            HeartRateEvent {
                timestamp: Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap(),
                value: 74,
                source: EventSource::Auto,
            },
            HeartRateEvent {
                timestamp: Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap(),
                value: 68,
                source: EventSource::Manual,
            },
        ];

        let csv = ExportService::events_csv(&events).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "timestamp,value,source",
                "2026-10-18T09:30:00Z,74,auto",
                "2026-10-18T08:00:00Z,68,manual",
            ]
        );
    }

    #[tokio::test]
    async fn test_export_reads_store() {
        let store = crate::repositories::MemoryStore::new();
        let csv = ExportService::export_events_csv(&store).await.unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
