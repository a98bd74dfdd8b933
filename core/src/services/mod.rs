//! Business logic services
//!
//! Services encapsulate business logic and coordinate between
//! repositories, the device and the scheduler.

pub mod dashboard;
pub mod events;
pub mod export;
pub mod goals;
pub mod health_cache;
pub mod monitor;

pub use dashboard::{DashboardService, MetricView, ValueOrigin};
pub use events::{spawn_event_recorder, HeartRateEventService, MAX_EVENTS};
pub use export::ExportService;
pub use goals::GoalsService;
pub use health_cache::{
    spawn_heart_rate_cacher, CachedSeries, HealthCacheService, HealthSnapshot, SnapshotUpdate,
};
pub use monitor::{HeartRateMonitor, MonitorPhase, MonitorStatus};
