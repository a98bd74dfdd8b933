//! Storage repositories
//!
//! Provides the key-value persistence surface and the typed accessors the
//! services use on top of it.

pub mod events;
pub mod goals;
pub mod snapshot;
pub mod store;

pub use events::{HeartRateEventRepository, EVENTS_KEY};
pub use goals::{GoalRepository, GOALS_KEY};
pub use snapshot::SnapshotRepository;
pub use store::{read_json, write_json, KeyValueStore, MemoryStore, SqliteStore};
