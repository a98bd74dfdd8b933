//! Goals repository
//!
//! The whole goal set is one JSON document under a single key.

use crate::error::CoreResult;
use crate::repositories::store::{read_json, write_json, KeyValueStore};
use health_tracker_shared::GoalSet;

/// Storage key for the goal document
pub const GOALS_KEY: &str = "health_tracker_user_goals";

/// Goal repository
pub struct GoalRepository;

impl GoalRepository {
    /// Read the stored goal set
    ///
    /// Missing keys inside the document are backfilled from defaults during
    /// decoding. An absent, unreadable or malformed document yields `None`.
    pub async fn get(store: &dyn KeyValueStore) -> Option<GoalSet> {
        read_json(store, GOALS_KEY).await
    }

    /// Replace the stored goal set
    pub async fn save(store: &dyn KeyValueStore, goals: &GoalSet) -> CoreResult<()> {
        write_json(store, GOALS_KEY, goals).await
    }
}
