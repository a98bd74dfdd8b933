//! Goals service for goal setting and progress tracking
//!
//! Provides business logic for:
//! - Loading goals with defaults backfilled
//! - Updating a single metric's target (load, merge, save)
//! - Progress calculation against the stored goals

use crate::error::CoreResult;
use crate::repositories::{GoalRepository, KeyValueStore};
use health_tracker_shared::{
    calculate_progress, goal_progress, GoalProgress, GoalSet, GoalTarget, Metric,
};
use tracing::{debug, info};

/// Goals service for business logic
pub struct GoalsService;

impl GoalsService {
    /// Load the goal set
    ///
    /// Falls back to defaults when nothing usable is stored.
    pub async fn load_goals(store: &dyn KeyValueStore) -> GoalSet {
        match GoalRepository::get(store).await {
            Some(goals) => goals,
            None => {
                debug!("No stored goals, using defaults");
                GoalSet::default()
            }
        }
    }

    /// Persist the whole goal set
    pub async fn save_goals(store: &dyn KeyValueStore, goals: &GoalSet) -> CoreResult<()> {
        GoalRepository::save(store, goals).await
    }

    /// Update the target of one metric and return the resulting set
    ///
    /// Read-merge-write without locking: two concurrent updates race and the
    /// later write wins. Write failures propagate to the caller.
    pub async fn update_goal(
        store: &dyn KeyValueStore,
        metric: Metric,
        target: GoalTarget,
    ) -> CoreResult<GoalSet> {
        let current = Self::load_goals(store).await;
        let updated = current.with_target(metric, target)?;
        Self::save_goals(store, &updated).await?;

        info!(metric = %metric, target = %target, "Goal updated");
        Ok(updated)
    }

    /// Progress percentage of `current` against the goal for `metric`
    pub fn progress(metric: Metric, current: f64, goals: &GoalSet) -> f64 {
        calculate_progress(metric, current, goals)
    }

    /// Progress summary for every metric with a reading
    pub fn progress_report(readings: &[(Metric, f64)], goals: &GoalSet) -> Vec<GoalProgress> {
        readings
            .iter()
            .map(|&(metric, current)| goal_progress(metric, current, goals))
            .collect()
    }
}
