//! Configuration management for the Health Tracker core
//!
//! Configuration is loaded hierarchically:
//! 1. Default values (in code)
//! 2. TOML config files (config/development.toml or config/production.toml)
//! 3. Environment variables (prefix: HT__)

use anyhow::Result;
use crate::services::events::MAX_EVENTS;
use health_tracker_shared::smoothing::SmootherConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

/// Key-value storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Heart-rate sampling loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub manual_duration_secs: u64,
    pub auto_duration_secs: u64,
    pub auto_interval_secs: u64,
    pub buffer_capacity: usize,
    pub significant_change_bpm: u32,
    pub refresh_every: u32,
    pub min_valid_bpm: u32,
    pub max_valid_bpm: u32,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            manual_duration_secs: 30,
            auto_duration_secs: 15,
            auto_interval_secs: 3600, // 1 hour
            buffer_capacity: 3,
            significant_change_bpm: 3,
            refresh_every: 3,
            min_valid_bpm: 40,
            max_valid_bpm: 200,
        }
    }
}

impl MonitoringConfig {
    #[inline]
    pub fn manual_duration(&self) -> Duration {
        Duration::from_secs(self.manual_duration_secs)
    }

    #[inline]
    pub fn auto_duration(&self) -> Duration {
        Duration::from_secs(self.auto_duration_secs)
    }

    #[inline]
    pub fn auto_interval(&self) -> Duration {
        Duration::from_secs(self.auto_interval_secs)
    }

    /// Smoother settings derived from this configuration
    pub fn smoother(&self) -> SmootherConfig {
        SmootherConfig {
            capacity: self.buffer_capacity,
            significant_change_bpm: self.significant_change_bpm,
            refresh_every: self.refresh_every,
            min_valid_bpm: self.min_valid_bpm,
            max_valid_bpm: self.max_valid_bpm,
        }
    }
}

/// Heart-rate event log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    pub max_events: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { max_events: MAX_EVENTS }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                url: "sqlite://health_tracker.db?mode=rwc".to_string(),
                max_connections: 1,
            },
            monitoring: MonitoringConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from files and environment
    ///
    /// Loading order (later sources override earlier):
    /// 1. Default values
    /// 2. Config file based on RUST_ENV (development.toml or production.toml)
    /// 3. Environment variables with HT__ prefix
    pub fn load() -> Result<Self> {
        let env = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());
        let config_file = format!("config/{}.toml", env);

        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&TrackerConfig::default())?)
            // Load from environment-specific config file
            .add_source(
                config::File::with_name(&config_file)
                    .required(false)
            )
            // Override with environment variables (HT__ prefix)
            // e.g., HT__MONITORING__MANUAL_DURATION_SECS=60
            .add_source(
                config::Environment::with_prefix("HT")
                    .separator("__")
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Check if running in production mode
    pub fn is_production() -> bool {
        env::var("RUST_ENV")
            .map(|v| v == "production")
            .unwrap_or(false)
    }
}
