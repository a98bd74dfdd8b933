//! Health Tracker core library
//!
//! Goal storage, the health data cache, the heart-rate sampling loop and the
//! dashboard refresh flow, over pluggable storage, device and timer backends.

pub mod clock;
pub mod config;
pub mod db;
pub mod device;
pub mod error;
pub mod repositories;
pub mod scheduler;
pub mod services;
pub mod state;

pub use error::{CoreError, CoreResult};
pub use state::TrackerContext;
