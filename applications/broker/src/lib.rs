//! Media Hub Broker Library
//!
//! Daemon around `hub-session`: configuration loading, a simulated media
//! engine, in-process device properties and scenario replay.
//!
//! This library exposes the core components for testing purposes.

pub mod config;
pub mod engine;
pub mod error;
pub mod scenario;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{BrokerConfig, LoggingSettings};
pub use engine::LoggingEngine;
pub use error::{BrokerError, Result};
pub use scenario::{Scenario, ScenarioReport, ScenarioRunner, Step};
pub use state::AppState;
