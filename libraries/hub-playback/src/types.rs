//! Core types for track list navigation

use hub_core::{LoopMode, TrackId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Navigation configuration
///
/// Loaded from the `[navigation]` section of the broker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Past this position, "previous" restarts the current track (default: 5000)
    #[serde(default = "default_restart_threshold_ms")]
    pub restart_threshold_ms: u64,

    /// Loop mode of newly created track lists (default: none)
    #[serde(default)]
    pub initial_loop_mode: LoopMode,

    /// Shuffle state of newly created track lists (default: false)
    #[serde(default)]
    pub initial_shuffle: bool,
}

fn default_restart_threshold_ms() -> u64 {
    5000
}

impl NavigationConfig {
    pub fn restart_threshold(&self) -> Duration {
        Duration::from_millis(self.restart_threshold_ms)
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            restart_threshold_ms: default_restart_threshold_ms(),
            initial_loop_mode: LoopMode::None,
            initial_shuffle: false,
        }
    }
}

/// Where new tracks go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertPosition {
    /// Before the first track
    Head,

    /// Immediately after the given track
    After(TrackId),

    /// After the last track
    End,
}

/// Destination of a move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveTarget {
    /// The reserved "before-first" target
    Head,

    /// Immediately after the given track
    After(TrackId),
}
