/// Session vocabulary shared by navigation and arbitration
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audio stream role of a session
///
/// Only `Multimedia` sessions compete for exclusive playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioStreamRole {
    /// Music, video, podcasts
    #[default]
    Multimedia,

    /// Alarms, ringtones, notifications, phone audio
    Other,
}

impl AudioStreamRole {
    /// Whether this role competes for exclusive playback
    pub fn is_multimedia(self) -> bool {
        self == Self::Multimedia
    }
}

/// Playback status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Producing audio
    Playing,

    /// Paused mid-track
    Paused,

    /// Nothing loaded or end of list reached
    #[default]
    Stopped,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Lifetime policy of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// Destroyed once the owning client disconnects
    #[default]
    Normal,

    /// Survives client disconnect so it can be picked up again
    Resumable,
}

/// Loop mode of a track list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Stop at the end of the list
    #[default]
    None,

    /// Repeat the current track
    Track,

    /// Wrap around to the other end of the list
    Playlist,
}
