/// Collaborator traits consumed by the media hub
use crate::error::{HubError, Result};
use crate::types::{CallerId, TrackMetadata};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// State transitions reported by a media engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// URI opened and prerolled
    Ready,
    Playing,
    Paused,
    Stopped,
}

/// What the engine learned about a URI when opening it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaInfo {
    /// Whether the stream carries a video track
    pub has_video: bool,

    /// Metadata available at open time (may be empty)
    pub metadata: TrackMetadata,
}

impl MediaInfo {
    /// Info for an audio-only stream
    pub fn audio() -> Self {
        Self::default()
    }

    /// Info for a stream with video
    pub fn video() -> Self {
        Self {
            has_video: true,
            metadata: TrackMetadata::default(),
        }
    }
}

/// Linear volume in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Volume(f64);

impl Volume {
    pub const MUTED: Self = Self(0.0);
    pub const FULL: Self = Self(1.0);

    /// Create a range-checked volume
    ///
    /// # Errors
    /// Returns `InvalidTransition` when `value` is outside `0.0..=1.0` or NaN
    pub fn new(value: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(HubError::invalid_transition(format!(
                "volume {value} out of range 0.0..=1.0"
            )))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::FULL
    }
}

impl TryFrom<f64> for Volume {
    type Error = HubError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Volume> for f64 {
    fn from(volume: Volume) -> Self {
        volume.0
    }
}

/// External decode/render engine driving one session
///
/// Calls must not block: implementations hand the request to their own
/// pipeline and report the resulting transitions through `EngineState`
/// notifications. The broker may call these while holding its registry lock.
pub trait MediaEngine: Send + Sync {
    /// Open a URI, replacing whatever was loaded before
    ///
    /// # Errors
    /// Returns an error if the engine cannot handle the URI
    fn open(&self, uri: &str) -> Result<MediaInfo>;

    /// Start or resume playback
    ///
    /// # Errors
    /// Returns an error if nothing is loaded or the pipeline refuses
    fn play(&self) -> Result<()>;

    /// Pause playback
    ///
    /// # Errors
    /// Returns an error if the pipeline refuses
    fn pause(&self) -> Result<()>;

    /// Stop playback and release the stream
    ///
    /// # Errors
    /// Returns an error if the pipeline refuses
    fn stop(&self) -> Result<()>;

    /// Seek to a position from the start of the track
    ///
    /// # Errors
    /// Returns an error if the stream is not seekable
    fn seek_to(&self, position: Duration) -> Result<()>;

    /// Current playback position
    fn position(&self) -> Duration;

    fn volume(&self) -> Volume;

    /// # Errors
    /// Returns an error if the pipeline refuses the change
    fn set_volume(&self, volume: Volume) -> Result<()>;
}

/// Authorization of client-supplied URIs
///
/// Implementations answer whether `caller` may open `uri`. Local-file
/// existence is checked separately by the track list.
pub trait UriAuthorizer: Send + Sync {
    fn authorize(&self, caller: &CallerId, uri: &str) -> bool;
}

/// Authorizer that permits everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl UriAuthorizer for AllowAll {
    fn authorize(&self, _caller: &CallerId, _uri: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn volume_is_range_checked() {
        assert_eq!(Volume::new(0.5).unwrap().get(), 0.5);
        assert!(Volume::new(0.0).is_ok());
        assert!(Volume::new(1.0).is_ok());

        let err = Volume::new(1.5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert!(Volume::new(-0.1).is_err());
        assert!(Volume::new(f64::NAN).is_err());
    }

    #[test]
    fn volume_deserialization_rejects_out_of_range() {
        let ok: Volume = serde_json::from_str("0.25").unwrap();
        assert_eq!(ok.get(), 0.25);
        assert!(serde_json::from_str::<Volume>("2.0").is_err());
    }

    #[test]
    fn allow_all_permits_any_uri() {
        let caller = CallerId::new(":1.42");
        assert!(AllowAll.authorize(&caller, "file:///music/a.ogg"));
    }
}
