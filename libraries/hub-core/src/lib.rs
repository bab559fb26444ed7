//! Media Hub Core
//!
//! Platform-agnostic core types, traits, and error handling for the media hub
//! session broker.
//!
//! This crate provides the foundational building blocks shared by the track
//! navigation crate (`hub-playback`) and the session arbitration crate
//! (`hub-session`).
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Identifiers**: `TrackId`, `SessionKey`, `CallerId`
//! - **Session vocabulary**: `AudioStreamRole`, `PlaybackStatus`, `Lifetime`, `LoopMode`
//! - **Collaborator traits**: `MediaEngine` (decode/render), `UriAuthorizer`
//! - **Error Handling**: Unified `HubError`, `ErrorKind` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use hub_core::{AudioStreamRole, Lifetime, PlaybackStatus, SessionKey, TrackId};
//!
//! let key = SessionKey::new(7);
//! let track = TrackId::new("/hub/track/0");
//!
//! assert_eq!(key.to_string(), "7");
//! assert_eq!(track.as_str(), "/hub/track/0");
//! assert_eq!(PlaybackStatus::default(), PlaybackStatus::Stopped);
//! assert!(AudioStreamRole::Multimedia.is_multimedia());
//! assert_eq!(Lifetime::default(), Lifetime::Normal);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorKind, HubError, Result};
pub use traits::{AllowAll, EngineState, MediaEngine, MediaInfo, UriAuthorizer, Volume};
pub use types::{
    AudioStreamRole, CallerId, Lifetime, LoopMode, PlaybackStatus, SessionKey, TrackId,
    TrackMetadata, Uri,
};
