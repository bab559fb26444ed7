//! Media Hub - Track Navigation
//!
//! Platform-agnostic track list management for one playback session.
//!
//! This crate provides:
//! - `TrackCollection`: ordered, unique track identifiers
//! - `NavigationCursor`: current track, next/previous, loop and shuffle
//! - `TrackList`: URI admission, identifier allocation, URI/metadata store
//! - `TrackListEvent`: change notifications plus player directives
//!
//! # Architecture
//!
//! `hub-playback` has no async runtime and no knowledge of other sessions.
//! Every mutation queues events which the owner drains after the call:
//!
//! ```text
//! client command ──▶ TrackList ──▶ NavigationCursor ──▶ pending events
//!                                                          │
//!                        session (hub-session) ◀── drain_events()
//! ```
//!
//! The cursor holds the current track by identifier, never by index, so
//! removing or moving tracks cannot leave it dangling.
//!
//! # Example
//!
//! ```rust
//! use hub_core::{AllowAll, CallerId, LoopMode};
//! use hub_playback::{AdmissionConfig, InsertPosition, NavigationConfig, TrackList, TrackListEvent};
//! use std::sync::Arc;
//!
//! let admission = AdmissionConfig { check_local_files: false, ..AdmissionConfig::default() };
//! let mut list = TrackList::new(&NavigationConfig::default(), admission, Arc::new(AllowAll));
//! let caller = CallerId::new("example");
//!
//! let a = list.add_track_with_uri_at(&caller, "file:///music/a.ogg", &InsertPosition::End, true).unwrap();
//! let b = list.add_track_with_uri_at(&caller, "file:///music/b.ogg", &InsertPosition::End, false).unwrap();
//! list.drain_events();
//!
//! list.set_loop_mode(LoopMode::Playlist);
//! assert_eq!(list.next().unwrap(), Some(b.clone()));
//! assert_eq!(list.next().unwrap(), Some(a.clone()));
//!
//! let events = list.drain_events();
//! assert!(events.contains(&TrackListEvent::TrackChanged(a)));
//! ```

#![forbid(unsafe_code)]

pub mod collection;
pub mod cursor;
pub mod error;
pub mod events;
pub mod shuffle;
pub mod tracklist;
pub mod types;
pub mod uri;

// Re-export main types
pub use collection::TrackCollection;
pub use cursor::NavigationCursor;
pub use error::{MoveError, Result, TrackListError};
pub use events::TrackListEvent;
pub use tracklist::TrackList;
pub use types::{InsertPosition, MoveTarget, NavigationConfig};
pub use uri::{AdmissionConfig, UriCheck};
