//! Track list events
//!
//! Every navigation mutation queues events; the owner drains them after the
//! call returns. Two kinds of event exist:
//! - client-visible change notifications, relayed by the transport layer
//! - player directives (`GoToTrack`, `EndOfTrackList`), consumed by the
//!   owning session to drive its media engine

use hub_core::TrackId;
use serde::{Deserialize, Serialize};

/// Events emitted by a track list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackListEvent {
    /// One track was added
    TrackAdded(TrackId),

    /// Several tracks were added by one batch call
    TracksAdded(Vec<TrackId>),

    /// A track was moved to after `to` (or to the head when `to` is `None`)
    TrackMoved { id: TrackId, to: Option<TrackId> },

    TrackRemoved(TrackId),

    /// The current track changed (or was restarted)
    TrackChanged(TrackId),

    /// Every track was removed
    TrackListReset,

    /// The whole list was replaced in one call
    TrackListReplaced {
        tracks: Vec<TrackId>,
        current: Option<TrackId>,
    },

    /// Directive: open and play this track
    GoToTrack(TrackId),

    /// Directive: nothing left to play, stop
    EndOfTrackList,
}

impl TrackListEvent {
    /// Whether the transport layer relays this event to clients
    pub fn is_client_visible(&self) -> bool {
        !matches!(self, Self::GoToTrack(_) | Self::EndOfTrackList)
    }
}
