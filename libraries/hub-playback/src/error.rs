//! Error types for track list navigation

use hub_core::{ErrorKind, HubError, TrackId};
use thiserror::Error;

/// Why a move request failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// The track to move is not in the list
    #[error("move source not found: {0}")]
    SourceNotFound(TrackId),

    /// The track to move after is not in the list
    #[error("move destination not found: {0}")]
    DestinationNotFound(TrackId),
}

/// Track list errors
#[derive(Debug, Error)]
pub enum TrackListError {
    /// No track with this id in the list
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    /// Move failed
    #[error(transparent)]
    Move(#[from] MoveError),

    /// Operation needs at least one track
    #[error("Track list is empty")]
    EmptyTrackList,

    /// Operation needs a current track
    #[error("No current track")]
    NoCurrentTrack,

    /// The identifier is already in the list
    #[error("Duplicate track id: {0}")]
    DuplicateTrack(TrackId),

    /// URI failed admission (unknown scheme, malformed, missing local file)
    #[error("Invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Caller is not allowed to open the URI
    #[error("Permission denied for URI {0}")]
    PermissionDenied(String),

    /// A batch insert stopped at the entry `index`
    ///
    /// Entries before `index` were admitted and stay in the list.
    #[error("Batch rejected at entry {index} ({uri}): {source}")]
    BatchRejected {
        index: usize,
        uri: String,
        #[source]
        source: Box<TrackListError>,
    },
}

impl TrackListError {
    pub(crate) fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TrackNotFound(_) | Self::Move(_) => ErrorKind::NotFound,
            Self::EmptyTrackList | Self::NoCurrentTrack | Self::DuplicateTrack(_) => {
                ErrorKind::InvalidTransition
            }
            Self::InvalidUri { .. } => ErrorKind::InvalidUri,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::BatchRejected { source, .. } => source.kind(),
        }
    }
}

impl From<TrackListError> for HubError {
    fn from(err: TrackListError) -> Self {
        match err {
            TrackListError::TrackNotFound(id) => HubError::not_found("Track", id.as_str()),
            TrackListError::Move(MoveError::SourceNotFound(id)) => {
                HubError::not_found("Move source", id.as_str())
            }
            TrackListError::Move(MoveError::DestinationNotFound(id)) => {
                HubError::not_found("Move destination", id.as_str())
            }
            TrackListError::InvalidUri { uri, reason } => HubError::invalid_uri(uri, reason),
            TrackListError::PermissionDenied(uri) => HubError::permission_denied(uri),
            other @ (TrackListError::EmptyTrackList
            | TrackListError::NoCurrentTrack
            | TrackListError::DuplicateTrack(_)
            | TrackListError::BatchRejected { .. }) => match other.kind() {
                ErrorKind::NotFound => HubError::not_found("Track", other.to_string()),
                ErrorKind::InvalidUri => HubError::invalid_uri(String::new(), other.to_string()),
                ErrorKind::PermissionDenied => HubError::permission_denied(other.to_string()),
                ErrorKind::InvalidTransition => HubError::invalid_transition(other.to_string()),
            },
        }
    }
}

/// Result type for track list operations
pub type Result<T> = std::result::Result<T, TrackListError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_rejection_reports_inner_kind() {
        let err = TrackListError::BatchRejected {
            index: 2,
            uri: "file:///gone.ogg".to_string(),
            source: Box::new(TrackListError::PermissionDenied("file:///gone.ogg".into())),
        };
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(HubError::from(err).kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn move_errors_are_not_found() {
        let err = TrackListError::from(MoveError::DestinationNotFound(TrackId::new("/x")));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(HubError::from(err).kind(), ErrorKind::NotFound);
    }

    #[test]
    fn empty_list_is_invalid_transition() {
        let err: HubError = TrackListError::EmptyTrackList.into();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }
}
