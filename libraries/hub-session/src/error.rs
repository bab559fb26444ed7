use hub_core::{ErrorKind, HubError, SessionKey};
use hub_playback::TrackListError;
use thiserror::Error;

/// Errors returned by session and arbitration operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionKey),

    #[error(transparent)]
    TrackList(#[from] TrackListError),

    #[error(transparent)]
    Engine(#[from] HubError),

    #[error("Arbitration engine is not running")]
    EngineStopped,
}

impl SessionError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionNotFound(_) => ErrorKind::NotFound,
            Self::TrackList(e) => e.kind(),
            Self::Engine(e) => e.kind(),
            Self::EngineStopped => ErrorKind::InvalidTransition,
        }
    }
}

impl From<SessionError> for HubError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SessionNotFound(key) => HubError::not_found("Session", key.to_string()),
            SessionError::TrackList(e) => e.into(),
            SessionError::Engine(e) => e,
            SessionError::EngineStopped => {
                HubError::invalid_transition("Arbitration engine is not running")
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(
            SessionError::SessionNotFound(SessionKey::new(4)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            SessionError::from(TrackListError::EmptyTrackList).kind(),
            ErrorKind::InvalidTransition
        );
        assert_eq!(
            SessionError::from(HubError::invalid_transition("volume")).kind(),
            ErrorKind::InvalidTransition
        );
    }

    #[test]
    fn converts_into_hub_error() {
        let err: HubError = SessionError::SessionNotFound(SessionKey::new(9)).into();
        assert_eq!(err.to_string(), "Session not found: 9");
    }
}
