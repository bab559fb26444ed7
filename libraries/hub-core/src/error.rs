/// Core error types for the media hub
use thiserror::Error;

/// Result type alias using `HubError`
pub type Result<T> = std::result::Result<T, HubError>;

/// The four failure kinds a client-facing operation can report
///
/// Every error in the workspace maps onto exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown session key, unknown track id, move source or destination missing
    NotFound,
    /// URI failed the existence check or is not admissible
    InvalidUri,
    /// Authorization explicitly denied
    PermissionDenied,
    /// The operation is not valid in the current state (e.g. empty list)
    InvalidTransition,
}

/// Core error type for the media hub
#[derive(Error, Debug)]
pub enum HubError {
    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// URI rejected by admission checks
    #[error("Invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Permission denied with context
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation not valid in the current state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Media engine reported a failure
    #[error("Media engine error: {0}")]
    Engine(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HubError {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid URI error
    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create an invalid transition error
    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    /// Create a media engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Classify this error
    ///
    /// Engine failures surface as `InvalidTransition` (the engine refused the
    /// state change); I/O failures while probing a URI surface as `InvalidUri`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidUri { .. } | Self::Io(_) => ErrorKind::InvalidUri,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::InvalidTransition(_) | Self::Engine(_) => ErrorKind::InvalidTransition,
        }
    }
}
