/// Core domain types for the media hub
mod ids;
mod session;
mod track;

pub use ids::{CallerId, SessionKey, TrackId};
pub use session::{AudioStreamRole, Lifetime, LoopMode, PlaybackStatus};
pub use track::{TrackMetadata, Uri};
