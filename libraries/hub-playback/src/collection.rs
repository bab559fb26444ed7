//! Ordered track collection
//!
//! Plain data: insertion order is playback order when shuffle is off. Holds no
//! cursor and applies no policy.

use crate::types::{InsertPosition, MoveTarget};
use crate::error::MoveError;
use hub_core::TrackId;

/// Ordered sequence of unique track identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackCollection {
    tracks: Vec<TrackId>,
}

impl TrackCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.contains(id)
    }

    /// Position of `id` in insertion order
    pub fn position(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t == id)
    }

    pub fn first(&self) -> Option<&TrackId> {
        self.tracks.first()
    }

    pub fn last(&self) -> Option<&TrackId> {
        self.tracks.last()
    }

    pub fn as_slice(&self) -> &[TrackId] {
        &self.tracks
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackId> {
        self.tracks.iter()
    }

    /// Insert a track
    ///
    /// Returns `false` without modifying the collection if `id` is already
    /// present or `position` names a track that is not.
    pub fn insert(&mut self, id: TrackId, position: &InsertPosition) -> bool {
        if self.contains(&id) {
            return false;
        }

        let index = match position {
            InsertPosition::Head => 0,
            InsertPosition::End => self.tracks.len(),
            InsertPosition::After(after) => match self.position(after) {
                Some(i) => i + 1,
                None => return false,
            },
        };

        self.tracks.insert(index, id);
        true
    }

    /// Remove a track, returning the index it occupied
    pub fn remove(&mut self, id: &TrackId) -> Option<usize> {
        let index = self.position(id)?;
        self.tracks.remove(index);
        Some(index)
    }

    /// Relocate `id` to immediately after `to` (or to the head)
    ///
    /// # Errors
    /// Fails without modifying the collection if either track is missing
    pub fn move_track(&mut self, id: &TrackId, to: &MoveTarget) -> Result<(), MoveError> {
        let from = self
            .position(id)
            .ok_or_else(|| MoveError::SourceNotFound(id.clone()))?;

        if let MoveTarget::After(dest) = to {
            if !self.contains(dest) {
                return Err(MoveError::DestinationNotFound(dest.clone()));
            }
            if dest == id {
                return Ok(());
            }
        }

        let track = self.tracks.remove(from);
        let index = match to {
            MoveTarget::Head => 0,
            // Destination was checked above and is not the moved track
            MoveTarget::After(dest) => self.position(dest).map_or(self.tracks.len(), |i| i + 1),
        };
        self.tracks.insert(index, track);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}
