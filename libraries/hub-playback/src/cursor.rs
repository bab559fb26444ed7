//! Navigation cursor
//!
//! Tracks the current position in a `TrackCollection` and computes next and
//! previous targets under the active loop mode and shuffle order.
//!
//! The current track is held by identifier and looked up on every read, so no
//! edit to the collection can leave the cursor pointing at a removed track.

use crate::collection::TrackCollection;
use crate::error::{Result, TrackListError};
use crate::events::TrackListEvent;
use crate::shuffle::{insert_randomly, shuffled_order};
use crate::types::{InsertPosition, MoveTarget, NavigationConfig};
use hub_core::{LoopMode, TrackId};
use std::time::Duration;
use tracing::debug;

/// Cursor over a track collection with loop and shuffle
///
/// `current == None` is the sentinel "no current track". Navigation resolves
/// the sentinel to the head of the active ordering before computing a target.
#[derive(Debug, Clone)]
pub struct NavigationCursor {
    collection: TrackCollection,

    /// Shuffled projection of `collection`, present while shuffle is on
    shuffled: Option<Vec<TrackId>>,

    current: Option<TrackId>,
    loop_mode: LoopMode,

    /// Last reported playback position of the current track
    position_hint: Duration,
    restart_threshold: Duration,

    pending_events: Vec<TrackListEvent>,
}

impl NavigationCursor {
    /// Create an empty cursor
    pub fn new(config: &NavigationConfig) -> Self {
        Self {
            collection: TrackCollection::new(),
            shuffled: config.initial_shuffle.then(Vec::new),
            current: None,
            loop_mode: config.initial_loop_mode,
            position_hint: Duration::ZERO,
            restart_threshold: config.restart_threshold(),
            pending_events: Vec::new(),
        }
    }

    // ===== Queries =====

    pub fn collection(&self) -> &TrackCollection {
        &self.collection
    }

    /// Tracks in insertion order
    pub fn tracks(&self) -> &[TrackId] {
        self.collection.as_slice()
    }

    /// Tracks in the order navigation follows (shuffled or insertion)
    pub fn ordering(&self) -> &[TrackId] {
        match &self.shuffled {
            Some(order) => order,
            None => self.collection.as_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.collection.contains(id)
    }

    /// Current track, `None` for the sentinel
    pub fn current(&self) -> Option<&TrackId> {
        self.current.as_ref()
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    pub fn shuffle(&self) -> bool {
        self.shuffled.is_some()
    }

    pub fn position_hint(&self) -> Duration {
        self.position_hint
    }

    /// Record the playback position of the current track
    pub fn set_position_hint(&mut self, position: Duration) {
        self.position_hint = position;
    }

    /// Whether a later track exists in the active ordering, ignoring loop mode
    pub fn has_next(&self) -> bool {
        let ordering = self.ordering();
        match self.current_index() {
            Some(index) => index + 1 < ordering.len(),
            // The sentinel resolves to the head when navigated
            None => self.current.is_none() && ordering.len() >= 2,
        }
    }

    /// Whether an earlier track exists in the active ordering, ignoring loop mode
    pub fn has_previous(&self) -> bool {
        self.current_index().is_some_and(|index| index > 0)
    }

    /// Whether "next" would do anything other than end the list
    pub fn can_go_next(&self) -> bool {
        !self.is_empty() && (self.has_next() || self.loop_mode != LoopMode::None)
    }

    /// Whether "previous" would do anything other than end the list
    pub fn can_go_previous(&self) -> bool {
        !self.is_empty() && (self.has_previous() || self.loop_mode != LoopMode::None)
    }

    fn current_index(&self) -> Option<usize> {
        let current = self.current.as_ref()?;
        self.ordering().iter().position(|id| id == current)
    }

    /// Index navigation starts from; the sentinel counts as the head
    ///
    /// `None` if the list is empty.
    fn start_index(&self) -> Option<usize> {
        match self.current {
            Some(_) => self.current_index(),
            None if self.is_empty() => None,
            None => Some(0),
        }
    }

    /// Track playback would start from: the current one, or the head for the sentinel
    pub fn playable(&self) -> Option<TrackId> {
        let index = self.start_index()?;
        self.ordering().get(index).cloned()
    }

    /// Make `id` current after it was opened outside navigation
    ///
    /// Only resolves the sentinel. Emits `TrackChanged` but no `GoToTrack`.
    ///
    /// # Errors
    /// `TrackNotFound` if `id` is not in the list
    pub fn adopt_current(&mut self, id: &TrackId) -> Result<()> {
        if !self.contains(id) {
            return Err(TrackListError::TrackNotFound(id.clone()));
        }
        if self.current.is_none() {
            self.current = Some(id.clone());
            self.position_hint = Duration::ZERO;
            self.pending_events
                .push(TrackListEvent::TrackChanged(id.clone()));
        }
        Ok(())
    }

    // ===== Navigation =====

    /// Move to the next track
    ///
    /// Returns the new current track, or `None` after emitting `EndOfTrackList`.
    ///
    /// # Errors
    /// `EmptyTrackList` if there is nothing to navigate
    pub fn advance(&mut self) -> Result<Option<TrackId>> {
        let index = self.start_index().ok_or(TrackListError::EmptyTrackList)?;
        let ordering = self.ordering();

        let target = match self.loop_mode {
            LoopMode::Track => ordering.get(index).cloned(),
            LoopMode::Playlist if index + 1 >= ordering.len() => {
                debug!("Wrapping to the first track");
                ordering.first().cloned()
            }
            _ => ordering.get(index + 1).cloned(),
        };

        Ok(self.finish_navigation(target))
    }

    /// Move to the previous track, or restart the current one
    ///
    /// Past the restart threshold the current track is restarted whatever the
    /// loop mode.
    ///
    /// # Errors
    /// `EmptyTrackList` if there is nothing to navigate
    pub fn retreat(&mut self) -> Result<Option<TrackId>> {
        let index = self.start_index().ok_or(TrackListError::EmptyTrackList)?;
        let ordering = self.ordering();

        let target = if self.position_hint > self.restart_threshold {
            debug!(position = ?self.position_hint, "Restarting current track");
            ordering.get(index).cloned()
        } else {
            match self.loop_mode {
                LoopMode::Track => ordering.get(index).cloned(),
                LoopMode::Playlist if index == 0 => {
                    debug!("Wrapping to the last track");
                    ordering.last().cloned()
                }
                _ => index.checked_sub(1).and_then(|i| ordering.get(i)).cloned(),
            }
        };

        Ok(self.finish_navigation(target))
    }

    fn finish_navigation(&mut self, target: Option<TrackId>) -> Option<TrackId> {
        match target {
            Some(id) => {
                debug!(track = %id, "Navigated");
                self.set_current(id.clone());
                Some(id)
            }
            None => {
                debug!("End of track list reached");
                self.pending_events.push(TrackListEvent::EndOfTrackList);
                None
            }
        }
    }

    fn set_current(&mut self, id: TrackId) {
        self.current = Some(id.clone());
        self.position_hint = Duration::ZERO;
        self.pending_events
            .push(TrackListEvent::TrackChanged(id.clone()));
        self.pending_events.push(TrackListEvent::GoToTrack(id));
    }

    /// Make `id` the current track
    ///
    /// # Errors
    /// `TrackNotFound` if `id` is not in the list; the cursor is unchanged
    pub fn go_to(&mut self, id: &TrackId) -> Result<()> {
        if !self.collection.contains(id) {
            return Err(TrackListError::TrackNotFound(id.clone()));
        }
        self.set_current(id.clone());
        Ok(())
    }

    // ===== Edits =====

    /// Insert a track without emitting events
    ///
    /// With shuffle on, the track lands at a random slot after the current one.
    ///
    /// # Errors
    /// `TrackNotFound` if the insert anchor is missing, `DuplicateTrack` if
    /// `id` is already present
    pub fn insert(&mut self, id: TrackId, position: &InsertPosition) -> Result<()> {
        if let InsertPosition::After(after) = position {
            if !self.collection.contains(after) {
                return Err(TrackListError::TrackNotFound(after.clone()));
            }
        }
        if !self.collection.insert(id.clone(), position) {
            return Err(TrackListError::DuplicateTrack(id));
        }
        if let Some(order) = &mut self.shuffled {
            insert_randomly(order, id, self.current.as_ref());
        }
        Ok(())
    }

    /// Remove a track
    ///
    /// When `id` is current, its successor is taken from the pre-removal
    /// ordering (wrapping under playlist loop) and the cursor is resolved to
    /// it by identifier after the removal. A missing successor leaves the
    /// sentinel and emits `EndOfTrackList`.
    ///
    /// # Errors
    /// `TrackNotFound` if `id` is not in the list
    pub fn remove(&mut self, id: &TrackId) -> Result<()> {
        if !self.collection.contains(id) {
            return Err(TrackListError::TrackNotFound(id.clone()));
        }

        let removing_current = self.current.as_ref() == Some(id);
        let successor = if removing_current {
            self.successor_of(id)
        } else {
            self.current.clone()
        };

        self.collection.remove(id);
        if let Some(order) = &mut self.shuffled {
            order.retain(|t| t != id);
        }
        self.pending_events
            .push(TrackListEvent::TrackRemoved(id.clone()));

        let resolved = successor.filter(|s| self.collection.contains(s));
        if !removing_current {
            self.current = resolved;
            return Ok(());
        }

        match resolved {
            Some(next) => {
                debug!(removed = %id, next = %next, "Removed current track");
                self.set_current(next);
            }
            None => {
                debug!(removed = %id, "Removed current track, nothing left to play");
                self.current = None;
                self.position_hint = Duration::ZERO;
                self.pending_events.push(TrackListEvent::EndOfTrackList);
            }
        }
        Ok(())
    }

    fn successor_of(&self, id: &TrackId) -> Option<TrackId> {
        let ordering = self.ordering();
        let index = ordering.iter().position(|t| t == id)?;

        match ordering.get(index + 1) {
            Some(next) => Some(next.clone()),
            None if self.loop_mode == LoopMode::Playlist => {
                ordering.first().filter(|first| *first != id).cloned()
            }
            None => None,
        }
    }

    /// Relocate `id` to immediately after `to`
    ///
    /// The current track keeps its identity even if its position shifts.
    ///
    /// # Errors
    /// `Move(SourceNotFound)` or `Move(DestinationNotFound)`; nothing changes
    pub fn move_track(&mut self, id: &TrackId, to: &MoveTarget) -> Result<()> {
        self.collection.move_track(id, to)?;

        let to = match to {
            MoveTarget::Head => None,
            MoveTarget::After(after) => Some(after.clone()),
        };
        self.pending_events.push(TrackListEvent::TrackMoved {
            id: id.clone(),
            to,
        });
        Ok(())
    }

    /// Turn shuffle on or off
    ///
    /// Turning it on builds a fresh permutation with the current track first.
    /// Turning it off drops the permutation; the collection keeps its
    /// insertion order throughout.
    pub fn set_shuffle(&mut self, shuffle: bool) {
        match (shuffle, self.shuffled.is_some()) {
            (true, false) => {
                let order = shuffled_order(self.collection.as_slice(), self.current.as_ref());
                self.shuffled = Some(order);
            }
            (false, true) => self.shuffled = None,
            _ => {}
        }
    }

    /// Remove every track
    pub fn reset(&mut self) {
        self.collection.clear();
        if let Some(order) = &mut self.shuffled {
            order.clear();
        }
        self.current = None;
        self.position_hint = Duration::ZERO;
        self.pending_events.push(TrackListEvent::TrackListReset);
    }

    /// Replace every track in one step, making the first one current
    ///
    /// # Errors
    /// `DuplicateTrack` if `tracks` repeats an identifier; nothing changes
    pub fn replace(&mut self, tracks: Vec<TrackId>) -> Result<Option<TrackId>> {
        let mut collection = TrackCollection::new();
        for id in &tracks {
            if !collection.insert(id.clone(), &InsertPosition::End) {
                return Err(TrackListError::DuplicateTrack(id.clone()));
            }
        }

        let current = collection.first().cloned();
        self.shuffled = self
            .shuffled
            .as_ref()
            .map(|_| shuffled_order(collection.as_slice(), current.as_ref()));
        self.collection = collection;
        self.current = current.clone();
        self.position_hint = Duration::ZERO;

        self.pending_events.push(TrackListEvent::TrackListReplaced {
            tracks,
            current: current.clone(),
        });
        if let Some(id) = &current {
            self.pending_events
                .push(TrackListEvent::GoToTrack(id.clone()));
        }
        Ok(current)
    }

    // ===== Events =====

    pub(crate) fn push_event(&mut self, event: TrackListEvent) {
        self.pending_events.push(event);
    }

    /// Take all queued events, oldest first
    pub fn drain_events(&mut self) -> Vec<TrackListEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }
}

impl Default for NavigationCursor {
    fn default() -> Self {
        Self::new(&NavigationConfig::default())
    }
}
