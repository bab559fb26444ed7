//! Per-session track list
//!
//! Combines the navigation cursor with URI admission, identifier allocation
//! and the per-track URI/metadata store. This is the command surface a
//! session exposes to its client.

use crate::cursor::NavigationCursor;
use crate::error::{Result, TrackListError};
use crate::events::TrackListEvent;
use crate::types::{InsertPosition, MoveTarget, NavigationConfig};
use crate::uri::AdmissionConfig;
use hub_core::{CallerId, LoopMode, TrackId, TrackMetadata, Uri, UriAuthorizer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const TRACK_ID_PREFIX: &str = "/hub/track/";

#[derive(Debug, Clone)]
struct TrackEntry {
    uri: Uri,
    metadata: TrackMetadata,
}

/// Track list of one session
pub struct TrackList {
    cursor: NavigationCursor,
    entries: HashMap<TrackId, TrackEntry>,
    next_track: u64,
    admission: AdmissionConfig,
    authorizer: Arc<dyn UriAuthorizer>,
}

impl fmt::Debug for TrackList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackList")
            .field("cursor", &self.cursor)
            .field("entries", &self.entries.len())
            .field("next_track", &self.next_track)
            .finish_non_exhaustive()
    }
}

impl TrackList {
    pub fn new(
        navigation: &NavigationConfig,
        admission: AdmissionConfig,
        authorizer: Arc<dyn UriAuthorizer>,
    ) -> Self {
        Self {
            cursor: NavigationCursor::new(navigation),
            entries: HashMap::new(),
            next_track: 0,
            admission,
            authorizer,
        }
    }

    fn allocate_id(&mut self) -> TrackId {
        let id = TrackId::new(format!("{TRACK_ID_PREFIX}{}", self.next_track));
        self.next_track += 1;
        id
    }

    /// Authorization, syntax, scheme and existence checks for one URI
    fn admit(&self, caller: &CallerId, uri: &str) -> Result<()> {
        let check = match self.admission.check(uri) {
            Ok(check) => check,
            Err(e) => {
                warn!(%caller, uri, error = %e, "Not adding track");
                return Err(e);
            }
        };

        if !self.authorizer.authorize(caller, uri) {
            warn!(%caller, uri, "Not adding track: insufficient permissions");
            return Err(TrackListError::PermissionDenied(uri.to_string()));
        }

        debug!(uri, scheme = check.scheme(), "Admitted track");
        Ok(())
    }

    fn check_anchor(&self, position: &InsertPosition) -> Result<()> {
        match position {
            InsertPosition::After(after) if !self.cursor.contains(after) => {
                Err(TrackListError::TrackNotFound(after.clone()))
            }
            _ => Ok(()),
        }
    }

    fn insert_entry(&mut self, uri: &str, position: &InsertPosition) -> Result<TrackId> {
        let id = self.allocate_id();
        self.cursor.insert(id.clone(), position)?;
        self.entries.insert(
            id.clone(),
            TrackEntry {
                uri: uri.to_string(),
                metadata: TrackMetadata::new().with(TrackMetadata::URL, uri),
            },
        );
        Ok(id)
    }

    // ===== Edits =====

    /// Admit one URI and insert it at `position`
    ///
    /// Emits `TrackAdded`, then `TrackChanged` and `GoToTrack` when
    /// `make_current` is set.
    ///
    /// # Errors
    /// `TrackNotFound` for an unknown anchor, `InvalidUri` or
    /// `PermissionDenied` from admission; nothing changes on error
    pub fn add_track_with_uri_at(
        &mut self,
        caller: &CallerId,
        uri: &str,
        position: &InsertPosition,
        make_current: bool,
    ) -> Result<TrackId> {
        self.check_anchor(position)?;
        self.admit(caller, uri)?;

        let id = self.insert_entry(uri, position)?;
        self.cursor.push_event(TrackListEvent::TrackAdded(id.clone()));
        if make_current {
            self.cursor.go_to(&id)?;
        }
        Ok(id)
    }

    /// Admit and insert several URIs, keeping their order
    ///
    /// The first URI failing admission stops the batch. Tracks admitted
    /// before it stay in the list and are announced with one `TracksAdded`.
    ///
    /// # Errors
    /// `TrackNotFound` for an unknown anchor (nothing changes), or
    /// `BatchRejected` naming the failing entry
    pub fn add_tracks_with_uri_at(
        &mut self,
        caller: &CallerId,
        uris: &[Uri],
        position: &InsertPosition,
    ) -> Result<Vec<TrackId>> {
        self.check_anchor(position)?;

        let mut added: Vec<TrackId> = Vec::with_capacity(uris.len());
        let mut failure = None;

        for (index, uri) in uris.iter().enumerate() {
            if let Err(source) = self.admit(caller, uri) {
                failure = Some(TrackListError::BatchRejected {
                    index,
                    uri: uri.clone(),
                    source: Box::new(source),
                });
                break;
            }

            let at = match (added.last(), position) {
                (Some(prev), InsertPosition::Head | InsertPosition::After(_)) => {
                    InsertPosition::After(prev.clone())
                }
                _ => position.clone(),
            };
            added.push(self.insert_entry(uri, &at)?);
        }

        if !added.is_empty() {
            self.cursor
                .push_event(TrackListEvent::TracksAdded(added.clone()));
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(added),
        }
    }

    /// Replace the whole list with `uris`, making the first one current
    ///
    /// All URIs are checked before anything changes.
    ///
    /// # Errors
    /// `BatchRejected` naming the first failing entry; nothing changes
    pub fn replace_with(&mut self, caller: &CallerId, uris: &[Uri]) -> Result<Option<TrackId>> {
        for (index, uri) in uris.iter().enumerate() {
            self.admit(caller, uri)
                .map_err(|source| TrackListError::BatchRejected {
                    index,
                    uri: uri.clone(),
                    source: Box::new(source),
                })?;
        }

        let ids: Vec<TrackId> = uris.iter().map(|_| self.allocate_id()).collect();
        let current = self.cursor.replace(ids.clone())?;

        self.entries = ids
            .into_iter()
            .zip(uris)
            .map(|(id, uri)| {
                let entry = TrackEntry {
                    uri: uri.clone(),
                    metadata: TrackMetadata::new().with(TrackMetadata::URL, uri.as_str()),
                };
                (id, entry)
            })
            .collect();
        Ok(current)
    }

    /// # Errors
    /// `TrackNotFound` if `id` is not in the list
    pub fn remove_track(&mut self, id: &TrackId) -> Result<()> {
        self.cursor.remove(id)?;
        self.entries.remove(id);
        Ok(())
    }

    /// # Errors
    /// `Move(SourceNotFound)` or `Move(DestinationNotFound)`
    pub fn move_track(&mut self, id: &TrackId, to: &MoveTarget) -> Result<()> {
        self.cursor.move_track(id, to)
    }

    /// # Errors
    /// `TrackNotFound` if `id` is not in the list
    pub fn go_to(&mut self, id: &TrackId) -> Result<()> {
        self.cursor.go_to(id)
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.cursor.reset();
    }

    // ===== Navigation =====

    /// # Errors
    /// `EmptyTrackList`
    pub fn next(&mut self) -> Result<Option<TrackId>> {
        self.cursor.advance()
    }

    /// # Errors
    /// `EmptyTrackList`
    pub fn previous(&mut self) -> Result<Option<TrackId>> {
        self.cursor.retreat()
    }

    pub fn has_next(&self) -> bool {
        self.cursor.has_next()
    }

    pub fn has_previous(&self) -> bool {
        self.cursor.has_previous()
    }

    pub fn can_go_next(&self) -> bool {
        self.cursor.can_go_next()
    }

    pub fn can_go_previous(&self) -> bool {
        self.cursor.can_go_previous()
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.cursor.loop_mode()
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.cursor.set_loop_mode(mode);
    }

    pub fn shuffle(&self) -> bool {
        self.cursor.shuffle()
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.cursor.set_shuffle(shuffle);
    }

    pub fn set_position_hint(&mut self, position: Duration) {
        self.cursor.set_position_hint(position);
    }

    // ===== Queries =====

    pub fn current(&self) -> Option<&TrackId> {
        self.cursor.current()
    }

    /// Track playback would start from, the head when there is no current track
    pub fn playable(&self) -> Option<TrackId> {
        self.cursor.playable()
    }

    /// Record that `id` was opened for playback, resolving "no current track"
    ///
    /// # Errors
    /// `TrackNotFound` if `id` is not in the list
    pub fn adopt_current(&mut self, id: &TrackId) -> Result<()> {
        self.cursor.adopt_current(id)
    }

    /// Tracks in insertion order
    pub fn tracks(&self) -> &[TrackId] {
        self.cursor.tracks()
    }

    pub fn len(&self) -> usize {
        self.cursor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.is_empty()
    }

    pub fn cursor(&self) -> &NavigationCursor {
        &self.cursor
    }

    /// # Errors
    /// `TrackNotFound` if `id` is not in the list
    pub fn query_uri_for_track(&self, id: &TrackId) -> Result<&str> {
        self.entries
            .get(id)
            .map(|entry| entry.uri.as_str())
            .ok_or_else(|| TrackListError::TrackNotFound(id.clone()))
    }

    /// # Errors
    /// `TrackNotFound` if `id` is not in the list
    pub fn query_metadata_for_track(&self, id: &TrackId) -> Result<&TrackMetadata> {
        self.entries
            .get(id)
            .map(|entry| &entry.metadata)
            .ok_or_else(|| TrackListError::TrackNotFound(id.clone()))
    }

    /// Store metadata reported by the media engine
    ///
    /// # Errors
    /// `TrackNotFound` if `id` is not in the list
    pub fn set_metadata_for_track(&mut self, id: &TrackId, metadata: TrackMetadata) -> Result<()> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| TrackListError::TrackNotFound(id.clone()))?;
        entry.metadata = metadata;
        Ok(())
    }

    // ===== Events =====

    pub fn drain_events(&mut self) -> Vec<TrackListEvent> {
        self.cursor.drain_events()
    }

    pub fn has_pending_events(&self) -> bool {
        self.cursor.has_pending_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::{AllowAll, ErrorKind};

    fn open_list() -> TrackList {
        let admission = AdmissionConfig {
            check_local_files: false,
            ..AdmissionConfig::default()
        };
        TrackList::new(&NavigationConfig::default(), admission, Arc::new(AllowAll))
    }

    fn caller() -> CallerId {
        CallerId::new("test-client")
    }

    fn uris(names: &[&str]) -> Vec<Uri> {
        names.iter().map(|n| format!("file:///music/{n}.ogg")).collect()
    }

    #[test]
    fn ids_are_allocated_sequentially() {
        let mut list = open_list();
        let a = list
            .add_track_with_uri_at(&caller(), "file:///a.ogg", &InsertPosition::End, false)
            .unwrap();
        let b = list
            .add_track_with_uri_at(&caller(), "file:///a.ogg", &InsertPosition::End, false)
            .unwrap();

        assert_eq!(a.as_str(), "/hub/track/0");
        assert_eq!(b.as_str(), "/hub/track/1");
        assert_eq!(list.query_uri_for_track(&b).unwrap(), "file:///a.ogg");
    }

    #[test]
    fn make_current_emits_change() {
        let mut list = open_list();
        let id = list
            .add_track_with_uri_at(&caller(), "https://radio/x", &InsertPosition::End, true)
            .unwrap();

        assert_eq!(list.current(), Some(&id));
        assert_eq!(
            list.drain_events(),
            vec![
                TrackListEvent::TrackAdded(id.clone()),
                TrackListEvent::TrackChanged(id.clone()),
                TrackListEvent::GoToTrack(id),
            ]
        );
    }

    #[test]
    fn batch_keeps_order_after_anchor() {
        let mut list = open_list();
        let first = list
            .add_track_with_uri_at(&caller(), "file:///first.ogg", &InsertPosition::End, false)
            .unwrap();
        list.add_track_with_uri_at(&caller(), "file:///last.ogg", &InsertPosition::End, false)
            .unwrap();
        list.drain_events();

        let added = list
            .add_tracks_with_uri_at(&caller(), &uris(&["a", "b"]), &InsertPosition::After(first.clone()))
            .unwrap();

        assert_eq!(list.tracks()[1], added[0]);
        assert_eq!(list.tracks()[2], added[1]);
        assert_eq!(list.drain_events(), vec![TrackListEvent::TracksAdded(added)]);
    }

    #[test]
    fn batch_at_head_keeps_order() {
        let mut list = open_list();
        list.add_track_with_uri_at(&caller(), "file:///old.ogg", &InsertPosition::End, false)
            .unwrap();

        let added = list
            .add_tracks_with_uri_at(&caller(), &uris(&["a", "b", "c"]), &InsertPosition::Head)
            .unwrap();
        assert_eq!(&list.tracks()[..3], added.as_slice());
    }

    #[test]
    fn batch_stops_at_first_bad_entry() {
        let mut list = open_list();
        let batch = vec![
            "file:///music/a.ogg".to_string(),
            "music/relative.ogg".to_string(),
            "file:///music/c.ogg".to_string(),
        ];

        let err = list
            .add_tracks_with_uri_at(&caller(), &batch, &InsertPosition::End)
            .unwrap_err();
        match &err {
            TrackListError::BatchRejected { index, uri, .. } => {
                assert_eq!(*index, 1);
                assert_eq!(uri, "music/relative.ogg");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::InvalidUri);
        assert_eq!(list.len(), 1);
        assert_eq!(
            list.drain_events(),
            vec![TrackListEvent::TracksAdded(list.tracks().to_vec())]
        );
    }

    #[test]
    fn unknown_anchor_changes_nothing() {
        let mut list = open_list();
        let err = list
            .add_track_with_uri_at(
                &caller(),
                "file:///a.ogg",
                &InsertPosition::After(TrackId::new("/hub/track/99")),
                false,
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(list.is_empty());
        assert!(!list.has_pending_events());
    }

    #[test]
    fn replace_is_all_or_nothing() {
        let mut list = open_list();
        list.add_tracks_with_uri_at(&caller(), &uris(&["a", "b"]), &InsertPosition::End)
            .unwrap();
        list.drain_events();

        let bad = vec!["file:///ok.ogg".to_string(), String::new()];
        assert!(list.replace_with(&caller(), &bad).is_err());
        assert_eq!(list.len(), 2);
        assert!(!list.has_pending_events());

        let current = list.replace_with(&caller(), &uris(&["x", "y", "z"])).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.current(), current.as_ref());
        let current = current.unwrap();
        assert_eq!(
            list.query_uri_for_track(&current).unwrap(),
            "file:///music/x.ogg"
        );
    }

    #[test]
    fn metadata_store() {
        let mut list = open_list();
        let id = list
            .add_track_with_uri_at(&caller(), "file:///a.ogg", &InsertPosition::End, false)
            .unwrap();

        assert_eq!(
            list.query_metadata_for_track(&id).unwrap().get(TrackMetadata::URL),
            Some("file:///a.ogg")
        );

        list.set_metadata_for_track(&id, TrackMetadata::new().with(TrackMetadata::TITLE, "A"))
            .unwrap();
        assert_eq!(list.query_metadata_for_track(&id).unwrap().title(), Some("A"));

        list.remove_track(&id).unwrap();
        assert!(list.query_metadata_for_track(&id).is_err());
        assert!(list
            .set_metadata_for_track(&id, TrackMetadata::new())
            .is_err());
    }

    #[test]
    fn ids_stay_unique_after_reset() {
        let mut list = open_list();
        let a = list
            .add_track_with_uri_at(&caller(), "file:///a.ogg", &InsertPosition::End, false)
            .unwrap();
        list.reset();
        let b = list
            .add_track_with_uri_at(&caller(), "file:///a.ogg", &InsertPosition::End, false)
            .unwrap();
        assert_ne!(a, b);
    }
}
