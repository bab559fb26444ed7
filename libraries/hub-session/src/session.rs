//! A playback session: one track list driving one media engine

use crate::error::Result;
use hub_core::{
    AudioStreamRole, EngineState, Lifetime, MediaEngine, PlaybackStatus, SessionKey, TrackId,
    TrackMetadata, Volume,
};
use hub_playback::{TrackList, TrackListError, TrackListEvent};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One independently controllable playback context
pub struct Session {
    key: SessionKey,
    role: AudioStreamRole,
    lifetime: Lifetime,
    status: PlaybackStatus,

    /// Set from the engine's report when a track is opened
    audio_only: bool,

    /// Track currently loaded into the engine
    open_track: Option<TrackId>,

    track_list: TrackList,
    engine: Arc<dyn MediaEngine>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("role", &self.role)
            .field("lifetime", &self.lifetime)
            .field("status", &self.status)
            .field("audio_only", &self.audio_only)
            .field("open_track", &self.open_track)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub key: SessionKey,
    pub role: AudioStreamRole,
    pub lifetime: Lifetime,
    pub status: PlaybackStatus,
    pub audio_only: bool,
    pub current_track: Option<TrackId>,
    pub track_count: usize,
}

impl Session {
    pub fn new(
        key: SessionKey,
        role: AudioStreamRole,
        lifetime: Lifetime,
        track_list: TrackList,
        engine: Arc<dyn MediaEngine>,
    ) -> Self {
        Self {
            key,
            role,
            lifetime,
            status: PlaybackStatus::Stopped,
            audio_only: true,
            open_track: None,
            track_list,
            engine,
        }
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn role(&self) -> AudioStreamRole {
        self.role
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    /// Whether the loaded stream has no video
    pub fn is_audio_only(&self) -> bool {
        self.audio_only
    }

    pub fn track_list(&self) -> &TrackList {
        &self.track_list
    }

    pub fn track_list_mut(&mut self) -> &mut TrackList {
        &mut self.track_list
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            key: self.key,
            role: self.role,
            lifetime: self.lifetime,
            status: self.status,
            audio_only: self.audio_only,
            current_track: self.track_list.current().cloned(),
            track_count: self.track_list.len(),
        }
    }

    // ===== Playback control =====

    fn open(&mut self, id: &TrackId) -> Result<()> {
        let uri = self.track_list.query_uri_for_track(id)?.to_string();
        let info = self.engine.open(&uri)?;

        self.audio_only = !info.has_video;
        self.open_track = Some(id.clone());
        if !info.metadata.is_empty() {
            self.track_list.set_metadata_for_track(id, info.metadata)?;
        }
        debug!(session = %self.key, track = %id, uri = %uri, "Opened track");
        Ok(())
    }

    /// Start or resume playback, opening the current track if needed
    ///
    /// # Errors
    /// `EmptyTrackList` when there is nothing to play, or the engine's error
    pub fn play(&mut self) -> Result<()> {
        if self.open_track.is_none() {
            let id = self
                .track_list
                .playable()
                .ok_or(TrackListError::EmptyTrackList)?;
            self.open(&id)?;
            self.track_list.adopt_current(&id)?;
        }
        self.engine.play()?;
        self.status = PlaybackStatus::Playing;
        Ok(())
    }

    /// # Errors
    /// The engine's error; status is unchanged
    pub fn pause(&mut self) -> Result<()> {
        self.engine.pause()?;
        self.status = PlaybackStatus::Paused;
        Ok(())
    }

    /// # Errors
    /// The engine's error; status is unchanged
    pub fn stop(&mut self) -> Result<()> {
        self.engine.stop()?;
        self.status = PlaybackStatus::Stopped;
        self.open_track = None;
        Ok(())
    }

    /// # Errors
    /// The engine's error
    pub fn seek_to(&mut self, position: Duration) -> Result<()> {
        self.engine.seek_to(position)?;
        self.track_list.set_position_hint(position);
        Ok(())
    }

    /// Current position, also fed to the navigation cursor
    pub fn position(&mut self) -> Duration {
        let position = self.engine.position();
        self.track_list.set_position_hint(position);
        position
    }

    pub fn volume(&self) -> Volume {
        self.engine.volume()
    }

    /// # Errors
    /// `InvalidTransition` outside `0.0..=1.0`, or the engine's error
    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        let volume = Volume::new(volume)?;
        self.engine.set_volume(volume)?;
        Ok(())
    }

    /// Apply a state transition reported by the engine
    ///
    /// Returns `true` if the session just started playing.
    pub fn apply_engine_state(&mut self, state: EngineState) -> bool {
        let before = self.status;
        self.status = match state {
            EngineState::Ready => return false,
            EngineState::Playing => PlaybackStatus::Playing,
            EngineState::Paused => PlaybackStatus::Paused,
            EngineState::Stopped => PlaybackStatus::Stopped,
        };
        before != PlaybackStatus::Playing && self.status == PlaybackStatus::Playing
    }

    /// Store metadata the engine reported for the loaded track
    ///
    /// # Errors
    /// `NoCurrentTrack` if nothing is loaded
    pub fn apply_engine_metadata(&mut self, metadata: TrackMetadata) -> Result<()> {
        let id = self
            .open_track
            .clone()
            .ok_or(TrackListError::NoCurrentTrack)?;
        self.track_list.set_metadata_for_track(&id, metadata)?;
        Ok(())
    }

    // ===== Track list events =====

    /// Drain track list events, acting on player directives
    ///
    /// Returns the client-visible events in emission order.
    pub fn process_events(&mut self) -> Vec<TrackListEvent> {
        let events = self.track_list.drain_events();
        let mut visible = Vec::with_capacity(events.len());

        for event in events {
            match &event {
                TrackListEvent::GoToTrack(id) => self.go_to_track(id),
                TrackListEvent::EndOfTrackList => self.end_of_track_list(),
                TrackListEvent::TrackListReset => self.unload(),
                _ => {}
            }
            if event.is_client_visible() {
                visible.push(event);
            }
        }
        visible
    }

    fn go_to_track(&mut self, id: &TrackId) {
        if let Err(e) = self.open(id) {
            warn!(session = %self.key, track = %id, error = %e, "Failed to open track");
            // The previous stream no longer matches the cursor
            self.open_track = None;
            return;
        }
        if self.is_playing() {
            if let Err(e) = self.engine.play() {
                warn!(session = %self.key, error = %e, "Failed to play track");
            }
        }
    }

    fn end_of_track_list(&mut self) {
        debug!(session = %self.key, "End of track list, stopping");
        if let Err(e) = self.stop() {
            warn!(session = %self.key, error = %e, "Failed to stop engine");
        }
    }

    fn unload(&mut self) {
        if self.open_track.is_some() || self.status != PlaybackStatus::Stopped {
            self.end_of_track_list();
        }
    }
}
