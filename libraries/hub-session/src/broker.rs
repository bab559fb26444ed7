//! Media broker
//!
//! The surface exposed to transport layers. Every per-session command locks
//! the registry, runs against the session's track list or engine, lets the
//! session act on the queued directives, and relays the client-visible events
//! to subscribers. Commands that start playback then ask the arbitration
//! engine to pause competing sessions.

use crate::engine::{ArbitrationEngine, ArbitrationHandle, ArbitrationPolicy};
use crate::error::Result;
use crate::registry::SessionRegistry;
use crate::session::{Session, SessionSummary};
use crate::signals::{DeviceObservers, DeviceSignal};
use hub_core::{
    AudioStreamRole, CallerId, EngineState, Lifetime, LoopMode, MediaEngine, PlaybackStatus,
    SessionKey, TrackId, TrackMetadata, Uri, UriAuthorizer, Volume,
};
use hub_playback::{
    AdmissionConfig, InsertPosition, MoveTarget, NavigationConfig, TrackList, TrackListEvent,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const EVENT_CAPACITY: usize = 256;

/// Broker construction options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerOptions {
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub policy: ArbitrationPolicy,
}

/// A client-visible track list event, tagged with its session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerEvent {
    pub key: SessionKey,
    pub event: TrackListEvent,
}

pub struct MediaBroker {
    registry: SessionRegistry,
    arbitration: ArbitrationHandle,
    options: BrokerOptions,
    authorizer: Arc<dyn UriAuthorizer>,
    events: broadcast::Sender<BrokerEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl MediaBroker {
    /// Start the arbitration engine and one forwarder per device observer
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        options: BrokerOptions,
        authorizer: Arc<dyn UriAuthorizer>,
        observers: &DeviceObservers,
    ) -> Self {
        let registry = SessionRegistry::new();
        let (arbitration, engine_task) =
            ArbitrationEngine::spawn(registry.clone(), options.policy.clone());

        let mut tasks = vec![engine_task];
        tasks.extend(observers.spawn_forwarders(&arbitration));

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        info!("Media broker started");
        Self {
            registry,
            arbitration,
            options,
            authorizer,
            events,
            tasks,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn arbitration(&self) -> &ArbitrationHandle {
        &self.arbitration
    }

    pub fn options(&self) -> &BrokerOptions {
        &self.options
    }

    /// Subscribe to client-visible track list events of every session
    pub fn subscribe(&self) -> broadcast::Receiver<BrokerEvent> {
        self.events.subscribe()
    }

    fn publish(&self, key: SessionKey, events: Vec<TrackListEvent>) {
        for event in events {
            // No subscribers is fine
            self.events.send(BrokerEvent { key, event }).ok();
        }
    }

    /// Run `f` against one session, then act on and relay its events
    async fn with_session<R>(
        &self,
        key: SessionKey,
        f: impl FnOnce(&mut Session) -> Result<R>,
    ) -> Result<R> {
        let (result, events) = {
            let mut state = self.registry.lock().await;
            let session = match state.get_mut(key) {
                Ok(session) => session,
                Err(e) => {
                    warn!(session = %key, "Unknown session");
                    return Err(e);
                }
            };
            let result = f(session);
            (result, session.process_events())
        };

        self.publish(key, events);
        result
    }

    // ===== Session lifecycle =====

    pub async fn create_session(
        &self,
        role: AudioStreamRole,
        lifetime: Lifetime,
        engine: Arc<dyn MediaEngine>,
    ) -> SessionKey {
        let track_list = TrackList::new(
            &self.options.navigation,
            self.options.admission.clone(),
            self.authorizer.clone(),
        );
        self.registry
            .create(role, lifetime, track_list, engine)
            .await
    }

    /// The client owning `key` went away; removal happens in a later engine turn
    ///
    /// # Errors
    /// `EngineStopped` if the arbitration engine has exited
    pub async fn client_disconnected(&self, key: SessionKey) -> Result<()> {
        self.arbitration.client_disconnected(key).await
    }

    pub async fn summaries(&self) -> Vec<SessionSummary> {
        self.registry.summaries().await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn summary(&self, key: SessionKey) -> Result<SessionSummary> {
        self.with_session(key, |s| Ok(s.summary())).await
    }

    pub async fn current_player(&self) -> Option<SessionKey> {
        self.registry.current_player().await
    }

    // ===== Track list =====

    /// # Errors
    /// `SessionNotFound`, or the track list's admission error
    pub async fn add_track_with_uri_at(
        &self,
        key: SessionKey,
        caller: &CallerId,
        uri: &str,
        position: InsertPosition,
        make_current: bool,
    ) -> Result<TrackId> {
        self.with_session(key, |s| {
            Ok(s.track_list_mut()
                .add_track_with_uri_at(caller, uri, &position, make_current)?)
        })
        .await
    }

    /// # Errors
    /// `SessionNotFound`, or `BatchRejected` naming the first failing URI
    pub async fn add_tracks_with_uri_at(
        &self,
        key: SessionKey,
        caller: &CallerId,
        uris: &[Uri],
        position: InsertPosition,
    ) -> Result<Vec<TrackId>> {
        self.with_session(key, |s| {
            Ok(s.track_list_mut()
                .add_tracks_with_uri_at(caller, uris, &position)?)
        })
        .await
    }

    /// # Errors
    /// `SessionNotFound`, or `BatchRejected` (nothing changes)
    pub async fn replace_with(
        &self,
        key: SessionKey,
        caller: &CallerId,
        uris: &[Uri],
    ) -> Result<Option<TrackId>> {
        self.with_session(key, |s| Ok(s.track_list_mut().replace_with(caller, uris)?))
            .await
    }

    /// # Errors
    /// `SessionNotFound` or `TrackNotFound`
    pub async fn remove_track(&self, key: SessionKey, id: &TrackId) -> Result<()> {
        self.with_session(key, |s| Ok(s.track_list_mut().remove_track(id)?))
            .await
    }

    /// # Errors
    /// `SessionNotFound` or a `MoveError`
    pub async fn move_track(&self, key: SessionKey, id: &TrackId, to: MoveTarget) -> Result<()> {
        self.with_session(key, |s| Ok(s.track_list_mut().move_track(id, &to)?))
            .await
    }

    /// # Errors
    /// `SessionNotFound` or `TrackNotFound`
    pub async fn go_to(&self, key: SessionKey, id: &TrackId) -> Result<()> {
        self.with_session(key, |s| Ok(s.track_list_mut().go_to(id)?))
            .await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn reset(&self, key: SessionKey) -> Result<()> {
        self.with_session(key, |s| {
            s.track_list_mut().reset();
            Ok(())
        })
        .await
    }

    /// # Errors
    /// `SessionNotFound` or `EmptyTrackList`
    pub async fn next(&self, key: SessionKey) -> Result<Option<TrackId>> {
        self.with_session(key, |s| Ok(s.track_list_mut().next()?))
            .await
    }

    /// # Errors
    /// `SessionNotFound` or `EmptyTrackList`
    pub async fn previous(&self, key: SessionKey) -> Result<Option<TrackId>> {
        self.with_session(key, |s| Ok(s.track_list_mut().previous()?))
            .await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn tracks(&self, key: SessionKey) -> Result<Vec<TrackId>> {
        self.with_session(key, |s| Ok(s.track_list().tracks().to_vec()))
            .await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn current_track(&self, key: SessionKey) -> Result<Option<TrackId>> {
        self.with_session(key, |s| Ok(s.track_list().current().cloned()))
            .await
    }

    /// # Errors
    /// `SessionNotFound` or `TrackNotFound`
    pub async fn query_uri_for_track(&self, key: SessionKey, id: &TrackId) -> Result<Uri> {
        self.with_session(key, |s| {
            Ok(s.track_list().query_uri_for_track(id)?.to_string())
        })
        .await
    }

    /// # Errors
    /// `SessionNotFound` or `TrackNotFound`
    pub async fn query_metadata_for_track(
        &self,
        key: SessionKey,
        id: &TrackId,
    ) -> Result<TrackMetadata> {
        self.with_session(key, |s| {
            Ok(s.track_list().query_metadata_for_track(id)?.clone())
        })
        .await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn can_go_next(&self, key: SessionKey) -> Result<bool> {
        self.with_session(key, |s| Ok(s.track_list().can_go_next()))
            .await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn can_go_previous(&self, key: SessionKey) -> Result<bool> {
        self.with_session(key, |s| Ok(s.track_list().can_go_previous()))
            .await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn loop_mode(&self, key: SessionKey) -> Result<LoopMode> {
        self.with_session(key, |s| Ok(s.track_list().loop_mode()))
            .await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn set_loop_mode(&self, key: SessionKey, mode: LoopMode) -> Result<()> {
        self.with_session(key, |s| {
            s.track_list_mut().set_loop_mode(mode);
            Ok(())
        })
        .await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn shuffle(&self, key: SessionKey) -> Result<bool> {
        self.with_session(key, |s| Ok(s.track_list().shuffle()))
            .await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn set_shuffle(&self, key: SessionKey, shuffle: bool) -> Result<()> {
        self.with_session(key, |s| {
            s.track_list_mut().set_shuffle(shuffle);
            Ok(())
        })
        .await
    }

    // ===== Playback =====

    /// Start playback and pause competing multimedia sessions
    ///
    /// # Errors
    /// `SessionNotFound`, `EmptyTrackList`, or the engine's error
    pub async fn play(&self, key: SessionKey) -> Result<()> {
        self.with_session(key, Session::play).await?;
        self.arbitration.pause_other_sessions(key).await
    }

    /// # Errors
    /// `SessionNotFound` or the engine's error
    pub async fn pause(&self, key: SessionKey) -> Result<()> {
        self.with_session(key, Session::pause).await
    }

    /// # Errors
    /// `SessionNotFound` or the engine's error
    pub async fn stop(&self, key: SessionKey) -> Result<()> {
        self.with_session(key, Session::stop).await
    }

    /// # Errors
    /// `SessionNotFound` or the engine's error
    pub async fn seek_to(&self, key: SessionKey, position: Duration) -> Result<()> {
        self.with_session(key, |s| s.seek_to(position)).await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn position(&self, key: SessionKey) -> Result<Duration> {
        self.with_session(key, |s| Ok(s.position())).await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn volume(&self, key: SessionKey) -> Result<Volume> {
        self.with_session(key, |s| Ok(s.volume())).await
    }

    /// # Errors
    /// `SessionNotFound`, `InvalidTransition` outside `0.0..=1.0`, or the engine's error
    pub async fn set_volume(&self, key: SessionKey, volume: f64) -> Result<()> {
        self.with_session(key, |s| s.set_volume(volume)).await
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn status(&self, key: SessionKey) -> Result<PlaybackStatus> {
        self.with_session(key, |s| Ok(s.status())).await
    }

    // ===== Engine reports =====

    /// Apply a state change reported by a session's media engine
    ///
    /// # Errors
    /// `SessionNotFound`
    pub async fn report_engine_state(&self, key: SessionKey, state: EngineState) -> Result<()> {
        let started = self
            .with_session(key, |s| Ok(s.apply_engine_state(state)))
            .await?;
        if started {
            self.arbitration.pause_other_sessions(key).await?;
        }
        Ok(())
    }

    /// # Errors
    /// `SessionNotFound`
    pub async fn report_position(&self, key: SessionKey, position: Duration) -> Result<()> {
        self.with_session(key, |s| {
            s.track_list_mut().set_position_hint(position);
            Ok(())
        })
        .await
    }

    /// # Errors
    /// `SessionNotFound` or `NoCurrentTrack`
    pub async fn report_metadata(&self, key: SessionKey, metadata: TrackMetadata) -> Result<()> {
        self.with_session(key, |s| s.apply_engine_metadata(metadata))
            .await
    }

    /// The engine finished the loaded track; move on according to loop mode
    ///
    /// # Errors
    /// `SessionNotFound` or `EmptyTrackList`
    pub async fn report_end_of_stream(&self, key: SessionKey) -> Result<Option<TrackId>> {
        self.next(key).await
    }

    // ===== Arbitration =====

    /// # Errors
    /// `SessionNotFound` or `EngineStopped`
    pub async fn pause_other_sessions(&self, key: SessionKey) -> Result<()> {
        self.arbitration.pause_other_sessions(key).await
    }

    /// # Errors
    /// `EngineStopped`
    pub async fn pause_all_multimedia_sessions(
        &self,
        resume_after_call: bool,
    ) -> Result<Vec<SessionKey>> {
        self.arbitration
            .pause_all_multimedia_sessions(resume_after_call)
            .await
    }

    /// # Errors
    /// `EngineStopped`
    pub async fn resume_paused_multimedia_sessions(
        &self,
        resume_video: bool,
    ) -> Result<Vec<SessionKey>> {
        self.arbitration
            .resume_paused_multimedia_sessions(resume_video)
            .await
    }

    /// Inject a device signal directly, bypassing the observers
    ///
    /// # Errors
    /// `EngineStopped`
    pub async fn signal(&self, signal: DeviceSignal) -> Result<()> {
        self.arbitration.signal(signal).await
    }

    /// Stop the arbitration engine and the observer forwarders
    ///
    /// Messages already queued are handled first.
    ///
    /// # Errors
    /// `EngineStopped` if the engine had already exited
    pub async fn shutdown(mut self) -> Result<()> {
        let result = self.arbitration.shutdown().await;

        let mut tasks = std::mem::take(&mut self.tasks).into_iter();
        if let Some(engine) = tasks.next() {
            if engine.await.is_err() {
                warn!("Arbitration engine task panicked");
            }
        }
        for forwarder in tasks {
            forwarder.abort();
        }

        info!("Media broker stopped");
        result
    }
}

impl Drop for MediaBroker {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for MediaBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBroker")
            .field("options", &self.options)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
