//! Arbitration engine
//!
//! A single task owns the paused-session ledger and the battery `resume_key`
//! and applies the cross-session playback policy:
//! - at most one multimedia session plays at a time
//! - device interruptions pause multimedia sessions and may resume them later
//!
//! Everything reaches the engine as an `ArbitrationMessage`: device signals
//! from the forwarder tasks, requests from the broker, and deferred client
//! disconnects. Messages are handled one at a time, in arrival order.

use crate::error::{Result, SessionError};
use crate::ledger::{LedgerEntry, PausedLedger};
use crate::registry::SessionRegistry;
use crate::signals::{AudioOutput, CallState, DeviceSignal, InterruptionSource, RecordingState};
use hub_core::{Lifetime, PlaybackStatus, SessionKey};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Ledger entries released when a call ends
const CALL_SOURCES: &[InterruptionSource] =
    &[InterruptionSource::Call, InterruptionSource::Request];

/// Arbitration policy
///
/// Loaded from the `[arbitration]` section of the broker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrationPolicy {
    /// Switching to one of these outputs pauses multimedia playback (default: speaker)
    #[serde(default = "default_restricted_outputs")]
    pub restricted_outputs: Vec<AudioOutput>,

    /// Resume video sessions too when a call ends (default: false)
    #[serde(default)]
    pub resume_video_after_call: bool,

    /// Capacity of the engine's message queue (default: 64)
    #[serde(default = "default_message_buffer")]
    pub message_buffer: usize,
}

fn default_restricted_outputs() -> Vec<AudioOutput> {
    vec![AudioOutput::Speaker]
}

fn default_message_buffer() -> usize {
    64
}

impl Default for ArbitrationPolicy {
    fn default() -> Self {
        Self {
            restricted_outputs: default_restricted_outputs(),
            resume_video_after_call: false,
            message_buffer: default_message_buffer(),
        }
    }
}

/// Engine state visible from outside, for inspection and tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbitrationSnapshot {
    pub ledger: Vec<LedgerEntry>,
    pub resume_key: Option<SessionKey>,
}

/// Messages consumed by the engine loop
#[derive(Debug)]
pub enum ArbitrationMessage {
    Signal(DeviceSignal),
    PauseOtherSessions {
        key: SessionKey,
        reply: oneshot::Sender<Result<()>>,
    },
    PauseAll {
        resume_after_call: bool,
        reply: oneshot::Sender<Vec<SessionKey>>,
    },
    ResumePaused {
        resume_video: bool,
        reply: oneshot::Sender<Vec<SessionKey>>,
    },
    ClientDisconnected(SessionKey),
    Snapshot {
        reply: oneshot::Sender<ArbitrationSnapshot>,
    },
    Shutdown,
}

/// Cloneable handle used to talk to the engine
#[derive(Debug, Clone)]
pub struct ArbitrationHandle {
    tx: mpsc::Sender<ArbitrationMessage>,
}

impl ArbitrationHandle {
    async fn send(&self, message: ArbitrationMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| SessionError::EngineStopped)
    }

    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> ArbitrationMessage,
    ) -> Result<R> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| SessionError::EngineStopped)
    }

    /// Deliver a device signal
    ///
    /// # Errors
    /// `EngineStopped` if the loop has exited
    pub async fn signal(&self, signal: DeviceSignal) -> Result<()> {
        self.send(ArbitrationMessage::Signal(signal)).await
    }

    /// Make `key` the current player and pause every other playing multimedia session
    ///
    /// # Errors
    /// `SessionNotFound` for an unknown key, `EngineStopped` if the loop has exited
    pub async fn pause_other_sessions(&self, key: SessionKey) -> Result<()> {
        self.request(|reply| ArbitrationMessage::PauseOtherSessions { key, reply })
            .await?
    }

    /// Pause every playing multimedia session, recording each in the ledger
    ///
    /// Returns the keys paused.
    ///
    /// # Errors
    /// `EngineStopped` if the loop has exited
    pub async fn pause_all_multimedia_sessions(
        &self,
        resume_after_call: bool,
    ) -> Result<Vec<SessionKey>> {
        self.request(|reply| ArbitrationMessage::PauseAll {
            resume_after_call,
            reply,
        })
        .await
    }

    /// Drain the entries left by `pause_all_multimedia_sessions`, resuming eligible sessions
    ///
    /// Sessions paused by a device interruption wait for that interruption
    /// to clear.
    ///
    /// Returns the keys resumed.
    ///
    /// # Errors
    /// `EngineStopped` if the loop has exited
    pub async fn resume_paused_multimedia_sessions(
        &self,
        resume_video: bool,
    ) -> Result<Vec<SessionKey>> {
        self.request(|reply| ArbitrationMessage::ResumePaused {
            resume_video,
            reply,
        })
        .await
    }

    /// Schedule removal of a session whose client went away
    ///
    /// The removal runs in a later turn of the engine loop, never inside the
    /// caller's own context.
    ///
    /// # Errors
    /// `EngineStopped` if the loop has exited
    pub async fn client_disconnected(&self, key: SessionKey) -> Result<()> {
        self.send(ArbitrationMessage::ClientDisconnected(key)).await
    }

    /// # Errors
    /// `EngineStopped` if the loop has exited
    pub async fn snapshot(&self) -> Result<ArbitrationSnapshot> {
        self.request(|reply| ArbitrationMessage::Snapshot { reply })
            .await
    }

    /// Ask the loop to exit after the messages already queued
    ///
    /// # Errors
    /// `EngineStopped` if the loop has already exited
    pub async fn shutdown(&self) -> Result<()> {
        self.send(ArbitrationMessage::Shutdown).await
    }
}

/// The arbitration decision loop
pub struct ArbitrationEngine {
    registry: SessionRegistry,
    policy: ArbitrationPolicy,
    ledger: PausedLedger,

    /// Session resumed when the low battery warning is dismissed
    resume_key: Option<SessionKey>,

    rx: mpsc::Receiver<ArbitrationMessage>,
}

impl ArbitrationEngine {
    /// Start the engine loop on the current tokio runtime
    pub fn spawn(
        registry: SessionRegistry,
        policy: ArbitrationPolicy,
    ) -> (ArbitrationHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(policy.message_buffer.max(1));
        let engine = Self {
            registry,
            policy,
            ledger: PausedLedger::new(),
            resume_key: None,
            rx,
        };

        let task = tokio::spawn(engine.run());
        (ArbitrationHandle { tx }, task)
    }

    async fn run(mut self) {
        info!("Arbitration engine started");

        while let Some(message) = self.rx.recv().await {
            match message {
                ArbitrationMessage::Signal(signal) => self.handle_signal(signal).await,
                ArbitrationMessage::PauseOtherSessions { key, reply } => {
                    let result = self.pause_other_sessions(key).await;
                    reply.send(result).ok();
                }
                ArbitrationMessage::PauseAll {
                    resume_after_call,
                    reply,
                } => {
                    let paused = self
                        .pause_all(InterruptionSource::Request, resume_after_call)
                        .await;
                    reply.send(paused).ok();
                }
                ArbitrationMessage::ResumePaused {
                    resume_video,
                    reply,
                } => {
                    let resumed = self
                        .resume_paused(&[InterruptionSource::Request], resume_video)
                        .await;
                    reply.send(resumed).ok();
                }
                ArbitrationMessage::ClientDisconnected(key) => {
                    self.remove_disconnected(key).await;
                }
                ArbitrationMessage::Snapshot { reply } => {
                    reply
                        .send(ArbitrationSnapshot {
                            ledger: self.ledger.entries().to_vec(),
                            resume_key: self.resume_key,
                        })
                        .ok();
                }
                ArbitrationMessage::Shutdown => break,
            }
        }

        info!("Arbitration engine stopped");
    }

    async fn handle_signal(&mut self, signal: DeviceSignal) {
        debug!(?signal, "Handling device signal");

        match signal {
            DeviceSignal::BatteryLevel(level) if level.is_critical() => {
                info!(?level, "Battery low, pausing multimedia sessions");
                let paused = self.pause_all(InterruptionSource::Battery, false).await;
                self.remember_for_battery(&paused).await;
            }
            DeviceSignal::BatteryLevel(_) | DeviceSignal::BatteryWarning(true) => {}
            DeviceSignal::BatteryWarning(false) => {
                self.resume_multimedia_session().await;
                self.resume_paused(&[InterruptionSource::Battery], false).await;
            }
            DeviceSignal::Call(CallState::OffHook) => {
                info!("Call started, pausing multimedia sessions");
                self.pause_all(InterruptionSource::Call, true).await;
            }
            DeviceSignal::Call(CallState::OnHook) => {
                info!("Call ended, resuming paused multimedia sessions");
                self.resume_paused(CALL_SOURCES, self.policy.resume_video_after_call)
                    .await;
            }
            DeviceSignal::AudioRoute(output) => {
                if self.policy.restricted_outputs.contains(&output) {
                    info!(?output, "Output switched to restricted route, pausing multimedia sessions");
                    self.pause_all(InterruptionSource::Route, false).await;
                } else {
                    debug!(?output, "Output switched");
                    self.resume_paused(&[InterruptionSource::Route], false).await;
                }
            }
            DeviceSignal::Recording(RecordingState::Started) => {
                info!("Recording started, pausing multimedia sessions");
                self.pause_all(InterruptionSource::Recording, false).await;
            }
            DeviceSignal::Recording(RecordingState::Stopped) => {
                info!("Recording stopped, draining paused sessions");
                self.resume_paused(&[InterruptionSource::Recording], false)
                    .await;
            }
        }
    }

    /// Make `key` the current player and pause other playing multimedia sessions
    ///
    /// Sessions with another role are never touched, and neither is `key`.
    async fn pause_other_sessions(&mut self, key: SessionKey) -> Result<()> {
        let mut state = self.registry.lock().await;

        let role = state.get(key)?.role();
        if !role.is_multimedia() {
            debug!(session = %key, ?role, "Not a multimedia session, nothing to pause");
            return Ok(());
        }
        state.set_current_player(key);

        for other in state.sessions_mut() {
            if other.key() == key || !other.is_playing() || !other.role().is_multimedia() {
                continue;
            }
            match other.pause() {
                Ok(()) => info!(session = %other.key(), current = %key, "Paused session"),
                Err(e) => warn!(session = %other.key(), error = %e, "Failed to pause session"),
            }
        }
        Ok(())
    }

    /// Pause every playing multimedia session and record it in the ledger
    async fn pause_all(&mut self, source: InterruptionSource, resume: bool) -> Vec<SessionKey> {
        let mut state = self.registry.lock().await;
        let mut paused = Vec::new();

        for session in state.sessions_mut() {
            if !session.is_playing() || !session.role().is_multimedia() {
                continue;
            }
            match session.pause() {
                Ok(()) => {
                    info!(
                        session = %session.key(),
                        ?source,
                        resume_after_interruption = resume,
                        "Paused session"
                    );
                    self.ledger.record(session.key(), source, resume);
                    paused.push(session.key());
                }
                Err(e) => warn!(session = %session.key(), error = %e, "Failed to pause session"),
            }
        }
        paused
    }

    /// Pick the session to resume once the battery warning is dismissed
    ///
    /// The current player wins if this sweep paused it, otherwise the last
    /// session paused. A sweep that paused nothing leaves the key alone.
    async fn remember_for_battery(&mut self, paused: &[SessionKey]) {
        let current = self.registry.current_player().await;
        let chosen = current
            .filter(|key| paused.contains(key))
            .or_else(|| paused.last().copied());

        if let Some(key) = chosen {
            debug!(session = %key, "Remembering session for battery resume");
            self.resume_key = Some(key);
        }
    }

    /// Drain the ledger entries recorded for `sources`
    ///
    /// An entry is resumed if its resume flag is set and the session is audio
    /// only or `resume_video` allows video. Other entries, and entries whose
    /// session is gone, are dropped. Entries of other sources are untouched,
    /// and a session they still hold is not resumed.
    async fn resume_paused(
        &mut self,
        sources: &[InterruptionSource],
        resume_video: bool,
    ) -> Vec<SessionKey> {
        let entries = self.ledger.drain_sources(sources);
        if entries.is_empty() {
            return Vec::new();
        }
        let mut resumed = Vec::new();

        {
            let mut state = self.registry.lock().await;
            for entry in entries {
                let Ok(session) = state.get_mut(entry.key) else {
                    debug!(session = %entry.key, "Paused session is gone, skipping");
                    continue;
                };

                if self.ledger.entries().iter().any(|e| e.key == entry.key) {
                    debug!(session = %entry.key, "Session still held by another interruption");
                    continue;
                }

                let eligible = resume_video || session.is_audio_only();
                if !(entry.resume_after_interruption && eligible) {
                    debug!(session = %entry.key, "Not auto-resuming session");
                    continue;
                }

                match session.play() {
                    Ok(()) => {
                        info!(session = %entry.key, "Resumed session");
                        resumed.push(entry.key);
                    }
                    Err(e) => warn!(session = %entry.key, error = %e, "Failed to resume session"),
                }
            }
        }

        for key in &resumed {
            self.pause_other_sessions(*key).await.ok();
        }
        resumed
    }

    /// Resume the session remembered by the battery interrupt, if still paused
    ///
    /// The remembered key is consumed either way.
    async fn resume_multimedia_session(&mut self) {
        let Some(key) = self.resume_key.take() else {
            return;
        };

        let held = self
            .ledger
            .entries()
            .iter()
            .any(|e| e.key == key && e.source != InterruptionSource::Battery);
        if held {
            debug!(session = %key, "Remembered session still held by another interruption");
            return;
        }

        let resumed = {
            let mut state = self.registry.lock().await;
            match state.get_mut(key) {
                Ok(session) if session.status() == PlaybackStatus::Paused => match session.play() {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(session = %key, error = %e, "Failed to resume session");
                        false
                    }
                },
                Ok(_) => {
                    debug!(session = %key, "Remembered session is not paused, leaving it");
                    false
                }
                Err(_) => {
                    debug!(session = %key, "Remembered session is gone");
                    false
                }
            }
        };

        if resumed {
            info!(session = %key, "Resumed session after battery warning");
            self.pause_other_sessions(key).await.ok();
        }
    }

    async fn remove_disconnected(&mut self, key: SessionKey) {
        let mut state = self.registry.lock().await;

        let lifetime = match state.get(key) {
            Ok(session) => session.lifetime(),
            Err(_) => {
                debug!(session = %key, "Disconnected session already gone");
                return;
            }
        };

        if lifetime != Lifetime::Normal {
            info!(session = %key, "Client disconnected, keeping resumable session");
            return;
        }

        if let Some(mut session) = state.remove(key) {
            if session.is_playing() {
                session.stop().ok();
            }
            info!(session = %key, "Client disconnected, session removed");
        }
    }
}
