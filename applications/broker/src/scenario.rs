//! Scenario replay
//!
//! A scenario is a TOML file listing client commands and device signals.
//! Sessions are referred to by name; the runner maps names to keys as
//! sessions are created.
//!
//! ```toml
//! name = "call interrupts music"
//!
//! [[step]]
//! action = "create_session"
//! session = "music"
//!
//! [[step]]
//! action = "add_tracks"
//! session = "music"
//! uris = ["file:///music/a.ogg", "file:///music/b.ogg"]
//!
//! [[step]]
//! action = "play"
//! session = "music"
//!
//! [[step]]
//! action = "signal"
//! call = "off_hook"
//! ```

use crate::error::{BrokerError, Result};
use crate::state::AppState;
use hub_core::{AudioStreamRole, CallerId, Lifetime, LoopMode, SessionKey};
use hub_playback::{InsertPosition, MoveTarget};
use hub_session::{
    AudioOutput, BatteryLevel, CallState, DeviceSignal, RecordingState, SessionSummary,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const SCENARIO_CALLER: &str = "scenario";

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    CreateSession {
        session: String,
        #[serde(default)]
        role: AudioStreamRole,
        #[serde(default)]
        lifetime: Lifetime,
    },
    AddTracks {
        session: String,
        uris: Vec<String>,
    },
    /// Replace the whole list, making the first URI current
    OpenUris {
        session: String,
        uris: Vec<String>,
    },
    /// Track positions are zero-based indexes into the list order
    GoTo {
        session: String,
        index: usize,
    },
    RemoveTrack {
        session: String,
        index: usize,
    },
    MoveTrack {
        session: String,
        index: usize,
        /// `None` moves to the head
        #[serde(default)]
        after: Option<usize>,
    },
    Play {
        session: String,
    },
    Pause {
        session: String,
    },
    Stop {
        session: String,
    },
    Next {
        session: String,
    },
    Previous {
        session: String,
    },
    Seek {
        session: String,
        position_ms: u64,
    },
    SetLoopMode {
        session: String,
        mode: LoopMode,
    },
    SetShuffle {
        session: String,
        shuffle: bool,
    },
    EndOfStream {
        session: String,
    },
    Signal {
        battery: Option<BatteryLevel>,
        battery_warning: Option<bool>,
        call: Option<CallState>,
        output: Option<AudioOutput>,
        recording: Option<RecordingState>,
    },
    PauseAll {
        #[serde(default)]
        resume_after_call: bool,
    },
    ResumePaused {
        #[serde(default)]
        resume_video: bool,
    },
    Disconnect {
        session: String,
    },
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Self::CreateSession { .. } => "create_session",
            Self::AddTracks { .. } => "add_tracks",
            Self::OpenUris { .. } => "open_uris",
            Self::GoTo { .. } => "go_to",
            Self::RemoveTrack { .. } => "remove_track",
            Self::MoveTrack { .. } => "move_track",
            Self::Play { .. } => "play",
            Self::Pause { .. } => "pause",
            Self::Stop { .. } => "stop",
            Self::Next { .. } => "next",
            Self::Previous { .. } => "previous",
            Self::Seek { .. } => "seek",
            Self::SetLoopMode { .. } => "set_loop_mode",
            Self::SetShuffle { .. } => "set_shuffle",
            Self::EndOfStream { .. } => "end_of_stream",
            Self::Signal { .. } => "signal",
            Self::PauseAll { .. } => "pause_all",
            Self::ResumePaused { .. } => "resume_paused",
            Self::Disconnect { .. } => "disconnect",
        }
    }
}

impl Scenario {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub name: String,
    /// `None` once the session has been removed
    pub summary: Option<SessionSummary>,
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: Option<String>,
    pub steps: Vec<StepOutcome>,
    pub sessions: Vec<SessionReport>,
    pub current_player: Option<String>,
}

impl ScenarioReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.error.is_some())
    }

    pub fn session(&self, name: &str) -> Option<&SessionReport> {
        self.sessions.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Scenario: {}",
            self.name.as_deref().unwrap_or("(unnamed)")
        )?;
        writeln!(
            f,
            "  {} steps, {} failed",
            self.steps.len(),
            self.failures().count()
        )?;
        for failure in self.failures() {
            writeln!(
                f,
                "  step {} ({}): {}",
                failure.index + 1,
                failure.action,
                failure.error.as_deref().unwrap_or_default()
            )?;
        }

        writeln!(f, "Sessions:")?;
        for session in &self.sessions {
            match &session.summary {
                Some(s) => writeln!(
                    f,
                    "  {:<12} key={} {:?} {} track={} ({} tracks)",
                    session.name,
                    s.key,
                    s.role,
                    s.status,
                    s.current_track
                        .as_ref()
                        .map_or_else(|| "-".to_string(), ToString::to_string),
                    s.track_count
                )?,
                None => writeln!(f, "  {:<12} removed", session.name)?,
            }
        }

        write!(
            f,
            "Current player: {}",
            self.current_player.as_deref().unwrap_or("-")
        )
    }
}

/// Replays one scenario against a running broker
pub struct ScenarioRunner<'a> {
    state: &'a AppState,
    caller: CallerId,
    sessions: BTreeMap<String, SessionKey>,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            caller: CallerId::new(SCENARIO_CALLER),
            sessions: BTreeMap::new(),
        }
    }

    /// Run every step in order
    ///
    /// Broker errors are recorded against their step and replay continues.
    /// A step naming an unknown session aborts the replay.
    pub async fn run(mut self, scenario: &Scenario) -> Result<ScenarioReport> {
        info!(name = ?scenario.name, steps = scenario.steps.len(), "Replaying scenario");
        let mut outcomes = Vec::with_capacity(scenario.steps.len());

        for (index, step) in scenario.steps.iter().enumerate() {
            let error = match self.execute(step).await {
                Ok(()) => None,
                Err(BrokerError::Session(e)) => {
                    warn!(step = index + 1, action = step.action(), error = %e, "Step failed");
                    Some(e.to_string())
                }
                Err(e) => return Err(e),
            };
            outcomes.push(StepOutcome {
                index,
                action: step.action(),
                error,
            });
        }

        // Deferred disconnects run in a later engine turn
        self.state.broker.arbitration().snapshot().await?;

        self.report(scenario, outcomes).await
    }

    fn key(&self, name: &str) -> Result<SessionKey> {
        self.sessions
            .get(name)
            .copied()
            .ok_or_else(|| BrokerError::Scenario(format!("unknown session '{name}'")))
    }

    async fn track_at(&self, key: SessionKey, index: usize) -> Result<hub_core::TrackId> {
        let tracks = self.state.broker.tracks(key).await?;
        tracks
            .get(index)
            .cloned()
            .ok_or_else(|| BrokerError::Scenario(format!("no track at index {index}")))
    }

    async fn execute(&mut self, step: &Step) -> Result<()> {
        let state = self.state;
        let broker = &state.broker;

        match step {
            Step::CreateSession {
                session,
                role,
                lifetime,
            } => {
                if self.sessions.contains_key(session) {
                    return Err(BrokerError::Scenario(format!(
                        "session '{session}' already exists"
                    )));
                }
                let key = state.create_session(session, *role, *lifetime).await;
                self.sessions.insert(session.clone(), key);
            }
            Step::AddTracks { session, uris } => {
                let key = self.key(session)?;
                broker
                    .add_tracks_with_uri_at(key, &self.caller, uris, InsertPosition::End)
                    .await?;
            }
            Step::OpenUris { session, uris } => {
                let key = self.key(session)?;
                broker.replace_with(key, &self.caller, uris).await?;
            }
            Step::GoTo { session, index } => {
                let key = self.key(session)?;
                let id = self.track_at(key, *index).await?;
                broker.go_to(key, &id).await?;
            }
            Step::RemoveTrack { session, index } => {
                let key = self.key(session)?;
                let id = self.track_at(key, *index).await?;
                broker.remove_track(key, &id).await?;
            }
            Step::MoveTrack {
                session,
                index,
                after,
            } => {
                let key = self.key(session)?;
                let id = self.track_at(key, *index).await?;
                let to = match after {
                    Some(after) => MoveTarget::After(self.track_at(key, *after).await?),
                    None => MoveTarget::Head,
                };
                broker.move_track(key, &id, to).await?;
            }
            Step::Play { session } => broker.play(self.key(session)?).await?,
            Step::Pause { session } => broker.pause(self.key(session)?).await?,
            Step::Stop { session } => broker.stop(self.key(session)?).await?,
            Step::Next { session } => {
                broker.next(self.key(session)?).await?;
            }
            Step::Previous { session } => {
                broker.previous(self.key(session)?).await?;
            }
            Step::Seek {
                session,
                position_ms,
            } => {
                broker
                    .seek_to(self.key(session)?, Duration::from_millis(*position_ms))
                    .await?;
            }
            Step::SetLoopMode { session, mode } => {
                broker.set_loop_mode(self.key(session)?, *mode).await?;
            }
            Step::SetShuffle { session, shuffle } => {
                broker.set_shuffle(self.key(session)?, *shuffle).await?;
            }
            Step::EndOfStream { session } => {
                broker.report_end_of_stream(self.key(session)?).await?;
            }
            Step::Signal {
                battery,
                battery_warning,
                call,
                output,
                recording,
            } => {
                let signals = battery
                    .map(DeviceSignal::BatteryLevel)
                    .into_iter()
                    .chain(battery_warning.map(DeviceSignal::BatteryWarning))
                    .chain(call.map(DeviceSignal::Call))
                    .chain(output.map(DeviceSignal::AudioRoute))
                    .chain(recording.map(DeviceSignal::Recording));
                for signal in signals {
                    broker.signal(signal).await?;
                }
            }
            Step::PauseAll { resume_after_call } => {
                broker
                    .pause_all_multimedia_sessions(*resume_after_call)
                    .await?;
            }
            Step::ResumePaused { resume_video } => {
                broker
                    .resume_paused_multimedia_sessions(*resume_video)
                    .await?;
            }
            Step::Disconnect { session } => {
                broker.client_disconnected(self.key(session)?).await?;
            }
        }
        Ok(())
    }

    async fn report(&self, scenario: &Scenario, steps: Vec<StepOutcome>) -> Result<ScenarioReport> {
        let broker = &self.state.broker;
        let summaries = broker.summaries().await;
        let current = broker.current_player().await;

        let sessions = self
            .sessions
            .iter()
            .map(|(name, key)| SessionReport {
                name: name.clone(),
                summary: summaries.iter().find(|s| s.key == *key).cloned(),
            })
            .collect();

        let current_player = current.and_then(|key| {
            self.sessions
                .iter()
                .find(|(_, k)| **k == key)
                .map(|(name, _)| name.clone())
        });

        Ok(ScenarioReport {
            name: scenario.name.clone(),
            steps,
            sessions,
            current_player,
        })
    }
}
