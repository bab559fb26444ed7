//! Device signal plumbing
//!
//! Platform observers expose their state as `watch` channels. Forwarder tasks
//! turn every change into a `DeviceSignal` message for the arbitration loop,
//! so observers never touch the registry themselves.

use crate::engine::ArbitrationHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Battery level category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryLevel {
    #[default]
    Normal,
    Low,
    VeryLow,
}

impl BatteryLevel {
    /// Whether this level interrupts multimedia playback
    pub fn is_critical(self) -> bool {
        matches!(self, Self::Low | Self::VeryLow)
    }
}

/// Telephony call state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    #[default]
    OnHook,
    OffHook,
}

/// Current audio output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioOutput {
    /// Headphones or headset
    Earpiece,
    #[default]
    Speaker,
    External,
}

/// Recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    Started,
    #[default]
    Stopped,
}

/// A change reported by one of the device observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "signal", content = "value")]
pub enum DeviceSignal {
    BatteryLevel(BatteryLevel),
    /// Low battery notification shown (`true`) or dismissed (`false`)
    BatteryWarning(bool),
    Call(CallState),
    AudioRoute(AudioOutput),
    Recording(RecordingState),
}

/// What caused the arbitration engine to pause a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptionSource {
    Battery,
    Call,
    Route,
    Recording,
    /// Explicit `pause_all_multimedia_sessions` request
    Request,
}

// ===== Observer traits =====

pub trait BatteryObserver: Send + Sync {
    fn level(&self) -> watch::Receiver<BatteryLevel>;
    fn warning_active(&self) -> watch::Receiver<bool>;
}

pub trait CallMonitor: Send + Sync {
    fn call_state(&self) -> watch::Receiver<CallState>;
}

pub trait AudioRouteObserver: Send + Sync {
    fn output(&self) -> watch::Receiver<AudioOutput>;
}

pub trait RecordingObserver: Send + Sync {
    fn recording_state(&self) -> watch::Receiver<RecordingState>;
}

/// The full set of observers the arbitration engine listens to
#[derive(Clone)]
pub struct DeviceObservers {
    pub battery: Arc<dyn BatteryObserver>,
    pub call: Arc<dyn CallMonitor>,
    pub route: Arc<dyn AudioRouteObserver>,
    pub recording: Arc<dyn RecordingObserver>,
}

impl DeviceObservers {
    /// Use one `DeviceProperties` for every observer
    pub fn from_properties(properties: &Arc<DeviceProperties>) -> Self {
        Self {
            battery: properties.clone(),
            call: properties.clone(),
            route: properties.clone(),
            recording: properties.clone(),
        }
    }

    /// Spawn one forwarder task per observable property
    pub fn spawn_forwarders(&self, handle: &ArbitrationHandle) -> Vec<JoinHandle<()>> {
        vec![
            forward(self.battery.level(), handle.clone(), DeviceSignal::BatteryLevel),
            forward(
                self.battery.warning_active(),
                handle.clone(),
                DeviceSignal::BatteryWarning,
            ),
            forward(self.call.call_state(), handle.clone(), DeviceSignal::Call),
            forward(self.route.output(), handle.clone(), DeviceSignal::AudioRoute),
            forward(
                self.recording.recording_state(),
                handle.clone(),
                DeviceSignal::Recording,
            ),
        ]
    }
}

/// Forward every change of `rx` to the arbitration engine
///
/// The value current at subscription time is not forwarded. Rapid changes
/// may coalesce into the latest value.
fn forward<T, F>(mut rx: watch::Receiver<T>, handle: ArbitrationHandle, to_signal: F) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) -> DeviceSignal + Send + 'static,
{
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let value = rx.borrow_and_update().clone();
            let signal = to_signal(value);
            debug!(?signal, "Device signal");
            if handle.signal(signal).await.is_err() {
                break;
            }
        }
    })
}

// ===== In-process device state =====

/// A settable, observable value
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + PartialEq> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Update the value, notifying subscribers only if it changed
    pub fn set(&self, value: T) {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + PartialEq + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Device state held in process
///
/// Implements every observer trait; the broker binary drives it from
/// scenarios, and tests drive it directly.
#[derive(Debug, Default)]
pub struct DeviceProperties {
    pub battery_level: Observable<BatteryLevel>,
    pub battery_warning: Observable<bool>,
    pub call: Observable<CallState>,
    pub output: Observable<AudioOutput>,
    pub recording: Observable<RecordingState>,
}

impl DeviceProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a signal to the matching property
    pub fn apply(&self, signal: DeviceSignal) {
        match signal {
            DeviceSignal::BatteryLevel(level) => self.battery_level.set(level),
            DeviceSignal::BatteryWarning(active) => self.battery_warning.set(active),
            DeviceSignal::Call(state) => self.call.set(state),
            DeviceSignal::AudioRoute(output) => self.output.set(output),
            DeviceSignal::Recording(state) => self.recording.set(state),
        }
    }
}

impl BatteryObserver for DeviceProperties {
    fn level(&self) -> watch::Receiver<BatteryLevel> {
        self.battery_level.subscribe()
    }

    fn warning_active(&self) -> watch::Receiver<bool> {
        self.battery_warning.subscribe()
    }
}

impl CallMonitor for DeviceProperties {
    fn call_state(&self) -> watch::Receiver<CallState> {
        self.call.subscribe()
    }
}

impl AudioRouteObserver for DeviceProperties {
    fn output(&self) -> watch::Receiver<AudioOutput> {
        self.output.subscribe()
    }
}

impl RecordingObserver for DeviceProperties {
    fn recording_state(&self) -> watch::Receiver<RecordingState> {
        self.recording.subscribe()
    }
}
