//! Media Hub - Sessions and Arbitration
//!
//! Owns every playback session of the process and decides which of them may
//! play.
//!
//! - `SessionRegistry`: the live sessions behind one async mutex
//! - `ArbitrationEngine`: single task applying the playback policy, fed by
//!   typed messages from device observers and the broker
//! - `MediaBroker`: per-session commands plus the client event relay
//!
//! # Architecture
//!
//! ```text
//! battery / call / route / recording observers (watch channels)
//!            │ forwarder tasks
//!            ▼
//!   ArbitrationEngine ◀── pause_other_sessions / pause_all / resume ── MediaBroker
//!            │                                                            │
//!            └──────────────▶ SessionRegistry ◀───────── client commands ─┘
//! ```

#![forbid(unsafe_code)]

mod broker;
mod engine;
mod error;
mod ledger;
mod registry;
mod session;
mod signals;

// Public exports
pub use broker::{BrokerEvent, BrokerOptions, MediaBroker};
pub use engine::{
    ArbitrationEngine, ArbitrationHandle, ArbitrationMessage, ArbitrationPolicy,
    ArbitrationSnapshot,
};
pub use error::{Result, SessionError};
pub use ledger::{LedgerEntry, PausedLedger};
pub use registry::{RegistryState, SessionRegistry};
pub use session::{Session, SessionSummary};
pub use signals::{
    AudioOutput, AudioRouteObserver, BatteryLevel, BatteryObserver, CallMonitor, CallState,
    DeviceObservers, DeviceProperties, DeviceSignal, InterruptionSource, Observable,
    RecordingObserver, RecordingState,
};
