/// Common test utilities and fixtures
use hub_core::{
    AllowAll, AudioStreamRole, CallerId, Lifetime, MediaEngine, MediaInfo, PlaybackStatus,
    SessionKey, TrackId, Volume,
};
use hub_playback::{AdmissionConfig, InsertPosition};
use hub_session::{BrokerOptions, DeviceObservers, DeviceProperties, MediaBroker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Media engine that records every call
#[derive(Debug, Default)]
pub struct FakeEngine {
    has_video: bool,
    fail_open: AtomicBool,
    calls: Mutex<Vec<String>>,
    volume: Mutex<Volume>,
    position: Mutex<Duration>,
}

#[allow(dead_code)]
impl FakeEngine {
    pub fn audio() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn video() -> Arc<Self> {
        Arc::new(Self {
            has_video: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(call)).count()
    }

    pub fn set_position(&self, position: Duration) {
        *self.position.lock().unwrap() = position;
    }

    /// Make every later `open` fail until cleared
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl MediaEngine for FakeEngine {
    fn open(&self, uri: &str) -> hub_core::Result<MediaInfo> {
        self.record(format!("open {uri}"));
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(hub_core::HubError::engine("cannot open stream"));
        }
        Ok(if self.has_video {
            MediaInfo::video()
        } else {
            MediaInfo::audio()
        })
    }

    fn play(&self) -> hub_core::Result<()> {
        self.record("play");
        Ok(())
    }

    fn pause(&self) -> hub_core::Result<()> {
        self.record("pause");
        Ok(())
    }

    fn stop(&self) -> hub_core::Result<()> {
        self.record("stop");
        Ok(())
    }

    fn seek_to(&self, position: Duration) -> hub_core::Result<()> {
        self.record(format!("seek {}", position.as_millis()));
        *self.position.lock().unwrap() = position;
        Ok(())
    }

    fn position(&self) -> Duration {
        *self.position.lock().unwrap()
    }

    fn volume(&self) -> Volume {
        *self.volume.lock().unwrap()
    }

    fn set_volume(&self, volume: Volume) -> hub_core::Result<()> {
        *self.volume.lock().unwrap() = volume;
        Ok(())
    }
}

pub fn caller() -> CallerId {
    CallerId::new(":1.42")
}

/// Broker options that accept URIs without touching the file system
pub fn options() -> BrokerOptions {
    BrokerOptions {
        admission: AdmissionConfig {
            check_local_files: false,
            ..AdmissionConfig::default()
        },
        ..BrokerOptions::default()
    }
}

/// Broker wired to in-process device properties
pub fn broker() -> (MediaBroker, Arc<DeviceProperties>) {
    let device = Arc::new(DeviceProperties::new());
    let broker = MediaBroker::start(
        options(),
        Arc::new(AllowAll),
        &DeviceObservers::from_properties(&device),
    );
    (broker, device)
}

/// Create a session holding `tracks` tracks, the first one current
#[allow(dead_code)]
pub async fn session_with_tracks(
    broker: &MediaBroker,
    role: AudioStreamRole,
    lifetime: Lifetime,
    engine: Arc<FakeEngine>,
    tracks: usize,
) -> (SessionKey, Vec<TrackId>) {
    let key = broker.create_session(role, lifetime, engine).await;
    let uris: Vec<String> = (0..tracks)
        .map(|i| format!("file:///music/{key}/{i}.ogg"))
        .collect();
    let ids = broker
        .add_tracks_with_uri_at(key, &caller(), &uris, InsertPosition::End)
        .await
        .unwrap();
    (key, ids)
}

/// Poll until `key` reaches `status`
#[allow(dead_code)]
pub async fn wait_for_status(broker: &MediaBroker, key: SessionKey, status: PlaybackStatus) {
    for _ in 0..200 {
        if broker.status(key).await.ok() == Some(status) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session {key} never reached {status}");
}
