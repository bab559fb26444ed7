/// Simulated media engine
///
/// Stands in for a real decode/render pipeline: every request succeeds
/// immediately and is logged. Streams whose file extension names a video
/// container are reported as carrying video.
use hub_core::{HubError, MediaEngine, MediaInfo, Result, TrackMetadata, Volume};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "avi", "mov", "m4v"];

#[derive(Debug)]
pub struct LoggingEngine {
    name: String,
    loaded: AtomicBool,
    position_ms: AtomicU64,
    volume_bits: AtomicU64,
}

impl LoggingEngine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loaded: AtomicBool::new(false),
            position_ms: AtomicU64::new(0),
            volume_bits: AtomicU64::new(Volume::FULL.get().to_bits()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Last path segment of a URI, without query or fragment
fn file_name(uri: &str) -> &str {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.rsplit('/').next().unwrap_or(path)
}

fn has_video(uri: &str) -> bool {
    file_name(uri)
        .rsplit_once('.')
        .is_some_and(|(_, ext)| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
}

impl MediaEngine for LoggingEngine {
    fn open(&self, uri: &str) -> Result<MediaInfo> {
        let has_video = has_video(uri);
        info!(engine = %self.name, uri, has_video, "Opening stream");

        self.loaded.store(true, Ordering::SeqCst);
        self.position_ms.store(0, Ordering::SeqCst);

        let mut metadata = TrackMetadata::new();
        if let Some((stem, _)) = file_name(uri).rsplit_once('.') {
            metadata.insert(TrackMetadata::TITLE, stem);
        }
        Ok(MediaInfo {
            has_video,
            metadata,
        })
    }

    fn play(&self) -> Result<()> {
        if !self.loaded.load(Ordering::SeqCst) {
            return Err(HubError::engine("nothing loaded"));
        }
        info!(engine = %self.name, "Play");
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        info!(engine = %self.name, "Pause");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        info!(engine = %self.name, "Stop");
        self.loaded.store(false, Ordering::SeqCst);
        self.position_ms.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn seek_to(&self, position: Duration) -> Result<()> {
        debug!(engine = %self.name, ?position, "Seek");
        self.position_ms
            .store(u64::try_from(position.as_millis()).unwrap_or(u64::MAX), Ordering::SeqCst);
        Ok(())
    }

    fn position(&self) -> Duration {
        Duration::from_millis(self.position_ms.load(Ordering::SeqCst))
    }

    fn volume(&self) -> Volume {
        Volume::new(f64::from_bits(self.volume_bits.load(Ordering::SeqCst))).unwrap_or_default()
    }

    fn set_volume(&self, volume: Volume) -> Result<()> {
        debug!(engine = %self.name, volume = volume.get(), "Volume");
        self.volume_bits
            .store(volume.get().to_bits(), Ordering::SeqCst);
        Ok(())
    }
}
