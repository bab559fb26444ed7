/// Track-level data carried alongside identifiers
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// URI of a playable item, as supplied by the client
pub type Uri = String;

/// Metadata reported by the media engine for a track
///
/// Keys follow the xesam naming used by MPRIS (`xesam:title`, `xesam:artist`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackMetadata(BTreeMap<String, String>);

impl TrackMetadata {
    pub const TITLE: &'static str = "xesam:title";
    pub const ARTIST: &'static str = "xesam:artist";
    pub const ALBUM: &'static str = "xesam:album";
    pub const URL: &'static str = "xesam:url";

    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get(Self::TITLE)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}
