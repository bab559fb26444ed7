//! Paused-session ledger
//!
//! Remembers which sessions the arbitration engine paused, in pause order,
//! and whether each may be resumed once the interruption ends.

use crate::signals::InterruptionSource;
use hub_core::SessionKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: SessionKey,
    pub source: InterruptionSource,
    pub resume_after_interruption: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PausedLedger {
    entries: Vec<LedgerEntry>,
}

impl PausedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: SessionKey, source: InterruptionSource, resume: bool) {
        self.entries.push(LedgerEntry {
            key,
            source,
            resume_after_interruption: resume,
        });
    }

    /// Take every entry, leaving the ledger empty
    pub fn drain(&mut self) -> Vec<LedgerEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Take the entries recorded for any of `sources`, in pause order
    ///
    /// Entries from other sources stay behind.
    pub fn drain_sources(&mut self, sources: &[InterruptionSource]) -> Vec<LedgerEntry> {
        let (taken, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| sources.contains(&entry.source));
        self.entries = kept;
        taken
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
