//! Scan History
//!
//! In-memory, most-recent-first list of scanned files, keyed by uuid.

use crate::models::history::FileHistoryEntry;

/// Ordered history of scanned files. Uuids are unique.
#[derive(Debug, Clone, Default)]
pub struct ScanHistoryStore {
    entries: Vec<FileHistoryEntry>,
}

impl ScanHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the head, dropping any earlier entry with the same uuid.
    pub fn record(&mut self, entry: FileHistoryEntry) {
        self.entries.retain(|existing| existing.uuid != entry.uuid);
        self.entries.insert(0, entry);
    }

    /// Most recent first.
    pub fn list(&self) -> &[FileHistoryEntry] {
        &self.entries
    }

    pub fn get(&self, uuid: &str) -> Option<&FileHistoryEntry> {
        self.entries.iter().find(|entry| entry.uuid == uuid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
