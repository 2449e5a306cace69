use std::sync::Arc;

use crate::types::HISTORY_STORAGE_KEY;
use crate::{Notification, PersistenceFailure, StorageAdapter};

/// Newest-first, capacity-bounded notification history, snapshotted to
/// storage after every change.
pub struct HistoryStore {
    storage: Arc<dyn StorageAdapter>,
    entries: Vec<Notification>,
    capacity: usize,
}

impl HistoryStore {
    /// Restore from the last snapshot. A missing or unreadable snapshot gives
    /// an empty history.
    pub fn load(storage: Arc<dyn StorageAdapter>, capacity: usize) -> Self {
        let mut entries = match storage.get(HISTORY_STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<Notification>>(&json) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding corrupt notification history");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read notification history");
                Vec::new()
            }
        };
        entries.truncate(capacity);

        Self {
            storage,
            entries,
            capacity,
        }
    }

    /// Prepend a notification unless one with the same id is already stored.
    ///
    /// Returns `Ok(true)` when inserted. On a persistence error the entry is
    /// still kept in memory and the error is returned for logging.
    pub fn insert(&mut self, notification: Notification) -> Result<bool, PersistenceFailure> {
        if self.contains(&notification.id) {
            return Ok(false);
        }

        self.entries.insert(0, notification);
        self.entries.truncate(self.capacity);
        self.persist()?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), PersistenceFailure> {
        self.entries.clear();
        self.storage
            .del(HISTORY_STORAGE_KEY)
            .map_err(|e| PersistenceFailure(e.to_string()))
    }

    pub fn all(&self) -> &[Notification] {
        &self.entries
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<(), PersistenceFailure> {
        let json =
            serde_json::to_string(&self.entries).map_err(|e| PersistenceFailure(e.to_string()))?;
        self.storage
            .put(HISTORY_STORAGE_KEY, json)
            .map_err(|e| PersistenceFailure(e.to_string()))
    }
}
