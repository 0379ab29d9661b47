//! Append-only audit journal of committed ledger events.
//!
//! Every event published by a committed command is serialized with `bincode`
//! and stored together with `serde_json` metadata naming the caller and the
//! command that produced it. Entries are appended while the ledger's write
//! lock is held, so the journal order is the commit order.

use chrono::{DateTime, Utc};
use fairdraw_core::{EventError, Identity, LedgerEvent, SerializedEvent};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One journaled event
#[derive(Clone, Debug)]
pub struct JournalEntry {
    /// Position in the journal, starting at zero
    pub sequence: u64,
    /// When the entry was appended
    pub recorded_at: DateTime<Utc>,
    /// Encoded event with caller and command metadata
    pub event: SerializedEvent,
}

impl JournalEntry {
    /// Decodes the stored event
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the payload is corrupt.
    pub fn decode(&self) -> Result<LedgerEvent, EventError> {
        self.event.decode()
    }

    /// Caller recorded in the metadata
    #[must_use]
    pub fn caller(&self) -> Option<&str> {
        self.metadata_str("caller")
    }

    /// Command name recorded in the metadata
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.metadata_str("command")
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.event
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get(key))
            .and_then(serde_json::Value::as_str)
    }
}

/// In-memory audit journal
#[derive(Debug, Default)]
pub struct AuditJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl AuditJournal {
    /// Creates an empty journal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes and appends `event`, returning its sequence number
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be encoded.
    pub fn append(
        &self,
        event: &LedgerEvent,
        caller: &Identity,
        command: &str,
        recorded_at: DateTime<Utc>,
    ) -> Result<u64, EventError> {
        let metadata = serde_json::json!({
            "caller": caller.as_str(),
            "command": command,
            "sale": event.event_id().value(),
        });
        let event = SerializedEvent::from_event(event, Some(metadata))?;

        let mut entries = self.lock();
        let sequence = entries.len() as u64;
        tracing::trace!(sequence, event_type = %event.event_type, "journal append");
        entries.push(JournalEntry {
            sequence,
            recorded_at,
            event,
        });
        Ok(sequence)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing was journaled yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of all entries in commit order
    #[must_use]
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.lock().clone()
    }

    /// Event type identifiers in commit order
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|entry| entry.event.event_type.clone())
            .collect()
    }

    /// Decodes every entry in commit order
    ///
    /// # Errors
    ///
    /// Returns the first decoding failure.
    pub fn replay(&self) -> Result<Vec<LedgerEvent>, EventError> {
        self.lock().iter().map(JournalEntry::decode).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JournalEntry>> {
        // Entries are only pushed whole, so a poisoned journal is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
