//! In-memory record store.
//!
//! Clones share the same map, so a test can hand one clone to the engine
//! and inspect or tamper with records through another. Documents are kept
//! in encoded form so decoding is exercised the same way as on disk.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use fallow_types::{SessionClock, WorldId};
use serde_json::Value;

use crate::error::StoreError;
use crate::record::{RecordStore, decode_record, encode_record};

/// Shared in-memory record store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<BTreeMap<WorldId, Value>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw document for `world`, bypassing encoding.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock is poisoned.
    pub fn insert_raw(&self, world: WorldId, doc: Value) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(|_err| StoreError::Poisoned)?;
        records.insert(world, doc);
        Ok(())
    }

    /// The raw document stored for `world`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock is poisoned.
    pub fn raw(&self, world: WorldId) -> Result<Option<Value>, StoreError> {
        let records = self.records.lock().map_err(|_err| StoreError::Poisoned)?;
        Ok(records.get(&world).cloned())
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, world: WorldId) -> Result<Option<SessionClock>, StoreError> {
        let records = self.records.lock().map_err(|_err| StoreError::Poisoned)?;
        Ok(records.get(&world).map(decode_record))
    }

    fn save(&mut self, world: WorldId, clock: &SessionClock) -> Result<(), StoreError> {
        self.insert_raw(world, encode_record(clock))
    }
}
