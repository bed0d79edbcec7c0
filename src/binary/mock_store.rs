//! Mock binary storage implementation for testing

use crate::binary::{payload_key, BinaryStorage, PayloadRef};
use crate::call_trace::CallTrace;
use crate::error::StoreError;
use log::info;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A mock binary storage implementation that stores payloads in memory
/// Useful for testing without disk I/O operations
pub struct MockBinaryStore {
    storage: Arc<Mutex<HashMap<PayloadRef, Vec<u8>>>>,
    sequence: AtomicU64,
    fail_puts: Mutex<Option<StoreError>>,
    fail_deletes: Mutex<Option<StoreError>>,
    trace: CallTrace,
}

impl MockBinaryStore {
    pub fn new() -> Self {
        Self::with_trace(CallTrace::new())
    }

    /// Create a store that records `binary.put:<ref>` / `binary.delete:<ref>` into `trace`
    pub fn with_trace(trace: CallTrace) -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
            sequence: AtomicU64::new(0),
            fail_puts: Mutex::new(None),
            fail_deletes: Mutex::new(None),
            trace,
        }
    }

    /// Make every subsequent `put` fail with `error`
    pub fn fail_puts_with(&self, error: StoreError) {
        *self.fail_puts.lock().unwrap() = Some(error);
    }

    /// Make every subsequent `delete` fail with `error`
    pub fn fail_deletes_with(&self, error: StoreError) {
        *self.fail_deletes.lock().unwrap() = Some(error);
    }

    pub fn clear_failures(&self) {
        *self.fail_puts.lock().unwrap() = None;
        *self.fail_deletes.lock().unwrap() = None;
    }

    pub fn contains(&self, payload: &PayloadRef) -> bool {
        self.storage.lock().unwrap().contains_key(payload)
    }

    pub fn object_count(&self) -> usize {
        self.storage.lock().unwrap().len()
    }

    /// Clear all stored data (useful for testing)
    pub fn clear(&self) {
        self.storage.lock().unwrap().clear();
    }
}

impl Default for MockBinaryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryStorage for MockBinaryStore {
    fn put(&self, data: &[u8]) -> Result<PayloadRef, StoreError> {
        if let Some(error) = self.fail_puts.lock().unwrap().clone() {
            self.trace.record("binary.put:failed");
            return Err(error);
        }
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let payload = payload_key(data, seq as u128);
        self.storage.lock().unwrap().insert(payload.clone(), data.to_vec());
        self.trace.record(format!("binary.put:{}", payload));
        info!("Mock: Stored payload {} with size {}", payload, data.len());
        Ok(payload)
    }

    fn get(&self, payload: &PayloadRef) -> Result<Vec<u8>, StoreError> {
        self.storage
            .lock()
            .unwrap()
            .get(payload)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Payload {} does not exist", payload)))
    }

    fn delete(&self, payload: &PayloadRef) -> Result<bool, StoreError> {
        self.trace.record(format!("binary.delete:{}", payload));
        if let Some(error) = self.fail_deletes.lock().unwrap().clone() {
            return Err(error);
        }
        let existed = self.storage.lock().unwrap().remove(payload).is_some();
        info!("Mock: Deleted payload {} (existed: {})", payload, existed);
        Ok(existed)
    }
}
