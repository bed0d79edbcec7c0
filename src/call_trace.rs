//! Shared call log for the mock backends, so tests can assert cross-store ordering.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct CallTrace {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    /// Snapshot of all calls recorded so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Index of the first recorded call equal to `call`.
    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls.lock().unwrap().iter().position(|c| c == call)
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}
