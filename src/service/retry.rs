//! Bounded retry of metadata writes under transient store errors

use log::{debug, warn};

use crate::error::{ArtefactError, StoreError};

/// Re-runs an operation while it fails with a transient [`StoreError`].
///
/// Attempts follow each other immediately. A non-transient error stops the
/// loop and surfaces as `ArtefactError::Store`; running out of attempts
/// surfaces as `ArtefactError::Conflict`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op`, passing the 1-based attempt number
    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T, ArtefactError>
    where
        F: FnMut(u32) -> Result<T, StoreError>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        "{} attempt {}/{} hit a transient error: {}",
                        label, attempt, self.max_attempts, e
                    );
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    warn!("{} gave up after {} attempts: {}", label, attempt, e);
                    return Err(ArtefactError::Conflict {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => return Err(ArtefactError::Store(e)),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5)
    }
}
