//! Binary Storage Layer Abstraction
//!
//! This module provides an abstraction over the object store holding artefact
//! payloads, so the lifecycle manager can run against a local directory, an
//! in-memory store for tests, or a remote blob store without changes.

pub mod local_store;
pub mod mock_store;
pub mod config;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StoreError;

/// Opaque key of a payload held in the binary store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadRef(pub String);

impl PayloadRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait defining the binary storage interface
pub trait BinaryStorage: Send + Sync {
    /// Store a payload and return the reference it can be fetched by
    fn put(&self, data: &[u8]) -> Result<PayloadRef, StoreError>;

    /// Retrieve a payload; `StoreError::NotFound` if it does not exist
    fn get(&self, payload: &PayloadRef) -> Result<Vec<u8>, StoreError>;

    /// Delete a payload. Returns `false` if there was nothing to delete.
    fn delete(&self, payload: &PayloadRef) -> Result<bool, StoreError>;
}

/// Builds a fresh payload key from the content digest and a uniquifier
pub(crate) fn payload_key(data: &[u8], uniquifier: u128) -> PayloadRef {
    let mut context = md5::Context::new();
    context.consume(data);
    context.consume(uniquifier.to_le_bytes());
    PayloadRef(hex::encode(context.compute().0))
}
