//! Local filesystem binary storage implementation
//!
//! Each payload lives in its own file under the storage directory. Writes go
//! to the temp directory first and are renamed into place, so a reader never
//! observes a partially written payload.

use crate::binary::{payload_key, BinaryStorage, PayloadRef};
use crate::config::StorageConfig;
use crate::error::StoreError;
use log::{debug, info, warn};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Local filesystem binary storage implementation
pub struct LocalBinaryStore {
    storage_path: PathBuf,
    temp_path: PathBuf,
    sequence: AtomicU64,
}

impl LocalBinaryStore {
    /// Open the store, creating its directories if needed
    pub fn new(config: &StorageConfig) -> Result<Self, StoreError> {
        Self::open(Path::new(&config.base_path), Path::new(&config.temp_path))
    }

    pub fn open(storage_path: &Path, temp_path: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(storage_path)?;
        fs::create_dir_all(temp_path)?;
        info!(
            "Using local payload storage at {} (temp {})",
            storage_path.display(),
            temp_path.display()
        );
        Ok(Self {
            storage_path: storage_path.to_path_buf(),
            temp_path: temp_path.to_path_buf(),
            sequence: AtomicU64::new(0),
        })
    }

    fn next_uniquifier(&self) -> u128 {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) as u128;
        (nanos << 32) ^ seq
    }

    /// Resolve a reference to its file, rejecting anything that is not a plain hex key
    fn payload_path(&self, payload: &PayloadRef) -> Result<PathBuf, StoreError> {
        let key = payload.as_str();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::Backend(format!("Invalid payload reference: {}", key)));
        }
        Ok(self.storage_path.join(format!("{}.bin", key)))
    }
}

impl BinaryStorage for LocalBinaryStore {
    fn put(&self, data: &[u8]) -> Result<PayloadRef, StoreError> {
        let payload = payload_key(data, self.next_uniquifier());
        let temp_file = self.temp_path.join(format!("{}.tmp", payload));
        let target = self.payload_path(&payload)?;

        let mut file = fs::File::create(&temp_file)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&temp_file, &target) {
            let _ = fs::remove_file(&temp_file);
            return Err(e.into());
        }

        debug!("Stored payload {} ({} bytes)", payload, data.len());
        Ok(payload)
    }

    fn get(&self, payload: &PayloadRef) -> Result<Vec<u8>, StoreError> {
        let path = self.payload_path(payload)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(format!("Payload {} does not exist", payload)),
            _ => StoreError::Backend(e.to_string()),
        })
    }

    fn delete(&self, payload: &PayloadRef) -> Result<bool, StoreError> {
        let path = self.payload_path(payload)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted payload {}", payload);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Payload {} already absent, nothing to delete", payload);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
