//! Configuration for binary storage backends

use crate::binary::{local_store::LocalBinaryStore, mock_store::MockBinaryStore, BinaryStorage};
use crate::config::StorageConfig;
use crate::error::StoreError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

/// Available binary storage backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StorageBackend {
    #[default]
    LocalFs,
    Mock,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "localfs" | "local_fs" | "local" => Ok(StorageBackend::LocalFs),
            "mock" => Ok(StorageBackend::Mock),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

impl StorageBackend {
    /// Apply the `STORAGE_BACKEND` environment override, keeping `self` if unset or invalid
    pub fn with_env_override(self) -> Self {
        match env::var("STORAGE_BACKEND") {
            Ok(backend_str) => match backend_str.parse::<StorageBackend>() {
                Ok(backend) => {
                    info!("Using storage backend from environment: {:?}", backend);
                    backend
                }
                Err(e) => {
                    warn!("Invalid storage backend in environment: {}. Using {:?}.", e, self);
                    self
                }
            },
            Err(_) => self,
        }
    }
}

/// Create a binary storage instance based on the configuration
pub fn create_store(config: &StorageConfig) -> Result<Arc<dyn BinaryStorage>, StoreError> {
    match config.backend {
        StorageBackend::LocalFs => {
            info!(
                "Creating local payload storage with base_path: {}, temp_path: {}",
                config.base_path, config.temp_path
            );
            Ok(Arc::new(LocalBinaryStore::new(config)?))
        }
        StorageBackend::Mock => {
            info!("Creating mock payload storage");
            Ok(Arc::new(MockBinaryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("localfs".parse::<StorageBackend>().unwrap(), StorageBackend::LocalFs);
        assert_eq!("LOCAL".parse::<StorageBackend>().unwrap(), StorageBackend::LocalFs);
        assert_eq!("Mock".parse::<StorageBackend>().unwrap(), StorageBackend::Mock);
        assert!("s3".parse::<StorageBackend>().is_err());
    }

    #[test]
    #[serial]
    fn test_storage_backend_env_override() {
        env::set_var("STORAGE_BACKEND", "mock");
        assert_eq!(StorageBackend::LocalFs.with_env_override(), StorageBackend::Mock);

        env::set_var("STORAGE_BACKEND", "invalid");
        assert_eq!(StorageBackend::LocalFs.with_env_override(), StorageBackend::LocalFs);

        env::remove_var("STORAGE_BACKEND");
        assert_eq!(StorageBackend::Mock.with_env_override(), StorageBackend::Mock);
    }

    #[test]
    fn test_create_store_round_trips_payloads() {
        let dir = TempDir::new().unwrap();
        for backend in [StorageBackend::LocalFs, StorageBackend::Mock] {
            let config = StorageConfig {
                backend: backend.clone(),
                base_path: dir.path().join("storage").display().to_string(),
                temp_path: dir.path().join("temp").display().to_string(),
            };
            let store = create_store(&config).unwrap();
            let payload = store.put(b"portable payload").unwrap();
            assert_eq!(store.get(&payload).unwrap(), b"portable payload", "{:?}", backend);
            assert!(store.delete(&payload).unwrap());
        }
    }
}
