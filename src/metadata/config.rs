//! Configuration for metadata storage backends

use crate::config::MetadataConfig;
use crate::error::StoreError;
use crate::metadata::{mock_store::MockMetadataStore, sqlite_store::SQLiteMetadataStore, MetadataStorage};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

/// Available metadata storage backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MetadataBackend {
    #[default]
    SQLite,
    Mock,
}

impl std::str::FromStr for MetadataBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(MetadataBackend::SQLite),
            "mock" => Ok(MetadataBackend::Mock),
            _ => Err(format!("Unknown metadata backend: {}", s)),
        }
    }
}

impl MetadataBackend {
    /// Apply the `METADATA_BACKEND` environment override, keeping `self` if unset or invalid
    pub fn with_env_override(self) -> Self {
        match env::var("METADATA_BACKEND") {
            Ok(backend_str) => match backend_str.parse::<MetadataBackend>() {
                Ok(backend) => {
                    info!("Using metadata backend from environment: {:?}", backend);
                    backend
                }
                Err(e) => {
                    warn!("Invalid metadata backend in environment: {}. Using {:?}.", e, self);
                    self
                }
            },
            Err(_) => self,
        }
    }
}

/// Create a metadata storage instance based on the configuration
pub fn create_store(config: &MetadataConfig) -> Result<Arc<dyn MetadataStorage>, StoreError> {
    match config.backend {
        MetadataBackend::SQLite => {
            info!(
                "Creating SQLite metadata store with db_path: {}, wal_mode: {}",
                config.db_path, config.wal_mode
            );
            Ok(Arc::new(SQLiteMetadataStore::new(config)?))
        }
        MetadataBackend::Mock => {
            info!("Creating mock metadata store");
            Ok(Arc::new(MockMetadataStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_metadata_backend_from_str() {
        assert_eq!("sqlite".parse::<MetadataBackend>().unwrap(), MetadataBackend::SQLite);
        assert_eq!("SQLite".parse::<MetadataBackend>().unwrap(), MetadataBackend::SQLite);
        assert_eq!("MOCK".parse::<MetadataBackend>().unwrap(), MetadataBackend::Mock);
        assert!("postgres".parse::<MetadataBackend>().is_err());
    }

    #[test]
    #[serial]
    fn test_metadata_backend_env_override() {
        env::set_var("METADATA_BACKEND", "mock");
        assert_eq!(MetadataBackend::SQLite.with_env_override(), MetadataBackend::Mock);

        env::set_var("METADATA_BACKEND", "invalid");
        assert_eq!(MetadataBackend::SQLite.with_env_override(), MetadataBackend::SQLite);

        env::remove_var("METADATA_BACKEND");
        assert_eq!(MetadataBackend::SQLite.with_env_override(), MetadataBackend::SQLite);
    }

    #[test]
    fn test_create_store() {
        let dir = TempDir::new().unwrap();
        for backend in [MetadataBackend::SQLite, MetadataBackend::Mock] {
            let config = MetadataConfig {
                backend: backend.clone(),
                db_path: dir.path().join("metadata.sqlite").display().to_string(),
                ..MetadataConfig::default()
            };
            let store = create_store(&config).unwrap();
            assert!(store.find_by_location(&"1".into()).unwrap().is_empty(), "{:?}", backend);
        }
    }
}
