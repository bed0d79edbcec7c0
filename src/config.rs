//! Application Configuration
//!
//! This module provides configuration management for the application,
//! supporting YAML configuration files with sensible defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use log::{info, warn};

use crate::binary::config::StorageBackend;
use crate::metadata::config::MetadataBackend;
use crate::metadata::{ListType, Sensitivity};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Payload storage configuration
    pub storage: StorageConfig,
    /// Metadata configuration
    pub metadata: MetadataConfig,
    /// Create/supersede tuning
    pub lifecycle: LifecycleConfig,
    /// Scheduled archival sweep
    pub archival: ArchivalConfig,
    /// Rendered file cleanup
    pub derived_files: DerivedFilesConfig,
    /// Static location reference data
    pub locations: Vec<LocationEntry>,
    /// Verified callers for retrieval
    pub authorization: AuthorizationConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// Maximum payload size in bytes
    pub max_payload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9710,
            workers: 4,
            max_payload_size: 2 * 1024 * 1024,
        }
    }
}

/// Payload storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend type
    pub backend: StorageBackend,
    /// Directory holding one file per payload
    pub base_path: String,
    /// Staging directory for in-flight writes
    pub temp_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::LocalFs,
            base_path: "./data/payloads".to_string(),
            temp_path: "./data/temp".to_string(),
        }
    }
}

/// Metadata backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Metadata backend type
    pub backend: MetadataBackend,
    /// Database file path
    pub db_path: String,
    /// How long a writer waits on a locked database before reporting contention
    pub busy_timeout_ms: u64,
    /// Enable WAL mode
    pub wal_mode: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::SQLite,
            db_path: "./data/artefacts.db".to_string(),
            busy_timeout_ms: 250,
            wal_mode: true,
        }
    }
}

/// Create/supersede tuning passed to the lifecycle manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Save attempts before a submission is reported as a conflict
    pub max_save_attempts: u32,
    /// Payloads larger than this are not indexed for search
    pub search_index_payload_limit: u64,
    /// Payloads larger than this had derived files generated out of band
    pub safe_render_limit: u64,
    /// Payload keys whose values are indexed
    pub search_fields: Vec<String>,
    /// Cap on indexed values kept per field
    pub max_search_values_per_field: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_save_attempts: 5,
            search_index_payload_limit: 2 * 1024 * 1024,
            safe_render_limit: 256 * 1024,
            search_fields: ["caseNumber", "caseName", "caseUrn", "partyName"]
                .iter()
                .map(|f| f.to_string())
                .collect(),
            max_search_values_per_field: 200,
        }
    }
}

/// Archival worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchivalConfig {
    /// Enable archival worker
    pub enabled: bool,
    /// Sweep interval in seconds
    pub sweep_interval_secs: u64,
}

impl Default for ArchivalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 3600,
        }
    }
}

/// Rendered file location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivedFilesConfig {
    pub directory: String,
}

impl Default for DerivedFilesConfig {
    fn default() -> Self {
        Self {
            directory: "./data/derived".to_string(),
        }
    }
}

/// One `(provenance, provenance location id) -> location id` mapping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocationEntry {
    pub provenance: String,
    pub provenance_location_id: String,
    pub location_id: String,
}

/// Callers allowed past the public tier
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthorizationConfig {
    pub verified_callers: Vec<VerifiedCaller>,
}

/// A verified caller and the tiers it may see
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifiedCaller {
    pub caller_id: String,
    /// Highest sensitivity the caller may see
    pub max_sensitivity: Sensitivity,
    /// List types a caller may see at the classified tier
    #[serde(default)]
    pub classified_list_types: Vec<ListType>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to log configuration file
    pub config_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            config_file: "server_log.yaml".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `config.yaml`, use defaults if not found
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from("config.yaml")
    }

    /// Load configuration from a YAML file, then apply environment overrides
    pub fn load_from(config_path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = config_path.as_ref();
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let config: AppConfig = serde_yaml::from_str(&content)?;
            info!("Loaded configuration from {}", config_path.display());
            config
        } else {
            warn!("Config file {} not found, using defaults", config_path.display());
            Self::default()
        };
        config.storage.backend = config.storage.backend.with_env_override();
        config.metadata.backend = config.metadata.backend.with_env_override();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.lifecycle.max_save_attempts, 5);
        assert_eq!(config.storage.backend, StorageBackend::LocalFs);
        assert_eq!(config.metadata.backend, MetadataBackend::SQLite);
        assert!(config.lifecycle.search_fields.contains(&"caseName".to_string()));
        assert!(config.locations.is_empty());
    }

    #[test]
    #[serial]
    fn test_load_partial_yaml_keeps_defaults() {
        env::remove_var("STORAGE_BACKEND");
        env::remove_var("METADATA_BACKEND");
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            r#"
server:
  port: 8080
metadata:
  backend: Mock
lifecycle:
  max_save_attempts: 3
locations:
  - provenance: MANUAL_UPLOAD
    provenance_location_id: "123"
    location_id: "1"
authorization:
  verified_callers:
    - caller_id: media-user
      max_sensitivity: CLASSIFIED
      classified_list_types: [SJP_PRESS_LIST]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.metadata.backend, MetadataBackend::Mock);
        assert_eq!(config.metadata.busy_timeout_ms, 250);
        assert_eq!(config.lifecycle.max_save_attempts, 3);
        assert_eq!(config.lifecycle.max_search_values_per_field, 200);
        assert_eq!(config.locations[0].location_id, "1");
        let caller = &config.authorization.verified_callers[0];
        assert_eq!(caller.max_sensitivity, Sensitivity::Classified);
        assert_eq!(caller.classified_list_types, vec![ListType::SjpPressList]);
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults_with_env_override() {
        env::set_var("STORAGE_BACKEND", "mock");
        let config = AppConfig::load_from("/nonexistent/config.yaml").unwrap();
        env::remove_var("STORAGE_BACKEND");
        assert_eq!(config.storage.backend, StorageBackend::Mock);
        assert_eq!(config.server.port, 9710);
    }
}
