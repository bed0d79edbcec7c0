//! Application State Management
//!
//! This module provides the application state that contains all services
//! and their dependencies, following the dependency injection pattern.

use std::sync::Arc;
use log::info;

use crate::binary::{self, mock_store::MockBinaryStore};
use crate::collaborators::mock::RecordingDerivedFiles;
use crate::collaborators::{
    FileSystemDerivedFiles, LoggingNotifier, StaticLocationResolver, VerifiedCallerAuthorizer,
};
use crate::config::AppConfig;
use crate::error::StoreError;
use crate::metadata::{self, mock_store::MockMetadataStore};
use crate::service::{ArtefactLifecycleManager, DeletionNotifications, LifecycleDependencies};

/// Application state containing all services and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<ArtefactLifecycleManager>,
    pub config: AppConfig,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// Spawns the deletion notification dispatcher, so this must run inside
    /// a tokio runtime.
    pub fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        info!("Initializing application state with configuration");

        let dependencies = LifecycleDependencies {
            binary: binary::config::create_store(&config.storage)?,
            metadata: metadata::config::create_store(&config.metadata)?,
            locations: Arc::new(StaticLocationResolver::new(&config.locations)),
            derived_files: Arc::new(FileSystemDerivedFiles::new(&config.derived_files.directory)),
            authorizer: Arc::new(VerifiedCallerAuthorizer::new(
                &config.authorization.verified_callers,
            )),
        };
        let (notifications, _dispatcher) = DeletionNotifications::start(Arc::new(LoggingNotifier));
        let lifecycle = ArtefactLifecycleManager::new(dependencies, notifications, &config.lifecycle);

        info!(
            "Application state initialized successfully with {} known locations",
            config.locations.len()
        );
        Ok(Self {
            lifecycle: Arc::new(lifecycle),
            config,
        })
    }

    /// Create application state for testing with mock backends
    pub fn new_for_testing() -> Self {
        Self::with_mock_stores(AppConfig::default())
    }

    /// Mock stores and recording collaborators, with locations and callers from `config`
    pub fn with_mock_stores(config: AppConfig) -> Self {
        let dependencies = LifecycleDependencies {
            binary: Arc::new(MockBinaryStore::new()),
            metadata: Arc::new(MockMetadataStore::new()),
            locations: Arc::new(StaticLocationResolver::new(&config.locations)),
            derived_files: Arc::new(RecordingDerivedFiles::default()),
            authorizer: Arc::new(VerifiedCallerAuthorizer::new(
                &config.authorization.verified_callers,
            )),
        };
        let (notifications, _dispatcher) = DeletionNotifications::start(Arc::new(LoggingNotifier));
        let lifecycle = ArtefactLifecycleManager::new(dependencies, notifications, &config.lifecycle);
        Self {
            lifecycle: Arc::new(lifecycle),
            config,
        }
    }
}
