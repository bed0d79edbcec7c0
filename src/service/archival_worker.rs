//! Background archival worker
//!
//! Runs the expired-artefact sweep on a fixed interval. The sweep itself
//! blocks on store I/O, so each run is moved onto a blocking thread.

use crate::config::ArchivalConfig;
use crate::error::ArtefactError;
use crate::service::lifecycle::ArtefactLifecycleManager;
use chrono::Utc;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

/// Background archival worker
pub struct ArchivalWorker {
    manager: Arc<ArtefactLifecycleManager>,
    sweep_interval: Duration,
}

impl ArchivalWorker {
    pub fn new(manager: Arc<ArtefactLifecycleManager>, config: &ArchivalConfig) -> Self {
        Self {
            manager,
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }

    /// Start the archival worker as a background task (non-blocking)
    pub fn start_background(self) -> tokio::task::JoinHandle<()> {
        info!("Starting archival worker with {}s interval", self.sweep_interval.as_secs());

        tokio::spawn(async move {
            let mut interval = time::interval(self.sweep_interval);

            loop {
                interval.tick().await;

                if let Err(e) = self.run_sweep().await {
                    error!("Error running archival sweep: {}", e);
                }
            }
        })
    }

    /// Run one sweep against the current time
    pub async fn run_sweep(&self) -> Result<usize, ArtefactError> {
        let manager = self.manager.clone();
        let now = Utc::now().naive_utc();
        tokio::task::spawn_blocking(move || manager.archive_expired(now))
            .await
            .map_err(|e| ArtefactError::Collaborator(format!("archival sweep task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::mock_store::MockBinaryStore;
    use crate::collaborators::mock::{RecordingDerivedFiles, RecordingNotifier};
    use crate::collaborators::{StaticLocationResolver, VerifiedCallerAuthorizer};
    use crate::config::LifecycleConfig;
    use crate::metadata::mock_store::MockMetadataStore;
    use crate::metadata::test_support::at;
    use crate::metadata::{ArtefactSubmission, ArtefactType, Language, ListType, Sensitivity};
    use crate::service::lifecycle::LifecycleDependencies;
    use crate::service::notifications::DeletionNotifications;

    #[tokio::test]
    async fn test_archival_worker_creation() {
        let config = ArchivalConfig {
            enabled: true,
            sweep_interval_secs: 0,
        };
        let (manager, metadata) = manager();
        let worker = ArchivalWorker::new(manager, &config);
        assert_eq!(worker.sweep_interval.as_secs(), 1);
        assert_eq!(metadata.live_count(), 0);
    }

    #[tokio::test]
    async fn test_run_sweep_archives_expired_artefacts() {
        let (manager, metadata) = manager();
        manager
            .create_or_supersede(
                ArtefactSubmission {
                    source_artefact_id: None,
                    provenance: "MANUAL_UPLOAD".to_string(),
                    provenance_location_id: "123".to_string(),
                    content_date: at(1, 0),
                    language: Language::English,
                    list_type: ListType::CivilDailyCauseList,
                    artefact_type: ArtefactType::List,
                    sensitivity: Sensitivity::Public,
                    display_from: at(1, 0),
                    display_to: Some(at(2, 0)),
                    is_flat_file: false,
                },
                b"expired long ago",
            )
            .unwrap();

        let worker = ArchivalWorker::new(manager, &ArchivalConfig::default());
        assert_eq!(worker.run_sweep().await.unwrap(), 1);
        assert_eq!(metadata.live_count(), 0);
        assert_eq!(metadata.all_rows().len(), 1);
    }

    fn manager() -> (Arc<ArtefactLifecycleManager>, Arc<MockMetadataStore>) {
        let metadata = Arc::new(MockMetadataStore::new());
        let (notifications, _dispatcher) = DeletionNotifications::start(Arc::new(RecordingNotifier::default()));
        let manager = ArtefactLifecycleManager::new(
            LifecycleDependencies {
                binary: Arc::new(MockBinaryStore::new()),
                metadata: metadata.clone(),
                locations: Arc::new(StaticLocationResolver::default()),
                derived_files: Arc::new(RecordingDerivedFiles::default()),
                authorizer: Arc::new(VerifiedCallerAuthorizer::default()),
            },
            notifications,
            &LifecycleConfig::default(),
        );
        (Arc::new(manager), metadata)
    }
}
