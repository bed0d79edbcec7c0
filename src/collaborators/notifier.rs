//! Third-party removal announcements written to the service log

use log::info;

use crate::collaborators::ThirdPartyNotifier;
use crate::error::ArtefactError;
use crate::metadata::Artefact;

/// Logs each removal; stands in for a channel-specific third-party publisher
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

impl ThirdPartyNotifier for LoggingNotifier {
    fn notify_deleted(&self, artefact: &Artefact) -> Result<(), ArtefactError> {
        let id = artefact
            .id
            .ok_or_else(|| ArtefactError::Collaborator("cannot announce an unsaved artefact".to_string()))?;
        info!(
            "Third-party removal: artefact {} ({} at location {}, content date {})",
            id, artefact.list_type, artefact.location_id, artefact.content_date
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::test_support::artefact;
    use crate::metadata::{ArtefactId, ListType};

    #[test]
    fn test_logging_notifier_requires_saved_artefact() {
        let mut row = artefact("1", ListType::SjpPublicList);
        assert!(LoggingNotifier.notify_deleted(&row).is_err());
        row.id = Some(ArtefactId(4));
        assert!(LoggingNotifier.notify_deleted(&row).is_ok());
    }
}
