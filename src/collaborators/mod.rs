//! External Collaborator Abstraction
//!
//! The lifecycle manager consumes location lookup, rendered-file cleanup,
//! third-party announcements and retrieval authorization as capabilities.
//! Each is a trait so deployments can swap the shipped adapters for real
//! services without touching the manager.

pub mod authorizer;
pub mod derived_files;
pub mod location;
pub mod mock;
pub mod notifier;

use crate::error::ArtefactError;
use crate::metadata::{Artefact, ArtefactId, Language, ListType, Sensitivity};

/// Maps a provenance-local location id to the canonical location id
pub trait LocationResolver: Send + Sync {
    fn resolve(&self, provenance: &str, provenance_location_id: &str) -> Option<String>;
}

/// Removes rendered files previously generated for an artefact
pub trait DerivedFileCoordinator: Send + Sync {
    fn remove(&self, id: ArtefactId, list_type: ListType, language: Language) -> Result<(), ArtefactError>;
}

/// Announces operator-initiated removals to third parties
pub trait ThirdPartyNotifier: Send + Sync {
    fn notify_deleted(&self, artefact: &Artefact) -> Result<(), ArtefactError>;
}

/// Decides whether a verified caller may see a non-public artefact
pub trait RetrievalAuthorizer: Send + Sync {
    fn is_authorised(&self, caller_id: &str, list_type: ListType, sensitivity: Sensitivity) -> bool;
}

pub use authorizer::VerifiedCallerAuthorizer;
pub use derived_files::FileSystemDerivedFiles;
pub use location::StaticLocationResolver;
pub use notifier::LoggingNotifier;
