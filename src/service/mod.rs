//! Artefact lifecycle services
//!
//! The lifecycle manager and the pieces it is built from: the save retry
//! policy, search-term extraction, deletion announcements and the scheduled
//! archival worker.

pub mod archival_worker;
pub mod caller_context;
pub mod lifecycle;
pub mod notifications;
pub mod retry;
pub mod search_index;

pub use caller_context::CallerContext;
pub use lifecycle::{ArtefactLifecycleManager, LifecycleDependencies, PublishOutcome, Published};
pub use notifications::DeletionNotifications;
