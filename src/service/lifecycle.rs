//! Artefact lifecycle manager
//!
//! Coordinates the binary store and the metadata store, which fail
//! independently and share no transaction:
//!
//! - create-or-supersede writes the payload first, then the row (with retry),
//!   and deletes the new payload again if the row never lands;
//! - delete and archive clean up the payload and rendered files before the
//!   row goes, so a half-finished removal can be re-run against the row;
//! - retrieval filters by sensitivity and display window, and reports hidden
//!   artefacts exactly like missing ones.
//!
//! Every method blocks on store I/O. Async callers should run them on a
//! blocking thread.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::binary::{BinaryStorage, PayloadRef};
use crate::collaborators::{DerivedFileCoordinator, LocationResolver, RetrievalAuthorizer};
use crate::config::LifecycleConfig;
use crate::error::{ArtefactError, StoreError};
use crate::metadata::{
    Artefact, ArtefactId, ArtefactSubmission, LocationId, MetadataStorage, Sensitivity,
};
use crate::service::caller_context::CallerContext;
use crate::service::notifications::DeletionNotifications;
use crate::service::retry::RetryPolicy;
use crate::service::search_index::SearchIndexer;

/// Whether a submission started a new natural-key lineage or replaced the live artefact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishOutcome {
    Created,
    Superseded,
}

/// Result of a successful create-or-supersede
#[derive(Debug, Clone)]
pub struct Published {
    pub artefact: Artefact,
    pub outcome: PublishOutcome,
}

/// The stores and collaborators the manager sequences calls across
#[derive(Clone)]
pub struct LifecycleDependencies {
    pub binary: Arc<dyn BinaryStorage>,
    pub metadata: Arc<dyn MetadataStorage>,
    pub locations: Arc<dyn LocationResolver>,
    pub derived_files: Arc<dyn DerivedFileCoordinator>,
    pub authorizer: Arc<dyn RetrievalAuthorizer>,
}

fn system_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub struct ArtefactLifecycleManager {
    binary: Arc<dyn BinaryStorage>,
    metadata: Arc<dyn MetadataStorage>,
    locations: Arc<dyn LocationResolver>,
    derived_files: Arc<dyn DerivedFileCoordinator>,
    authorizer: Arc<dyn RetrievalAuthorizer>,
    notifications: DeletionNotifications,
    retry: RetryPolicy,
    indexer: SearchIndexer,
    safe_render_limit: u64,
    clock: fn() -> NaiveDateTime,
}

impl ArtefactLifecycleManager {
    pub fn new(
        dependencies: LifecycleDependencies,
        notifications: DeletionNotifications,
        config: &LifecycleConfig,
    ) -> Self {
        Self {
            binary: dependencies.binary,
            metadata: dependencies.metadata,
            locations: dependencies.locations,
            derived_files: dependencies.derived_files,
            authorizer: dependencies.authorizer,
            notifications,
            retry: RetryPolicy::new(config.max_save_attempts),
            indexer: SearchIndexer::from_config(config),
            safe_render_limit: config.safe_render_limit,
            clock: system_now,
        }
    }

    /// Replace the wall clock used for `last_received` and display windows
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Persist a submission, superseding the live artefact under the same natural key.
    ///
    /// On failure the payload written for this call is removed again, so
    /// neither store is left holding half an artefact.
    pub fn create_or_supersede(
        &self,
        submission: ArtefactSubmission,
        payload: &[u8],
    ) -> Result<Published, ArtefactError> {
        let submission = submission.normalise().map_err(ArtefactError::InvalidSubmission)?;
        let location_id = self.resolve_location(&submission);

        let payload_ref = self.binary.put(payload).map_err(ArtefactError::Binary)?;
        debug!("Stored payload {} ({} bytes)", payload_ref, payload.len());

        let draft = Artefact {
            id: None,
            source_artefact_id: submission.source_artefact_id,
            provenance: submission.provenance,
            location_id,
            content_date: submission.content_date,
            language: submission.language,
            list_type: submission.list_type,
            artefact_type: submission.artefact_type,
            sensitivity: submission.sensitivity,
            display_from: submission.display_from,
            display_to: submission.display_to,
            last_received: (self.clock)(),
            payload: payload_ref.clone(),
            payload_size: payload.len() as u64,
            search: self.indexer.derive(payload, submission.is_flat_file),
            superseded_count: 0,
            is_flat_file: submission.is_flat_file,
            archived: false,
        };
        let key = draft.natural_key();

        let saved = self.retry.run("Artefact save", |_| {
            let previous = self.metadata.find_by_natural_key(&key)?;
            let mut row = draft.clone();
            if let Some(previous) = &previous {
                row.id = previous.id;
                row.superseded_count = previous.superseded_count + 1;
            }
            let saved = self.metadata.save(&row)?;
            Ok((saved, previous))
        });

        match saved {
            Ok((artefact, None)) => {
                info!(
                    "Created artefact {:?} for {} at location {}",
                    artefact.id, artefact.list_type, artefact.location_id
                );
                Ok(Published {
                    artefact,
                    outcome: PublishOutcome::Created,
                })
            }
            Ok((artefact, Some(previous))) => {
                info!(
                    "Artefact {:?} superseded ({} times) for {} at location {}",
                    artefact.id, artefact.superseded_count, artefact.list_type, artefact.location_id
                );
                self.clean_up_superseded(&previous);
                Ok(Published {
                    artefact,
                    outcome: PublishOutcome::Superseded,
                })
            }
            Err(e) => {
                error!("Failed to persist artefact metadata, rolling back payload {}: {}", payload_ref, e);
                self.roll_back_payload(&payload_ref);
                Err(e)
            }
        }
    }

    fn resolve_location(&self, submission: &ArtefactSubmission) -> LocationId {
        match self
            .locations
            .resolve(&submission.provenance, &submission.provenance_location_id)
        {
            Some(location) => LocationId::Resolved(location),
            None => {
                warn!(
                    "No location match for {} location {}, stamping unresolved",
                    submission.provenance, submission.provenance_location_id
                );
                LocationId::Unresolved {
                    provenance_id: submission.provenance_location_id.clone(),
                }
            }
        }
    }

    fn roll_back_payload(&self, payload: &PayloadRef) {
        if let Err(e) = self.binary.delete(payload) {
            error!("Failed to roll back payload {}: {}", payload, e);
        }
    }

    /// Best-effort removal of what the replaced row pointed at
    fn clean_up_superseded(&self, previous: &Artefact) {
        match self.binary.delete(&previous.payload) {
            Ok(true) => debug!("Deleted superseded payload {}", previous.payload),
            Ok(false) => debug!("Superseded payload {} was already gone", previous.payload),
            Err(e) => warn!("Failed to delete superseded payload {}: {}", previous.payload, e),
        }
        if previous.payload_size > self.safe_render_limit {
            if let Some(id) = previous.id {
                if let Err(e) = self.derived_files.remove(id, previous.list_type, previous.language) {
                    warn!("Failed to remove derived files for superseded artefact {}: {}", id, e);
                }
            }
        }
    }

    /// Delete one artefact and announce the removal.
    ///
    /// A second call for the same id reports not found.
    pub fn delete_artefact(&self, id: ArtefactId, actor: &str) -> Result<Artefact, ArtefactError> {
        let artefact = self
            .metadata
            .find_by_id(id)
            .map_err(ArtefactError::Store)?
            .ok_or_else(|| ArtefactError::artefact_not_found(id))?;
        self.delete_found(artefact, actor)
    }

    /// Delete several artefacts. Nothing is deleted unless every id exists.
    pub fn delete_artefacts(&self, ids: &[ArtefactId], actor: &str) -> Result<Vec<Artefact>, ArtefactError> {
        let mut found = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.metadata.find_by_id(id).map_err(ArtefactError::Store)? {
                Some(artefact) => found.push(artefact),
                None => return Err(ArtefactError::artefact_not_found(id)),
            }
        }
        found
            .into_iter()
            .map(|artefact| self.delete_found(artefact, actor))
            .collect()
    }

    /// Delete every live artefact stamped with a location
    pub fn delete_artefacts_by_location(
        &self,
        location: &LocationId,
        actor: &str,
    ) -> Result<Vec<Artefact>, ArtefactError> {
        let artefacts = self
            .metadata
            .find_by_location(location)
            .map_err(ArtefactError::Store)?;
        if artefacts.is_empty() {
            return Err(ArtefactError::NotFound(format!(
                "No artefacts found with location id: {}",
                location
            )));
        }
        info!(
            "Deleting {} artefacts at location {} for {}",
            artefacts.len(),
            location,
            actor
        );
        artefacts
            .into_iter()
            .map(|artefact| self.delete_found(artefact, actor))
            .collect()
    }

    fn delete_found(&self, artefact: Artefact, actor: &str) -> Result<Artefact, ArtefactError> {
        let id = artefact
            .id
            .ok_or_else(|| ArtefactError::Store(StoreError::Backend("stored artefact has no id".to_string())))?;
        self.remove_payload_and_derived(&artefact, id)?;
        self.metadata.delete(&artefact).map_err(|e| match e {
            StoreError::NotFound(_) => ArtefactError::artefact_not_found(id),
            other => ArtefactError::Store(other),
        })?;
        info!("Artefact {} deleted by {}", id, actor);
        self.notifications.dispatch(artefact.clone());
        Ok(artefact)
    }

    /// Payload then rendered files; only the payload delete can fail the removal
    fn remove_payload_and_derived(&self, artefact: &Artefact, id: ArtefactId) -> Result<(), ArtefactError> {
        let existed = self.binary.delete(&artefact.payload).map_err(ArtefactError::Binary)?;
        if !existed {
            debug!("Payload {} for artefact {} was already gone", artefact.payload, id);
        }
        if artefact.has_derived_files() {
            if let Err(e) = self.derived_files.remove(id, artefact.list_type, artefact.language) {
                warn!("Failed to remove derived files for artefact {}: {}", id, e);
            }
        }
        Ok(())
    }

    /// Archive every live artefact whose display window closed before `now`.
    ///
    /// Returns how many were archived. Rows that vanish or are superseded by a
    /// fresh submission mid-sweep are skipped. No third party is notified.
    pub fn archive_expired(&self, now: NaiveDateTime) -> Result<usize, ArtefactError> {
        let expired = self.metadata.find_expired(now).map_err(ArtefactError::Store)?;
        if expired.is_empty() {
            return Ok(0);
        }
        info!("Archival sweep found {} expired artefacts", expired.len());

        let mut archived = 0;
        for id in expired.iter().filter_map(|a| a.id) {
            match self.archive_one(id, now) {
                Ok(true) => archived += 1,
                Ok(false) => debug!("Artefact {} already handled before archival", id),
                Err(e) => error!("Failed to archive artefact {}: {}", id, e),
            }
        }
        info!("Archived {} artefacts", archived);
        Ok(archived)
    }

    fn archive_one(&self, id: ArtefactId, now: NaiveDateTime) -> Result<bool, ArtefactError> {
        let artefact = match self.metadata.find_by_id(id).map_err(ArtefactError::Store)? {
            Some(artefact) => artefact,
            None => return Ok(false),
        };
        if artefact.display_to.map_or(true, |to| to >= now) {
            return Ok(false);
        }
        self.remove_payload_and_derived(&artefact, id)?;
        // only the version read above is archived; a supersede landing meanwhile stays live
        let archived = self.metadata.archive(&artefact).map_err(ArtefactError::Store)?;
        if archived {
            info!("Artefact {} archived", id);
        }
        Ok(archived)
    }

    /// Fetch one artefact the caller may see
    pub fn get_artefact(&self, id: ArtefactId, caller: &CallerContext) -> Result<Artefact, ArtefactError> {
        let now = (self.clock)();
        self.metadata
            .find_by_id(id)
            .map_err(ArtefactError::Store)?
            .filter(|artefact| self.is_visible(artefact, caller, now))
            .ok_or_else(|| ArtefactError::artefact_not_found(id))
    }

    /// Fetch the payload of an artefact the caller may see
    pub fn get_payload(&self, id: ArtefactId, caller: &CallerContext) -> Result<Vec<u8>, ArtefactError> {
        let artefact = self.get_artefact(id, caller)?;
        self.binary.get(&artefact.payload).map_err(ArtefactError::Binary)
    }

    /// Live artefacts at a location that the caller may see
    pub fn find_by_location(
        &self,
        location: &LocationId,
        caller: &CallerContext,
    ) -> Result<Vec<Artefact>, ArtefactError> {
        let candidates = self
            .metadata
            .find_by_location(location)
            .map_err(ArtefactError::Store)?;
        Ok(self.visible(candidates, caller))
    }

    /// Live artefacts whose index has a value under `term` containing `value`
    pub fn search(&self, term: &str, value: &str, caller: &CallerContext) -> Result<Vec<Artefact>, ArtefactError> {
        let candidates = self.metadata.search(term, value).map_err(ArtefactError::Store)?;
        Ok(self.visible(candidates, caller))
    }

    fn visible(&self, candidates: Vec<Artefact>, caller: &CallerContext) -> Vec<Artefact> {
        let now = (self.clock)();
        let total = candidates.len();
        let visible: Vec<Artefact> = candidates
            .into_iter()
            .filter(|artefact| self.is_visible(artefact, caller, now))
            .collect();
        debug!(
            "{} of {} candidate artefacts visible to {}",
            visible.len(),
            total,
            caller.log_name()
        );
        visible
    }

    fn is_visible(&self, artefact: &Artefact, caller: &CallerContext, now: NaiveDateTime) -> bool {
        if !caller.is_admin && !artefact.is_displayable_at(now) {
            return false;
        }
        self.is_authorised(artefact, caller)
    }

    /// Public artefacts are open to everyone; anything else needs a verified caller
    pub fn is_authorised(&self, artefact: &Artefact, caller: &CallerContext) -> bool {
        if artefact.sensitivity == Sensitivity::Public {
            return true;
        }
        match caller.caller_id.as_deref() {
            Some(caller_id) => {
                self.authorizer
                    .is_authorised(caller_id, artefact.list_type, artefact.sensitivity)
            }
            None => false,
        }
    }
}
