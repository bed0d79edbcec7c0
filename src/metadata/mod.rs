//! Metadata Storage Layer Abstraction
//!
//! This module provides an abstraction over the transactional store holding
//! one row per artefact, allowing the lifecycle manager to run against SQLite
//! or an in-memory store without affecting higher-level services.

pub mod model;
pub mod sqlite_store;
pub mod mock_store;
pub mod config;

use chrono::NaiveDateTime;

use crate::error::StoreError;

pub use model::{
    Artefact, ArtefactId, ArtefactSubmission, ArtefactType, Language, ListType, LocationId, NaturalKey,
    SearchIndex, Sensitivity,
};

/// Trait defining the metadata storage interface
///
/// Every lookup only returns live (non-archived) rows.
pub trait MetadataStorage: Send + Sync {
    /// Find the live artefact under a natural key
    fn find_by_natural_key(&self, key: &NaturalKey) -> Result<Option<Artefact>, StoreError>;

    /// Find a live artefact by surrogate id
    fn find_by_id(&self, id: ArtefactId) -> Result<Option<Artefact>, StoreError>;

    /// Insert a row without an id, or replace the row carrying one.
    ///
    /// An insert that collides with a live row under the same natural key
    /// fails with `StoreError::ConstraintViolation`. A replacement carries the
    /// stored `superseded_count` plus one. If the stored row was archived or
    /// replaced since it was read, the save fails with
    /// `StoreError::ConstraintViolation` so the caller can re-read. A row that
    /// was deleted outright is written back under the same id.
    fn save(&self, artefact: &Artefact) -> Result<Artefact, StoreError>;

    /// Physically delete a row; `StoreError::NotFound` if it is already gone
    fn delete(&self, artefact: &Artefact) -> Result<(), StoreError>;

    /// Mark the row archived if it is still live and holds the payload that was read.
    ///
    /// Returns `false` when the row vanished, was archived, or was superseded.
    fn archive(&self, artefact: &Artefact) -> Result<bool, StoreError>;

    /// Live artefacts whose display window ended before `now`
    fn find_expired(&self, now: NaiveDateTime) -> Result<Vec<Artefact>, StoreError>;

    /// Live artefacts stamped with a location
    fn find_by_location(&self, location: &LocationId) -> Result<Vec<Artefact>, StoreError>;

    /// Live artefacts whose search index has a value under `term` containing `value`, ignoring case
    fn search(&self, term: &str, value: &str) -> Result<Vec<Artefact>, StoreError>;
}

/// Shared matching rule for `MetadataStorage::search`
pub(crate) fn search_index_matches(artefact: &Artefact, term: &str, value: &str) -> bool {
    let needle = value.to_lowercase();
    artefact
        .search
        .get(term)
        .map_or(false, |values| values.iter().any(|v| v.to_lowercase().contains(&needle)))
}
