//! Error types for the artefact stores and the lifecycle manager.
//!
//! Store implementations report [`StoreError`]; the lifecycle manager turns
//! those into [`ArtefactError`], which is what callers and the HTTP layer see.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Failures raised by the metadata store or the binary store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Write-lock contention with a concurrent writer.
    #[error("store write contention: {0}")]
    Contention(String),
    /// A uniqueness race lost against a concurrent writer.
    #[error("store constraint violation: {0}")]
    ConstraintViolation(String),
    /// The addressed row or object does not exist.
    #[error("store entry not found: {0}")]
    NotFound(String),
    /// Any other backend failure.
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Transient errors are absorbed by the save retry policy.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Contention(_) | StoreError::ConstraintViolation(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                StoreError::Contention(err.to_string())
            }
            Some(ErrorCode::ConstraintViolation) => StoreError::ConstraintViolation(err.to_string()),
            _ => match err {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(err.to_string()),
                other => StoreError::Backend(other.to_string()),
            },
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(err.to_string()),
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Failures surfaced by the artefact lifecycle manager.
#[derive(Debug, Error)]
pub enum ArtefactError {
    /// No live artefact is visible to the caller under this id or key.
    #[error("{0}")]
    NotFound(String),
    /// Save attempts were exhausted under contention; the caller may retry.
    #[error("conflict persisting artefact after {attempts} attempts, try again later: {source}")]
    Conflict {
        attempts: u32,
        #[source]
        source: StoreError,
    },
    /// Unrecoverable metadata store failure.
    #[error("metadata store failure: {0}")]
    Store(#[source] StoreError),
    /// Unrecoverable binary store failure.
    #[error("payload store failure: {0}")]
    Binary(#[source] StoreError),
    /// The submission failed validation before any state was touched.
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),
    /// An external collaborator failed.
    #[error("collaborator failure: {0}")]
    Collaborator(String),
}

impl ArtefactError {
    /// The single "not found" shape shared by absent and hidden artefacts.
    pub fn artefact_not_found(id: impl std::fmt::Display) -> Self {
        ArtefactError::NotFound(format!("No artefact found with id: {}", id))
    }
}

impl ResponseError for ArtefactError {
    fn status_code(&self) -> StatusCode {
        match self {
            ArtefactError::NotFound(_) => StatusCode::NOT_FOUND,
            ArtefactError::Conflict { .. } => StatusCode::CONFLICT,
            ArtefactError::InvalidSubmission(_) => StatusCode::BAD_REQUEST,
            ArtefactError::Store(_) | ArtefactError::Binary(_) | ArtefactError::Collaborator(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Contention("locked".into()).is_transient());
        assert!(StoreError::ConstraintViolation("unique".into()).is_transient());
        assert!(!StoreError::Backend("disk".into()).is_transient());
        assert!(!StoreError::NotFound("gone".into()).is_transient());
    }

    #[test]
    fn test_rusqlite_busy_maps_to_contention() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        );
        assert!(matches!(StoreError::from(err), StoreError::Contention(_)));
    }

    #[test]
    fn test_rusqlite_constraint_maps_to_constraint_violation() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some("UNIQUE constraint failed".to_string()),
        );
        assert!(matches!(StoreError::from(err), StoreError::ConstraintViolation(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ArtefactError::artefact_not_found(7).status_code(), StatusCode::NOT_FOUND);
        let conflict = ArtefactError::Conflict {
            attempts: 5,
            source: StoreError::Contention("busy".into()),
        };
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ArtefactError::InvalidSubmission("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ArtefactError::Store(StoreError::Backend("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
