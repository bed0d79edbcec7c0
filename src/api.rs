//! HTTP surface for publishing, retrieving and removing artefacts
//!
//! Submission metadata travels in `x-*` headers and the request body is the
//! payload. Every lifecycle call blocks on store I/O and runs inside
//! `web::block`.

use actix_web::error::{ErrorInternalServerError, ErrorPayloadTooLarge};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use bytes::BytesMut;
use chrono::{NaiveDateTime, Utc};
use futures::StreamExt;
use log::{debug, info, warn};
use serde_json::json;
use std::str::FromStr;

use crate::app_state::AppState;
use crate::error::ArtefactError;
use crate::metadata::{ArtefactId, ArtefactSubmission, LocationId};
use crate::service::CallerContext;

/// Register every artefact route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/publication", web::post().to(publish))
        .route("/publication/expired", web::post().to(archive_expired))
        .route("/publication/search/{term}/{value}", web::get().to(search))
        .route("/publication/location/{location_id}", web::get().to(find_by_location))
        .route("/publication/location/{location_id}", web::delete().to(delete_by_location))
        .route("/publication/{id}/payload", web::get().to(get_payload))
        .route("/publication/{id}", web::get().to(get_artefact))
        .route("/publication/{id}", web::delete().to(delete_artefact));
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn required_header<'a>(req: &'a HttpRequest, name: &str) -> Result<&'a str, ArtefactError> {
    header(req, name).ok_or_else(|| ArtefactError::InvalidSubmission(format!("Missing {} header", name)))
}

fn parse_header<T>(req: &HttpRequest, name: &str) -> Result<T, ArtefactError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    required_header(req, name)?
        .parse::<T>()
        .map_err(|e| ArtefactError::InvalidSubmission(format!("Invalid {} header: {}", name, e)))
}

fn parse_optional_header<T>(req: &HttpRequest, name: &str) -> Result<Option<T>, ArtefactError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match header(req, name) {
        Some(_) => parse_header(req, name).map(Some),
        None => Ok(None),
    }
}

/// Build a submission from the publication headers
fn submission_headers(req: &HttpRequest) -> Result<ArtefactSubmission, ArtefactError> {
    Ok(ArtefactSubmission {
        source_artefact_id: header(req, "x-source-artefact-id").map(str::to_string),
        provenance: required_header(req, "x-provenance")?.to_string(),
        provenance_location_id: required_header(req, "x-court-id")?.to_string(),
        content_date: parse_header::<NaiveDateTime>(req, "x-content-date")?,
        language: parse_header(req, "x-language")?,
        list_type: parse_header(req, "x-list-type")?,
        artefact_type: parse_header(req, "x-type")?,
        sensitivity: parse_header(req, "x-sensitivity")?,
        display_from: parse_header::<NaiveDateTime>(req, "x-display-from")?,
        display_to: parse_optional_header::<NaiveDateTime>(req, "x-display-to")?,
        is_flat_file: parse_optional_header::<bool>(req, "x-flat-file")?.unwrap_or(false),
    })
}

/// Caller identity for retrieval; tags the request logs
fn caller_handler(req: &HttpRequest) -> CallerContext {
    let mut caller = match header(req, "x-user-id") {
        Some(user_id) => CallerContext::verified(user_id),
        None => CallerContext::anonymous(),
    };
    if header(req, "x-admin").map_or(false, |v| v.eq_ignore_ascii_case("true")) {
        caller = caller.as_admin();
    }
    log_mdc::insert("caller", caller.log_name());
    caller
}

/// Actor recorded against operator-initiated removals
fn actor_handler(req: &HttpRequest) -> Result<String, ArtefactError> {
    let actor = required_header(req, "x-issuer-id")?.to_string();
    log_mdc::insert("actor", &actor);
    Ok(actor)
}

pub async fn publish(
    req: HttpRequest,
    mut payload: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let submission = submission_headers(&req)?;
    log_mdc::insert("provenance", &submission.provenance);

    let limit = app_state.config.server.max_payload_size;
    let mut bytes = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(ErrorInternalServerError)?;
        if bytes.len() + chunk.len() > limit {
            warn!("Publication payload exceeds {} bytes", limit);
            return Err(ErrorPayloadTooLarge("Payload too large"));
        }
        bytes.extend_from_slice(&chunk);
    }
    if bytes.is_empty() {
        return Err(ArtefactError::InvalidSubmission("No payload was uploaded".to_string()).into());
    }
    debug!("Received publication payload of {} bytes", bytes.len());

    let lifecycle = app_state.lifecycle.clone();
    let published = web::block(move || lifecycle.create_or_supersede(submission, &bytes))
        .await
        .map_err(ErrorInternalServerError)??;

    Ok(HttpResponse::Created().json(json!({
        "artefactId": published.artefact.id,
        "outcome": published.outcome,
    })))
}

pub async fn get_artefact(
    path: web::Path<i64>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = ArtefactId(path.into_inner());
    let caller = caller_handler(&req);
    let lifecycle = app_state.lifecycle.clone();
    let artefact = web::block(move || lifecycle.get_artefact(id, &caller))
        .await
        .map_err(ErrorInternalServerError)??;
    Ok(HttpResponse::Ok().json(artefact))
}

pub async fn get_payload(
    path: web::Path<i64>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = ArtefactId(path.into_inner());
    let caller = caller_handler(&req);
    let lifecycle = app_state.lifecycle.clone();
    let data = web::block(move || lifecycle.get_payload(id, &caller))
        .await
        .map_err(ErrorInternalServerError)??;
    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .body(data))
}

pub async fn delete_artefact(
    path: web::Path<i64>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = ArtefactId(path.into_inner());
    let actor = actor_handler(&req)?;
    let lifecycle = app_state.lifecycle.clone();
    web::block(move || lifecycle.delete_artefact(id, &actor))
        .await
        .map_err(ErrorInternalServerError)??;
    Ok(HttpResponse::Ok().body(format!("Successfully deleted artefact: {}", id)))
}

pub async fn search(
    path: web::Path<(String, String)>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (term, value) = path.into_inner();
    let caller = caller_handler(&req);
    let lifecycle = app_state.lifecycle.clone();
    let artefacts = web::block(move || lifecycle.search(&term, &value, &caller))
        .await
        .map_err(ErrorInternalServerError)??;
    Ok(HttpResponse::Ok().json(artefacts))
}

pub async fn find_by_location(
    path: web::Path<String>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let location = LocationId::from(path.into_inner());
    let caller = caller_handler(&req);
    let lifecycle = app_state.lifecycle.clone();
    let artefacts = web::block(move || lifecycle.find_by_location(&location, &caller))
        .await
        .map_err(ErrorInternalServerError)??;
    Ok(HttpResponse::Ok().json(artefacts))
}

pub async fn delete_by_location(
    path: web::Path<String>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let location = LocationId::from(path.into_inner());
    let actor = actor_handler(&req)?;
    let lifecycle = app_state.lifecycle.clone();
    let message_location = location.clone();
    let deleted = web::block(move || lifecycle.delete_artefacts_by_location(&location, &actor))
        .await
        .map_err(ErrorInternalServerError)??;
    Ok(HttpResponse::Ok().body(format!(
        "Total {} artefacts deleted for location id {}",
        deleted.len(),
        message_location
    )))
}

pub async fn archive_expired(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let lifecycle = app_state.lifecycle.clone();
    let now = Utc::now().naive_utc();
    let archived = web::block(move || lifecycle.archive_expired(now))
        .await
        .map_err(ErrorInternalServerError)??;
    info!("Manual archival sweep archived {} artefacts", archived);
    Ok(HttpResponse::Ok().json(json!({ "archived": archived })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;
    use crate::metadata::{ArtefactType, Language, ListType, Sensitivity};

    fn publication_request() -> actix_test::TestRequest {
        actix_test::TestRequest::default()
            .insert_header(("x-provenance", "MANUAL_UPLOAD"))
            .insert_header(("x-court-id", "123"))
            .insert_header(("x-content-date", "2024-03-01T00:00:00"))
            .insert_header(("x-language", "ENGLISH"))
            .insert_header(("x-list-type", "civil_daily_cause_list"))
            .insert_header(("x-type", "LIST"))
            .insert_header(("x-sensitivity", "PUBLIC"))
            .insert_header(("x-display-from", "2024-03-01T09:00:00"))
    }

    #[test]
    fn test_submission_headers_parse() {
        let req = publication_request()
            .insert_header(("x-display-to", "2024-03-02T17:30:00.5"))
            .insert_header(("x-flat-file", "true"))
            .to_http_request();
        let submission = submission_headers(&req).unwrap();
        assert_eq!(submission.provenance, "MANUAL_UPLOAD");
        assert_eq!(submission.provenance_location_id, "123");
        assert_eq!(submission.language, Language::English);
        assert_eq!(submission.list_type, ListType::CivilDailyCauseList);
        assert_eq!(submission.artefact_type, ArtefactType::List);
        assert_eq!(submission.sensitivity, Sensitivity::Public);
        assert!(submission.display_to.is_some());
        assert!(submission.is_flat_file);
        assert_eq!(submission.source_artefact_id, None);
    }

    #[test]
    fn test_submission_headers_reject_missing_and_invalid_values() {
        let missing = actix_test::TestRequest::default()
            .insert_header(("x-provenance", "MANUAL_UPLOAD"))
            .to_http_request();
        assert!(matches!(
            submission_headers(&missing),
            Err(ArtefactError::InvalidSubmission(msg)) if msg.contains("x-court-id")
        ));

        let invalid = publication_request()
            .insert_header(("x-sensitivity", "TOP_SECRET"))
            .to_http_request();
        assert!(matches!(
            submission_headers(&invalid),
            Err(ArtefactError::InvalidSubmission(msg)) if msg.contains("x-sensitivity")
        ));
    }

    #[test]
    fn test_caller_handler() {
        let anonymous = actix_test::TestRequest::default().to_http_request();
        assert_eq!(caller_handler(&anonymous), CallerContext::anonymous());

        let admin = actix_test::TestRequest::default()
            .insert_header(("x-user-id", "ops"))
            .insert_header(("x-admin", "TRUE"))
            .to_http_request();
        assert_eq!(caller_handler(&admin), CallerContext::verified("ops").as_admin());
    }

    #[test]
    fn test_actor_handler_requires_issuer() {
        let req = actix_test::TestRequest::default().to_http_request();
        assert!(actor_handler(&req).is_err());

        let req = actix_test::TestRequest::default()
            .insert_header(("x-issuer-id", "admin@example.com"))
            .to_http_request();
        assert_eq!(actor_handler(&req).unwrap(), "admin@example.com");
    }
}
