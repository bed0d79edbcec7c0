use actix_web::{http::StatusCode, test, web, App};
use serde_json::Value;

use court_artefacts::api;
use court_artefacts::app_state::AppState;
use court_artefacts::config::{AppConfig, LocationEntry, VerifiedCaller};
use court_artefacts::metadata::{ListType, Sensitivity};

const PAYLOAD: &[u8] = br#"{"courtLists": [{"cases": [{"caseName": "Smith v Jones", "caseNumber": "CN-42"}]}]}"#;

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.locations = vec![LocationEntry {
        provenance: "MANUAL_UPLOAD".to_string(),
        provenance_location_id: "123".to_string(),
        location_id: "1".to_string(),
    }];
    config.authorization.verified_callers = vec![VerifiedCaller {
        caller_id: "media".to_string(),
        max_sensitivity: Sensitivity::Classified,
        classified_list_types: vec![ListType::SjpPressList],
    }];
    config
}

fn publication(list_type: &str, sensitivity: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/publication")
        .insert_header(("x-provenance", "MANUAL_UPLOAD"))
        .insert_header(("x-court-id", "123"))
        .insert_header(("x-content-date", "2024-03-01T00:00:00"))
        .insert_header(("x-language", "ENGLISH"))
        .insert_header(("x-list-type", list_type))
        .insert_header(("x-type", "LIST"))
        .insert_header(("x-sensitivity", sensitivity))
        .insert_header(("x-display-from", "2024-03-01T00:00:00"))
        .insert_header(("x-display-to", "2099-12-31T23:59:59"))
        .set_payload(PAYLOAD)
}

macro_rules! app {
    () => {{
        let _ = env_logger::builder().is_test(true).try_init();
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::with_mock_stores(test_config())))
                .configure(api::configure),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_publish_then_supersede() {
    let app = app!();

    let resp = test::call_service(&app, publication("CIVIL_DAILY_CAUSE_LIST", "PUBLIC").to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["outcome"], "CREATED");

    let resp = test::call_service(&app, publication("CIVIL_DAILY_CAUSE_LIST", "PUBLIC").to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let superseded: Value = test::read_body_json(resp).await;
    assert_eq!(superseded["outcome"], "SUPERSEDED");
    assert_eq!(superseded["artefactId"], created["artefactId"]);

    let id = created["artefactId"].as_i64().unwrap();
    let req = test::TestRequest::get().uri(&format!("/publication/{}", id)).to_request();
    let artefact: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(artefact["supersededCount"], 1);
    assert_eq!(artefact["locationId"], "1");
    assert_eq!(artefact["search"]["caseName"][0], "Smith v Jones");

    let req = test::TestRequest::get()
        .uri(&format!("/publication/{}/payload", id))
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(&body[..], PAYLOAD);
}

#[actix_web::test]
async fn test_publish_rejects_bad_headers_and_empty_payload() {
    let app = app!();

    let req = publication("NOT_A_LIST", "PUBLIC").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = publication("CIVIL_DAILY_CAUSE_LIST", "PUBLIC")
        .set_payload(Vec::<u8>::new())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = publication("CIVIL_DAILY_CAUSE_LIST", "PUBLIC")
        .insert_header(("x-display-to", "2024-02-01T00:00:00"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_classified_artefact_is_indistinguishable_from_missing() {
    let app = app!();

    let req = publication("SJP_PRESS_LIST", "CLASSIFIED").to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["artefactId"].as_i64().unwrap();

    let hidden = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/publication/{}", id)).to_request(),
    )
    .await;
    let missing = test::call_service(
        &app,
        test::TestRequest::get().uri("/publication/424242").to_request(),
    )
    .await;
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let hidden: Value = test::read_body_json(hidden).await;
    let missing: Value = test::read_body_json(missing).await;
    assert_eq!(hidden["error"], format!("No artefact found with id: {}", id));
    assert_eq!(missing["error"], "No artefact found with id: 424242");

    let req = test::TestRequest::get()
        .uri(&format!("/publication/{}", id))
        .insert_header(("x-user-id", "media"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_search_and_location_listing_filter_by_caller() {
    let app = app!();
    test::call_service(&app, publication("CIVIL_DAILY_CAUSE_LIST", "PUBLIC").to_request()).await;
    test::call_service(&app, publication("CROWN_DAILY_LIST", "PRIVATE").to_request()).await;

    let req = test::TestRequest::get()
        .uri("/publication/search/caseName/smith")
        .to_request();
    let anonymous: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(anonymous.len(), 1);

    let req = test::TestRequest::get()
        .uri("/publication/search/caseNumber/cn-42")
        .insert_header(("x-user-id", "media"))
        .to_request();
    let media: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(media.len(), 2);

    let req = test::TestRequest::get()
        .uri("/publication/location/1")
        .insert_header(("x-user-id", "media"))
        .to_request();
    let listed: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.len(), 2);
}

#[actix_web::test]
async fn test_delete_requires_issuer_and_is_not_repeatable() {
    let app = app!();
    let req = publication("CIVIL_DAILY_CAUSE_LIST", "PUBLIC").to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["artefactId"].as_i64().unwrap();
    let uri = format!("/publication/{}", id);

    let resp = test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let delete = || {
        test::TestRequest::delete()
            .uri(&uri)
            .insert_header(("x-issuer-id", "admin@example.com"))
            .to_request()
    };
    let resp = test::call_service(&app, delete()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = test::call_service(&app, delete()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_delete_by_location_and_expired_sweep() {
    let app = app!();
    test::call_service(&app, publication("CIVIL_DAILY_CAUSE_LIST", "PUBLIC").to_request()).await;
    let expiring = publication("CROWN_DAILY_LIST", "PUBLIC")
        .insert_header(("x-court-id", "999"))
        .insert_header(("x-display-to", "2024-03-02T00:00:00"))
        .to_request();
    test::call_service(&app, expiring).await;

    let req = test::TestRequest::post().uri("/publication/expired").to_request();
    let swept: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(swept["archived"], 1);

    let req = test::TestRequest::delete()
        .uri("/publication/location/1")
        .insert_header(("x-issuer-id", "admin@example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri("/publication/location/1")
        .insert_header(("x-issuer-id", "admin@example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
