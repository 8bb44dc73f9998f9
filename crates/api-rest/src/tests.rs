use crate::{router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use companion_core::testing::{Harness, DEFAULT_CARE_REQUEST};
use companion_core::{CompanionLink, TaskType};
use companion_core::sources::TaskStore;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "companion-boundary";

fn app(harness: &Harness, api_key: Option<&str>) -> Router {
    router(AppState::new(harness.consents.clone(), api_key))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn multipart(link: &CompanionLink, fields: &[(&str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        if *name == "signatureImage" {
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"signature.png\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
        } else {
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
        }
        body.extend_from_slice(value);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(format!("/companion/{}/consents/captures", link.id))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn put_status(link: &CompanionLink, task_id: u64, status: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("PUT")
        .uri(format!("/companion/{}/tasks/{task_id}/status", link.id))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder
        .body(Body::from(json!({ "status": status }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let harness = Harness::new();
    let (status, body) = send(app(&harness, None), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn definitions_require_numeric_signer() {
    let harness = Harness::with_required_scenario();
    let link = harness.link().await;

    for uri in [
        format!("/companion/{}/consents/definitions", link.id),
        format!("/companion/{}/consents/definitions?signerId=patient", link.id),
    ] {
        let (status, _) = send(app(&harness, None), get(&uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn definitions_for_unknown_link_are_not_found() {
    let harness = Harness::new();
    let (status, _) = send(
        app(&harness, None),
        get("/companion/00000000-0000-0000-0000-000000000000/consents/definitions?signerId=1"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app(&harness, None),
        get("/companion/not-a-link/consents/definitions?signerId=1"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn incomplete_definitions_drop_captured_ones() {
    let harness = Harness::with_required_scenario();
    harness
        .caravan
        .insert_capture(companion_core::testing::capture(1, 10));
    let link = harness.link().await;

    let (status, body) = send(
        app(&harness, None),
        get(&format!(
            "/companion/{}/consents/definitions?signerId=1&incomplete=true",
            link.id
        )),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![11, 12]);
    assert_eq!(body[0]["categoryId"], 2);
    assert!(body[0]["serviceLineIds"].is_null());
}

#[tokio::test]
async fn missing_service_line_is_a_bad_request() {
    let harness = Harness::with_required_scenario();
    harness
        .dashboard
        .insert_care_request(companion_core::testing::care_request(
            DEFAULT_CARE_REQUEST.get(),
            None,
        ));
    let link = harness.link().await;

    let (status, _) = send(
        app(&harness, None),
        get(&format!(
            "/companion/{}/consents/definitions?signerId=1",
            link.id
        )),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn options_are_ordered_by_category_order() {
    let harness = Harness::with_required_scenario();
    let link = harness.link().await;

    let (status, body) = send(
        app(&harness, None),
        get(&format!("/companion/{}/consents/options", link.id)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(body["categories"][0]["required"], true);
}

#[tokio::test]
async fn options_for_unknown_link_are_not_found() {
    let harness = Harness::with_required_scenario();
    let (status, _) = send(
        app(&harness, None),
        get("/companion/00000000-0000-0000-0000-000000000000/consents/options"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(harness.caravan.options_calls(), 0);
}

#[tokio::test]
async fn create_capture_returns_created_and_tracks_definition() {
    let harness = Harness::with_required_scenario();
    let link = harness.link().await;

    let (status, body) = send(
        app(&harness, None),
        multipart(
            &link,
            &[
                ("definitionId", b"11"),
                ("signer", b"1"),
                ("signatureImage", b"png-bytes"),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["definitionId"], 11);
    assert_eq!(body["episodeId"], DEFAULT_CARE_REQUEST.get());
    assert_eq!(harness.store.metadata_writes(), 1);
}

#[tokio::test]
async fn create_capture_without_signature_is_a_bad_request() {
    let harness = Harness::with_required_scenario();
    let link = harness.link().await;

    let (status, _) = send(
        app(&harness, None),
        multipart(&link, &[("definitionId", b"11"), ("signer", b"1")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.caravan.created_captures(), 0);
}

#[tokio::test]
async fn consent_status_reports_unknown_types_as_internal_errors() {
    let harness = Harness::new();
    harness
        .dashboard
        .set_medication_history_consent(companion_core::testing::DEFAULT_PATIENT, false);
    let link = harness.link().await;

    let (status, body) = send(
        app(&harness, None),
        get(&format!(
            "/companion/{}/consents/status/MEDICATION_HISTORY_AUTHORITY",
            link.id
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], false);

    let (status, _) = send(
        app(&harness, None),
        get(&format!("/companion/{}/consents/status/FAKE", link.id)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn task_status_requires_configured_api_key() {
    let harness = Harness::with_required_scenario();
    let link = harness.link().await;
    let task = harness
        .store
        .find_task(&link.id, TaskType::Consents)
        .await
        .unwrap()
        .unwrap();

    let (status, _) = send(
        app(&harness, Some("secret")),
        put_status(&link, task.id.get(), "STARTED", None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        app(&harness, Some("secret")),
        put_status(&link, task.id.get(), "STARTED", Some("secret")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "STARTED");
    assert_eq!(body["type"], "CONSENTS");
}

#[tokio::test]
async fn completing_consents_task_applies_signed_consents() {
    let harness = Harness::with_required_scenario();
    let link = harness.link().await;
    for definition in [b"10".as_slice(), b"11".as_slice()] {
        let (status, _) = send(
            app(&harness, None),
            multipart(
                &link,
                &[
                    ("definitionId", definition),
                    ("signer", b"1"),
                    ("signatureImage", b"png-bytes"),
                ],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let task = harness
        .store
        .find_task(&link.id, TaskType::Consents)
        .await
        .unwrap()
        .unwrap();

    let (status, _) = send(
        app(&harness, None),
        put_status(&link, task.id.get(), "COMPLETED", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        harness.dashboard.applied_care_requests(),
        vec![DEFAULT_CARE_REQUEST]
    );
}

#[tokio::test]
async fn unknown_task_status_and_task_are_rejected() {
    let harness = Harness::new();
    let link = harness.link().await;
    let task = harness
        .store
        .find_task(&link.id, TaskType::DefaultPharmacy)
        .await
        .unwrap()
        .unwrap();

    let (status, _) = send(
        app(&harness, None),
        put_status(&link, task.id.get(), "DONE", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app(&harness, None),
        put_status(&link, 9_999, "STARTED", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
