//! Integration tests for the relboard HTTP API.
//!
//! Uses axum-test to exercise the router without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, header};
use axum_test::TestServer;
use mockable::DefaultClock;
use relboard::api::{ApiResponse, AppState, HealthResponse, create_router};
use relboard::config::ServerConfig;
use relboard_core::{
    Dashboard, Hashrelease, MemoryStore, ProjectId, RELEASES, RecordStore, RedbStore, Release,
    ReleaseService, Repository, StepStatus,
};
use serde_json::{Value, json};
use std::sync::Arc;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn seeded_service() -> ReleaseService<DefaultClock> {
    let service = ReleaseService::new(Arc::new(MemoryStore::new()), Arc::new(DefaultClock), 5);
    service.ensure_seeded().unwrap();
    service
}

fn test_server_with(server: &ServerConfig) -> TestServer {
    let router = create_router(AppState::new(seeded_service()), server);
    TestServer::new(router).unwrap()
}

fn test_server() -> TestServer {
    test_server_with(&ServerConfig::default())
}

fn data<T: serde::de::DeserializeOwned>(response: &axum_test::TestResponse) -> T {
    let envelope: ApiResponse<T> = response.json();
    assert!(envelope.success, "expected success envelope");
    assert!(envelope.error.is_none());
    envelope.data.expect("data present on success")
}

fn error_message(response: &axum_test::TestResponse) -> String {
    let envelope: ApiResponse<Value> = response.json();
    assert!(!envelope.success, "expected failure envelope");
    assert!(envelope.data.is_none());
    envelope.error.expect("error present on failure")
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// LIST ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_list_releases() {
    let server = test_server();

    let response = server.get("/api/releases").await;

    response.assert_status_ok();
    let releases: Vec<Release> = data(&response);
    assert_eq!(releases.len(), 4);
}

#[tokio::test]
async fn test_list_releases_filtered_by_project() {
    let server = test_server();

    let response = server.get("/api/releases?projectId=enterprise").await;

    response.assert_status_ok();
    let releases: Vec<Release> = data(&response);
    assert_eq!(releases.len(), 2);
    assert!(
        releases
            .iter()
            .all(|r| r.project_id == ProjectId::Enterprise)
    );
}

#[tokio::test]
async fn test_list_hashreleases_filtered_by_project() {
    let server = test_server();

    let response = server.get("/api/hashreleases?projectId=oss").await;

    response.assert_status_ok();
    let hashreleases: Vec<Hashrelease> = data(&response);
    assert_eq!(hashreleases.len(), 4);
    assert!(hashreleases.iter().all(|h| h.project_id == ProjectId::Oss));
}

#[tokio::test]
async fn test_list_rejects_unknown_project() {
    let server = test_server();

    let response = server.get("/api/releases?projectId=beta").await;

    assert_eq!(response.status_code().as_u16(), 400);
    assert!(error_message(&response).contains("beta"));
}

#[tokio::test]
async fn test_empty_project_filter_means_all() {
    let server = test_server();

    let response = server.get("/api/hashreleases?projectId=").await;

    response.assert_status_ok();
    let hashreleases: Vec<Hashrelease> = data(&response);
    assert_eq!(hashreleases.len(), 8);
}

// =============================================================================
// GET-ONE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_get_release() {
    let server = test_server();

    let response = server.get("/api/releases/v2.5.0").await;

    response.assert_status_ok();
    let release: Release = data(&response);
    assert_eq!(release.id, "v2.5.0");
    assert_eq!(release.lifecycle.len(), 6);
}

#[tokio::test]
async fn test_get_release_json_shape() {
    let server = test_server();

    let response = server.get("/api/releases/v3.1.0").await;
    let body: Value = response.json();

    assert_eq!(body["success"], json!(true));
    assert!(body.get("error").is_none());
    let release = &body["data"];
    assert_eq!(release["projectId"], json!("enterprise"));
    assert_eq!(release["releaseManager"], json!("Alice"));
    assert_eq!(release["completedAt"], Value::Null);
    assert_eq!(release["lifecycle"][0]["name"], json!("Started"));
    assert_eq!(release["lifecycle"][1]["status"], json!("in-progress"));
}

#[tokio::test]
async fn test_get_missing_release() {
    let server = test_server();

    let response = server.get("/api/releases/v9.9.9").await;

    assert_eq!(response.status_code().as_u16(), 404);
    assert!(error_message(&response).contains("v9.9.9"));
}

#[tokio::test]
async fn test_get_hashrelease_by_id() {
    let server = test_server();

    let listed: Vec<Hashrelease> = data(&server.get("/api/hashreleases").await);
    let first = &listed[0];

    let response = server.get(&format!("/api/hashreleases/{}", first.id)).await;

    response.assert_status_ok();
    let fetched: Hashrelease = data(&response);
    assert_eq!(&fetched, first);

    let missing = server.get("/api/hashreleases/0000000").await;
    assert_eq!(missing.status_code().as_u16(), 404);
}

// =============================================================================
// STEP UPDATE TESTS
// =============================================================================

#[tokio::test]
async fn test_update_step_marks_done() {
    let server = test_server();

    let response = server
        .patch("/api/releases/v2.5.0/step")
        .json(&json!({ "stepName": "Images Published", "status": "done" }))
        .await;

    response.assert_status_ok();
    let release: Release = data(&response);
    let step = release.step("Images Published").unwrap();
    assert_eq!(step.status, StepStatus::Done);
    assert!(step.started_at.is_some());
    assert!(step.completed_at.is_some());

    // Persisted, not just echoed.
    let stored: Release = data(&server.get("/api/releases/v2.5.0").await);
    assert_eq!(stored, release);
}

#[tokio::test]
async fn test_update_step_error_keeps_timestamps() {
    let server = test_server();

    let before: Release = data(&server.get("/api/releases/v3.1.0").await);
    let response = server
        .patch("/api/releases/v3.1.0/step")
        .json(&json!({ "stepName": "Images Published", "status": "error" }))
        .await;

    response.assert_status_ok();
    let after: Release = data(&response);
    let old = before.step("Images Published").unwrap();
    let new = after.step("Images Published").unwrap();
    assert_eq!(new.status, StepStatus::Error);
    assert_eq!(new.started_at, old.started_at);
    assert_eq!(new.completed_at, old.completed_at);
}

#[tokio::test]
async fn test_update_step_validation() {
    let server = test_server();

    let cases = [
        json!({ "status": "done" }),
        json!({ "stepName": "Started" }),
        json!({ "stepName": "Started", "status": "finished" }),
        json!({ "stepName": "   ", "status": "done" }),
        json!({ "stepName": "Started", "status": 5 }),
        json!({ "stepName": 42, "status": "done" }),
        json!({ "stepName": "Started", "status": true }),
        json!([{ "stepName": "Started", "status": "done" }]),
    ];

    for body in cases {
        let response = server.patch("/api/releases/v2.5.0/step").json(&body).await;
        assert_eq!(response.status_code().as_u16(), 400, "body: {}", body);
        assert!(!error_message(&response).is_empty());
    }
}

#[tokio::test]
async fn test_update_step_unknown_step_is_not_found() {
    let server = test_server();

    let before: Release = data(&server.get("/api/releases/v2.5.0").await);
    let response = server
        .patch("/api/releases/v2.5.0/step")
        .json(&json!({ "stepName": "Nonexistent Step", "status": "done" }))
        .await;

    assert_eq!(response.status_code().as_u16(), 404);
    assert!(error_message(&response).contains("Nonexistent Step"));

    let after: Release = data(&server.get("/api/releases/v2.5.0").await);
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_update_step_unknown_release() {
    let server = test_server();

    let response = server
        .patch("/api/releases/v0.0.0/step")
        .json(&json!({ "stepName": "Started", "status": "done" }))
        .await;

    assert_eq!(response.status_code().as_u16(), 404);
}

#[tokio::test]
async fn test_malformed_body_uses_envelope() {
    let server = test_server();

    let response = server
        .patch("/api/releases/v2.5.0/step")
        .text("{ not json")
        .await;

    assert!(response.status_code().is_client_error());
    assert!(!error_message(&response).is_empty());
}

// =============================================================================
// ADVANCE TESTS
// =============================================================================

#[tokio::test]
async fn test_advance_cycles_through_statuses() {
    let server = test_server();
    let mut seen = Vec::new();

    for _ in 0..4 {
        let response = server
            .post("/api/releases/v2.4.2/step/advance")
            .json(&json!({ "stepName": "Docs Merged" }))
            .await;
        response.assert_status_ok();
        let release: Release = data(&response);
        seen.push(release.step("Docs Merged").unwrap().status);
    }

    assert_eq!(
        seen,
        vec![
            StepStatus::InProgress,
            StepStatus::Done,
            StepStatus::Error,
            StepStatus::Pending
        ]
    );

    // Timestamps captured on the first pass survive the full cycle.
    let release: Release = data(&server.get("/api/releases/v2.4.2").await);
    let step = release.step("Docs Merged").unwrap();
    assert!(step.started_at.is_some());
    assert!(step.completed_at.is_some());
}

#[tokio::test]
async fn test_advance_requires_step_name() {
    let server = test_server();

    let response = server
        .post("/api/releases/v2.4.2/step/advance")
        .json(&json!({}))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
}

// =============================================================================
// DASHBOARD TESTS
// =============================================================================

#[tokio::test]
async fn test_dashboard() {
    let server = test_server();

    let response = server.get("/api/dashboard").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["data"]["oss"]["releases"].is_array());
    assert!(body["data"]["enterprise"]["hashreleases"].is_array());

    let dashboard: Dashboard = data(&response);
    for project in ProjectId::ALL {
        let summary = dashboard.project(project).unwrap();
        assert!(summary.releases.len() <= 5);
        assert!(summary.hashreleases.len() <= 5);
        assert!(
            summary
                .releases
                .windows(2)
                .all(|w| w[0].started_at >= w[1].started_at)
        );
        assert!(
            summary
                .hashreleases
                .windows(2)
                .all(|w| w[0].created_at >= w[1].created_at)
        );
    }
}

#[tokio::test]
async fn test_dashboard_caps_at_five() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let repo: Repository<Release> = Repository::new(Arc::clone(&store), RELEASES, 1);
    let shared = ReleaseService::new(store, Arc::new(DefaultClock), 5);
    shared.ensure_seeded().unwrap();
    // More enterprise releases than the dashboard shows, all older than v3.1.0.
    let template = shared.get_release("v3.0.4").unwrap();
    for n in 0..6 {
        let mut extra = template.clone();
        extra.id = format!("v3.0.{}", 10 + n);
        extra.started_at += chrono::Duration::hours(i64::from(n));
        repo.insert_new(&extra).unwrap();
    }

    let server = TestServer::new(create_router(
        AppState::new(shared),
        &ServerConfig::default(),
    ))
    .unwrap();
    let dashboard: Dashboard = data(&server.get("/api/dashboard").await);
    let enterprise = dashboard.project(ProjectId::Enterprise).unwrap();
    assert_eq!(enterprise.releases.len(), 5);
    assert_eq!(enterprise.releases[0].id, "v3.1.0");
}

// =============================================================================
// AUTH AND LIMIT TESTS
// =============================================================================

fn authed_config() -> ServerConfig {
    ServerConfig {
        api_key: Some("test-key".to_string()),
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let server = test_server_with(&authed_config());

    let response = server
        .get("/api/releases")
        .add_header(
            header::AUTHORIZATION,
            "Bearer test-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_rejects_wrong_and_missing_key() {
    let server = test_server_with(&authed_config());

    let wrong = server
        .get("/api/dashboard")
        .add_header(
            header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;
    assert_eq!(wrong.status_code().as_u16(), 401);

    let missing = server.get("/api/dashboard").await;
    assert_eq!(missing.status_code().as_u16(), 401);
    assert_eq!(error_message(&missing), "Unauthorized");
}

#[tokio::test]
async fn test_auth_health_bypass() {
    let server = test_server_with(&authed_config());

    let response = server.get("/health").await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let server = test_server_with(&ServerConfig {
        rate_limit: 1,
        ..ServerConfig::default()
    });

    let first = server.get("/health").await;
    first.assert_status_ok();

    let second = server.get("/health").await;
    assert_eq!(second.status_code().as_u16(), 429);
}

// =============================================================================
// REDB BACKEND
// =============================================================================

#[tokio::test]
async fn test_updates_survive_restart_on_redb() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("relboard.redb");

    {
        let service = ReleaseService::new(
            Arc::new(RedbStore::open(&path).unwrap()),
            Arc::new(DefaultClock),
            5,
        );
        service.ensure_seeded().unwrap();
        let server = TestServer::new(create_router(
            AppState::new(service),
            &ServerConfig::default(),
        ))
        .unwrap();
        server
            .patch("/api/releases/v3.1.0/step")
            .json(&json!({ "stepName": "Images Published", "status": "done" }))
            .await
            .assert_status_ok();
    }

    let service = ReleaseService::new(
        Arc::new(RedbStore::open(&path).unwrap()),
        Arc::new(DefaultClock),
        5,
    );
    let server = TestServer::new(create_router(
        AppState::new(service),
        &ServerConfig::default(),
    ))
    .unwrap();
    let release: Release = data(&server.get("/api/releases/v3.1.0").await);
    assert_eq!(
        release.step("Images Published").unwrap().status,
        StepStatus::Done
    );
}
