//! Full-router tests (spec §6, §8): drive [`crate::router`] through `tower::ServiceExt::
//! oneshot` against in-memory fakes, the same "exercise the real trait impl, not a mock"
//! approach `lodestone-test-support` already uses for its own unit tests. These exist
//! alongside the route-parsing unit tests in each per-format module; this file covers the
//! publish → read round trip those can't reach on their own.
#![cfg(test)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use lodestone_core::registry::RegistryCoreService;
use lodestone_core::model::Principal;
use lodestone_test_support::{InMemoryBlobStore, InMemoryMetadataStore, StaticPrincipalResolver};

use crate::state::AppState;

fn test_state() -> AppState {
    let adapters = lodestone_formats::build_adapter_registry();
    let blobs = Arc::new(InMemoryBlobStore::new());
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let registry = RegistryCoreService::new(adapters, blobs.clone(), metadata.clone());
    let oci_sessions = lodestone_core::oci_session::OciSessionManager::new(blobs.clone(), metadata.clone(), 3600);
    let oci_manifests = lodestone_core::oci_manifest::OciManifestService::new(blobs.clone(), metadata.clone());
    let principal = Principal::admin(uuid::Uuid::new_v4(), "test-admin");
    let principals = Arc::new(StaticPrincipalResolver::new(principal));
    AppState::new(registry, oci_sessions, oci_manifests, blobs, principals, "http://localhost:8080".to_string())
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn npm_publish_then_read_packument() {
    let router = crate::router().with_state(test_state());

    let payload = lodestone_test_support::fixtures::npm_publish_payload("lodestone-widgets", "1.0.0");
    let publish = Request::builder()
        .method("PUT")
        .uri("/npm/lodestone-widgets")
        .header(header::AUTHORIZATION, "Bearer testtoken")
        .body(Body::from(payload))
        .unwrap();
    let response = router.clone().oneshot(publish).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let read = Request::builder()
        .method("GET")
        .uri("/npm/lodestone-widgets")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(read).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let packument = body_json(response).await;
    assert!(packument["versions"]["1.0.0"].is_object());
}

#[tokio::test]
async fn cargo_publish_then_yank_marks_version_yanked() {
    let router = crate::router().with_state(test_state());

    let frame = lodestone_test_support::fixtures::cargo_publish_frame("widgets", "1.0.0", b"fake crate bytes");
    let publish = Request::builder()
        .method("PUT")
        .uri("/cargo/api/v1/crates/new")
        .header(header::AUTHORIZATION, "Bearer testtoken")
        .body(Body::from(frame))
        .unwrap();
    let response = router.clone().oneshot(publish).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let yank = Request::builder()
        .method("DELETE")
        .uri("/cargo/api/v1/crates/widgets/1.0.0/yank")
        .header(header::AUTHORIZATION, "Bearer testtoken")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(yank).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let info = Request::builder()
        .method("GET")
        .uri("/cargo/api/v1/crates/widgets")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(info).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let versions = body["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0]["yanked"], true);
}

#[tokio::test]
async fn publish_grants_owner_and_ownership_is_readable() {
    let router = crate::router().with_state(test_state());

    let payload = lodestone_test_support::fixtures::npm_publish_payload("lodestone-widgets", "1.0.0");
    let publish = Request::builder()
        .method("PUT")
        .uri("/npm/lodestone-widgets")
        .header(header::AUTHORIZATION, "Bearer testtoken")
        .body(Body::from(payload))
        .unwrap();
    let response = router.clone().oneshot(publish).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let owners = Request::builder()
        .method("GET")
        .uri("/api/v1/npm/owners/lodestone-widgets")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(owners).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let owners = body.as_array().unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0]["role"], "owner");
}

#[tokio::test]
async fn anonymous_publish_is_rejected() {
    let router = crate::router().with_state(test_state());

    let payload = lodestone_test_support::fixtures::npm_publish_payload("lodestone-widgets", "1.0.0");
    let publish = Request::builder()
        .method("PUT")
        .uri("/npm/lodestone-widgets")
        .body(Body::from(payload))
        .unwrap();
    let response = router.oneshot(publish).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// A later-published backport must not become `@latest` (spec §4.1: exact-name listings
/// are ordered by version, not by upload time).
#[tokio::test]
async fn go_latest_picks_highest_semver_not_latest_upload() {
    let router = crate::router().with_state(test_state());
    let module = "example.com/widgets";

    for version in ["v1.0.0", "v0.9.0"] {
        let zip = lodestone_test_support::fixtures::go_module_zip(module, version);
        let publish = Request::builder()
            .method("PUT")
            .uri(format!("/go/{module}/@v/{version}.zip"))
            .header(header::AUTHORIZATION, "Bearer testtoken")
            .body(Body::from(zip))
            .unwrap();
        let response = router.clone().oneshot(publish).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let latest = Request::builder()
        .method("GET")
        .uri(format!("/go/{module}/@latest"))
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(latest).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let info = body_json(response).await;
    assert_eq!(info["Version"], "v1.0.0");

    let list = Request::builder()
        .method("GET")
        .uri(format!("/go/{module}/@v/list"))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(list).await.unwrap();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let listed = String::from_utf8(bytes.to_vec()).unwrap();
    // Both versions are listed; a `limit: 0` default filter must not silently empty this.
    assert_eq!(listed.lines().count(), 2);
}

/// `ArtifactFilter`'s derived `Default` carries `limit: 0`; both `MetadataStore` impls
/// must treat that as unbounded rather than returning zero rows (spec §4.1 List).
#[tokio::test]
async fn npm_packument_lists_every_published_version() {
    let router = crate::router().with_state(test_state());

    for version in ["1.0.0", "1.1.0"] {
        let payload = lodestone_test_support::fixtures::npm_publish_payload("lodestone-widgets", version);
        let publish = Request::builder()
            .method("PUT")
            .uri("/npm/lodestone-widgets")
            .header(header::AUTHORIZATION, "Bearer testtoken")
            .body(Body::from(payload))
            .unwrap();
        let response = router.clone().oneshot(publish).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let read = Request::builder()
        .method("GET")
        .uri("/npm/lodestone-widgets")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(read).await.unwrap();
    let packument = body_json(response).await;
    assert!(packument["versions"]["1.0.0"].is_object());
    assert!(packument["versions"]["1.1.0"].is_object());
    assert_eq!(packument["dist-tags"]["latest"], "1.1.0");
}
