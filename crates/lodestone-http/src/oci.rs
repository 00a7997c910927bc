//! The OCI Distribution v2 router (spec §6): a single wildcard route dispatches every
//! sub-operation by pattern-matching the captured path suffix, because repository names
//! are themselves slash-delimited and of unbounded depth (`library/nested/alpine`),
//! which ordinary axum `:param` segments cannot express. Grounded on
//! `portfolio_http::{blobs, manifests, tags}`, which solve the same problem with a
//! middleware-injected per-repository `Extension` plus fixed route templates; Lodestone
//! folds that into one `dispatch` handler instead since there is only one backend, never
//! a per-repository store to select.
use std::collections::HashMap;

use axum::body::BodyStream;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use uuid::Uuid;

use lodestone_core::digest::OciDigest;
use lodestone_core::registry::RequestContext;
use lodestone_core::Error as CoreError;

use crate::auth::require_principal;
use crate::body::{collect, into_byte_stream, stream_len};
use crate::errors::OciError;
use crate::state::AppState;

const API_VERSION_HEADER: &str = "Docker-Distribution-API-Version";
const API_VERSION_VALUE: &str = "registry/2.0";
const CONTENT_DIGEST_HEADER: &str = "Docker-Content-Digest";
const UPLOAD_UUID_HEADER: &str = "Docker-Upload-UUID";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(version_check))
        .route("/_catalog", get(catalog))
        .route(
            "/*path",
            get(dispatch)
                .head(dispatch)
                .post(dispatch)
                .put(dispatch)
                .patch(dispatch)
                .delete(dispatch),
        )
}

async fn version_check() -> impl IntoResponse {
    with_api_version((StatusCode::OK, axum::Json(serde_json::json!({}))))
}

async fn catalog(State(state): State<AppState>) -> Result<Response, OciError> {
    let repos = state.oci_manifests.list_repositories().await.map_err(OciError::blob)?;
    let body = lodestone_formats::oci::render_catalog(repos);
    Ok(with_api_version((StatusCode::OK, axum::Json(body))).into_response())
}

/// The routes a repository path can resolve to, parsed from the wildcard tail in
/// priority order: `blobs/uploads/` is checked before the bare `blobs/` marker since the
/// former is a superstring of the latter at the same starting position.
enum Route<'a> {
    TagsList { repo: &'a str },
    Manifest { repo: &'a str, reference: &'a str },
    UploadStart { repo: &'a str },
    UploadSession { repo: &'a str, session: &'a str },
    Blob { repo: &'a str, digest: &'a str },
}

fn parse_route(path: &str) -> Option<Route<'_>> {
    if let Some(repo) = path.strip_suffix("/tags/list") {
        return Some(Route::TagsList { repo });
    }
    if let Some(idx) = path.rfind("/manifests/") {
        let (repo, rest) = path.split_at(idx);
        let reference = &rest["/manifests/".len()..];
        if !repo.is_empty() && !reference.is_empty() {
            return Some(Route::Manifest { repo, reference });
        }
        return None;
    }
    if let Some(idx) = path.rfind("/blobs/uploads/") {
        let (repo, rest) = path.split_at(idx);
        let session = &rest["/blobs/uploads/".len()..];
        if repo.is_empty() {
            return None;
        }
        return Some(if session.is_empty() {
            Route::UploadStart { repo }
        } else {
            Route::UploadSession { repo, session }
        });
    }
    if let Some(idx) = path.rfind("/blobs/") {
        let (repo, rest) = path.split_at(idx);
        let digest = &rest["/blobs/".len()..];
        if !repo.is_empty() && !digest.is_empty() {
            return Some(Route::Blob { repo, digest });
        }
        return None;
    }
    None
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: BodyStream,
) -> Result<Response, OciError> {
    let route = parse_route(&path).ok_or_else(|| OciError::blob(CoreError::NotFound))?;
    match route {
        Route::TagsList { repo } => tags_list(state, repo).await,
        Route::Manifest { repo, reference } => match method {
            Method::GET => manifest_get(state, repo, reference).await,
            Method::HEAD => manifest_head(state, repo, reference).await,
            Method::PUT => manifest_put(state, repo, reference, &headers, body).await,
            Method::DELETE => manifest_delete(state, repo, reference).await,
            _ => Err(OciError::manifest(CoreError::InvalidRequest(
                "unsupported method on manifest route".to_string(),
            ))),
        },
        Route::UploadStart { repo } => match method {
            Method::POST => upload_start(state, repo, &headers, &query, body).await,
            _ => Err(OciError::session(CoreError::InvalidRequest(
                "unsupported method on upload-start route".to_string(),
            ))),
        },
        Route::UploadSession { repo, session } => {
            let session_id: Uuid = session
                .parse()
                .map_err(|_| OciError::session(CoreError::InvalidRequest("invalid session id".to_string())))?;
            match method {
                Method::GET => upload_status(state, repo, session_id).await,
                Method::PATCH => upload_patch(state, repo, session_id, &headers, body).await,
                Method::PUT => upload_put(state, repo, session_id, &query, body).await,
                Method::DELETE => upload_cancel(state, session_id).await,
                _ => Err(OciError::session(CoreError::InvalidRequest(
                    "unsupported method on upload-session route".to_string(),
                ))),
            }
        }
        Route::Blob { repo, digest } => match method {
            Method::GET => blob_get(state, digest).await,
            Method::HEAD => blob_head(state, digest).await,
            Method::DELETE => blob_delete(state, repo, digest).await,
            _ => Err(OciError::blob(CoreError::InvalidRequest(
                "unsupported method on blob route".to_string(),
            ))),
        },
    }
}

async fn tags_list(state: AppState, repo: &str) -> Result<Response, OciError> {
    let tags = state.oci_manifests.list_tags(repo).await.map_err(OciError::manifest)?;
    let body = lodestone_formats::oci::render_tags(repo, tags);
    Ok(with_api_version((StatusCode::OK, axum::Json(body))).into_response())
}

async fn manifest_get(state: AppState, repo: &str, reference: &str) -> Result<Response, OciError> {
    let (artifact, body) = state
        .oci_manifests
        .get_manifest(repo, reference)
        .await
        .map_err(OciError::manifest)?;
    let mut response = with_api_version((
        StatusCode::OK,
        axum::body::StreamBody::new(body),
    ))
    .into_response();
    set_manifest_headers(response.headers_mut(), &artifact);
    Ok(response)
}

async fn manifest_head(state: AppState, repo: &str, reference: &str) -> Result<Response, OciError> {
    let (artifact, _body) = state
        .oci_manifests
        .get_manifest(repo, reference)
        .await
        .map_err(OciError::manifest)?;
    let mut response = with_api_version(StatusCode::OK).into_response();
    set_manifest_headers(response.headers_mut(), &artifact);
    Ok(response)
}

fn set_manifest_headers(headers: &mut HeaderMap, artifact: &lodestone_core::model::Artifact) {
    headers.insert(
        CONTENT_DIGEST_HEADER,
        HeaderValue::from_str(&format!("sha256:{}", artifact.sha256)).expect("hex digest is ascii"),
    );
    headers.insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_str(&artifact.content_type).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        axum::http::header::CONTENT_LENGTH,
        HeaderValue::from_str(&artifact.size.to_string()).expect("decimal length is ascii"),
    );
}

async fn manifest_put(
    state: AppState,
    repo: &str,
    reference: &str,
    headers: &HeaderMap,
    body: BodyStream,
) -> Result<Response, OciError> {
    let principal = require_principal(headers, state.principals.as_ref())
        .await
        .map_err(OciError::manifest)?;
    let bytes = collect(body).await.map_err(OciError::manifest)?;
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/vnd.oci.image.manifest.v1+json");
    let ctx = RequestContext::new(Some(principal));
    let digest = state
        .oci_manifests
        .put_manifest(repo, reference, content_type, bytes, &ctx)
        .await
        .map_err(OciError::manifest)?;

    let mut response = with_api_version(StatusCode::CREATED).into_response();
    response.headers_mut().insert(
        CONTENT_DIGEST_HEADER,
        HeaderValue::from_str(&digest.to_string()).expect("digest string is ascii"),
    );
    response.headers_mut().insert(
        axum::http::header::LOCATION,
        HeaderValue::from_str(&format!("/v2/{repo}/manifests/{reference}")).map_err(|e| {
            OciError::manifest(CoreError::Internal(e.to_string()))
        })?,
    );
    Ok(response)
}

async fn manifest_delete(state: AppState, repo: &str, reference: &str) -> Result<Response, OciError> {
    state
        .oci_manifests
        .delete_manifest(repo, reference)
        .await
        .map_err(OciError::manifest)?;
    Ok(with_api_version(StatusCode::ACCEPTED).into_response())
}

async fn blob_get(state: AppState, digest: &str) -> Result<Response, OciError> {
    let parsed = OciDigest::try_from(digest).map_err(|e| OciError::blob(CoreError::InvalidRequest(e.to_string())))?;
    let body = state.blobs.get(&parsed.blob_path()).await.map_err(OciError::blob)?;
    let mut response =
        with_api_version((StatusCode::OK, axum::body::StreamBody::new(body))).into_response();
    response.headers_mut().insert(
        CONTENT_DIGEST_HEADER,
        HeaderValue::from_str(digest).map_err(|e| OciError::blob(CoreError::Internal(e.to_string())))?,
    );
    Ok(response)
}

async fn blob_head(state: AppState, digest: &str) -> Result<Response, OciError> {
    let parsed = OciDigest::try_from(digest).map_err(|e| OciError::blob(CoreError::InvalidRequest(e.to_string())))?;
    if !state.blobs.exists(&parsed.blob_path()).await.map_err(OciError::blob)? {
        return Err(OciError::blob(CoreError::NotFound));
    }
    let body = state.blobs.get(&parsed.blob_path()).await.map_err(OciError::blob)?;
    let len = stream_len(body).await.map_err(OciError::blob)?;

    let mut response = with_api_version(StatusCode::OK).into_response();
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_DIGEST_HEADER,
        HeaderValue::from_str(digest).map_err(|e| OciError::blob(CoreError::Internal(e.to_string())))?,
    );
    headers.insert(
        axum::http::header::CONTENT_LENGTH,
        HeaderValue::from_str(&len.to_string()).expect("decimal length is ascii"),
    );
    Ok(response)
}

async fn blob_delete(state: AppState, _repo: &str, digest: &str) -> Result<Response, OciError> {
    let parsed = OciDigest::try_from(digest).map_err(|e| OciError::blob(CoreError::InvalidRequest(e.to_string())))?;
    state.blobs.delete(&parsed.blob_path()).await.map_err(OciError::blob)?;
    Ok(with_api_version(StatusCode::ACCEPTED).into_response())
}

async fn upload_start(
    state: AppState,
    repo: &str,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    body: BodyStream,
) -> Result<Response, OciError> {
    let principal = require_principal(headers, state.principals.as_ref())
        .await
        .map_err(OciError::session)?;
    let session = state
        .oci_sessions
        .start_upload(repo, principal.user_id)
        .await
        .map_err(OciError::session)?;

    // Monolithic single-POST upload: a `digest` query parameter accompanies the full blob
    // body in one request rather than the usual POST-then-PATCH*-then-PUT sequence.
    if let Some(digest) = query.get("digest") {
        let expected = OciDigest::try_from(digest.as_str())
            .map_err(|e| OciError::session(CoreError::InvalidRequest(e.to_string())))?;
        let stream = into_byte_stream(body);
        state
            .oci_sessions
            .append_chunk(session.id, None, stream)
            .await
            .map_err(OciError::session)?;
        let (_session, _path) = state
            .oci_sessions
            .complete(session.id, &expected)
            .await
            .map_err(OciError::session)?;
        let mut response = with_api_version(StatusCode::CREATED).into_response();
        response.headers_mut().insert(
            axum::http::header::LOCATION,
            HeaderValue::from_str(&format!("/v2/{repo}/blobs/{digest}"))
                .map_err(|e| OciError::session(CoreError::Internal(e.to_string())))?,
        );
        response.headers_mut().insert(
            CONTENT_DIGEST_HEADER,
            HeaderValue::from_str(digest).map_err(|e| OciError::session(CoreError::Internal(e.to_string())))?,
        );
        return Ok(response);
    }

    let mut response = with_api_version(StatusCode::ACCEPTED).into_response();
    set_session_headers(response.headers_mut(), repo, session.id, session.size as u64)?;
    Ok(response)
}

async fn upload_status(state: AppState, repo: &str, session_id: Uuid) -> Result<Response, OciError> {
    let session = state.oci_sessions.status(session_id).await.map_err(OciError::session)?;
    let mut response = with_api_version(StatusCode::NO_CONTENT).into_response();
    set_session_headers(response.headers_mut(), repo, session_id, session.size as u64)?;
    Ok(response)
}

async fn upload_patch(
    state: AppState,
    repo: &str,
    session_id: Uuid,
    headers: &HeaderMap,
    body: BodyStream,
) -> Result<Response, OciError> {
    use headers::Header;
    let content_range_start = headers
        .get(axum::http::header::CONTENT_RANGE)
        .and_then(|value| crate::headers::ContentRange::decode(&mut std::iter::once(value)).ok())
        .map(|cr| cr.start);

    let stream = into_byte_stream(body);
    let session = state
        .oci_sessions
        .append_chunk(session_id, content_range_start, stream)
        .await
        .map_err(OciError::session)?;

    let mut response = with_api_version(StatusCode::ACCEPTED).into_response();
    set_session_headers(response.headers_mut(), repo, session.id, session.size as u64)?;
    Ok(response)
}

async fn upload_put(
    state: AppState,
    repo: &str,
    session_id: Uuid,
    query: &HashMap<String, String>,
    body: BodyStream,
) -> Result<Response, OciError> {
    let digest = query
        .get("digest")
        .ok_or_else(|| OciError::session(CoreError::InvalidRequest("missing digest query parameter".to_string())))?;
    let expected =
        OciDigest::try_from(digest.as_str()).map_err(|e| OciError::session(CoreError::InvalidRequest(e.to_string())))?;

    let stream = into_byte_stream(body);
    state
        .oci_sessions
        .append_chunk(session_id, None, stream)
        .await
        .map_err(OciError::session)?;
    let (_session, _path) = state
        .oci_sessions
        .complete(session_id, &expected)
        .await
        .map_err(OciError::session)?;

    let mut response = with_api_version(StatusCode::CREATED).into_response();
    response.headers_mut().insert(
        axum::http::header::LOCATION,
        HeaderValue::from_str(&format!("/v2/{repo}/blobs/{digest}"))
            .map_err(|e| OciError::session(CoreError::Internal(e.to_string())))?,
    );
    response.headers_mut().insert(
        CONTENT_DIGEST_HEADER,
        HeaderValue::from_str(digest).map_err(|e| OciError::session(CoreError::Internal(e.to_string())))?,
    );
    Ok(response)
}

async fn upload_cancel(state: AppState, session_id: Uuid) -> Result<Response, OciError> {
    state.oci_sessions.cancel(session_id).await.map_err(OciError::session)?;
    Ok(with_api_version(StatusCode::NO_CONTENT).into_response())
}

fn set_session_headers(headers: &mut HeaderMap, repo: &str, session_id: Uuid, size: u64) -> Result<(), OciError> {
    use headers::Header;

    headers.insert(
        axum::http::header::LOCATION,
        HeaderValue::from_str(&format!("/v2/{repo}/blobs/uploads/{session_id}"))
            .map_err(|e| OciError::session(CoreError::Internal(e.to_string())))?,
    );
    headers.insert(
        UPLOAD_UUID_HEADER,
        HeaderValue::from_str(&session_id.to_string()).expect("uuid string is ascii"),
    );
    let range = crate::headers::Range {
        start: 0,
        end: size.saturating_sub(1),
    };
    let mut values = Vec::new();
    range.encode(&mut values);
    if let Some(value) = values.into_iter().next() {
        headers.insert(axum::http::header::RANGE, value);
    }
    Ok(())
}

fn with_api_version(inner: impl IntoResponse) -> Response {
    let mut response = inner.into_response();
    response.headers_mut().insert(
        API_VERSION_HEADER,
        HeaderValue::from_static(API_VERSION_VALUE),
    );
    response
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_manifest_route_with_slashes_in_repo() {
        match parse_route("library/nested/alpine/manifests/latest") {
            Some(Route::Manifest { repo, reference }) => {
                assert_eq!(repo, "library/nested/alpine");
                assert_eq!(reference, "latest");
            }
            _ => panic!("expected manifest route"),
        }
    }

    #[test]
    fn parses_upload_start_before_blob_route() {
        match parse_route("alpine/blobs/uploads/") {
            Some(Route::UploadStart { repo }) => assert_eq!(repo, "alpine"),
            _ => panic!("expected upload-start route"),
        }
    }

    #[test]
    fn parses_upload_session_route() {
        let id = Uuid::new_v4().to_string();
        match parse_route(&format!("alpine/blobs/uploads/{id}")) {
            Some(Route::UploadSession { repo, session }) => {
                assert_eq!(repo, "alpine");
                assert_eq!(session, id);
            }
            _ => panic!("expected upload-session route"),
        }
    }

    #[test]
    fn parses_blob_route() {
        match parse_route("alpine/blobs/sha256:abcd") {
            Some(Route::Blob { repo, digest }) => {
                assert_eq!(repo, "alpine");
                assert_eq!(digest, "sha256:abcd");
            }
            _ => panic!("expected blob route"),
        }
    }

    #[test]
    fn parses_tags_list_route() {
        match parse_route("alpine/tags/list") {
            Some(Route::TagsList { repo }) => assert_eq!(repo, "alpine"),
            _ => panic!("expected tags-list route"),
        }
    }

    #[test]
    fn rejects_unrecognized_suffix() {
        assert!(parse_route("alpine/unknown").is_none());
    }
}
