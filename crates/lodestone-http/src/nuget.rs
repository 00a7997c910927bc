//! The NuGet v3 router (spec §6 NuGet): service index bootstrap, flat-container
//! download, the v2-compatible publish endpoint, a minimal search, and the registration
//! page read API. Grounded on spec §4.3 NuGet directly; identifier case rules (lowercase
//! in URLs, preserve-case in response bodies) come from the same section.
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::Router;
use http::StatusCode;
use std::collections::HashMap;

use lodestone_core::model::{ArtifactFilter, Format};
use lodestone_core::registry::RequestContext;

use crate::auth::require_principal;
use crate::body::into_byte_stream;
use crate::errors::{Error, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v3/index.json", get(service_index))
        .route("/v3/search", get(search))
        .route("/v3/registration/:id/index.json", get(registration_page))
        .route("/v3-flatcontainer/:id/index.json", get(flat_versions))
        .route(
            "/v3-flatcontainer/:id/:version/:filename",
            get(flat_download),
        )
        .route("/v2/package", put(publish))
}

async fn service_index(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(lodestone_formats::nuget::render_service_index(&state.base_url))
}

async fn flat_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let filter = ArtifactFilter {
        format: Some(Format::Nuget),
        name: Some(id.to_ascii_lowercase()),
        name_exact: true,
        ..Default::default()
    };
    let (mut artifacts, _total) = state.registry.list(&filter).await?;
    artifacts.retain(|a| !a.yanked);
    artifacts.sort_by(|a, b| a.version.cmp(&b.version));
    let versions: Vec<String> = artifacts
        .into_iter()
        .map(|a| a.version.to_ascii_lowercase())
        .collect();
    Ok(axum::Json(serde_json::json!({ "versions": versions })).into_response())
}

async fn flat_download(
    State(state): State<AppState>,
    Path((id, version, _filename)): Path<(String, String, String)>,
) -> Result<Response> {
    let ctx = RequestContext::new(None);
    let (artifact, body) = state
        .registry
        .download(Format::Nuget, &id, &version, &ctx)
        .await?;
    let mut response =
        (StatusCode::OK, axum::body::StreamBody::new(body)).into_response();
    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_str(&artifact.content_type)
            .unwrap_or_else(|_| axum::http::HeaderValue::from_static("application/octet-stream")),
    );
    Ok(response)
}

async fn publish(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::BodyStream,
) -> Result<Response> {
    let principal = require_principal(&headers, state.principals.as_ref())
        .await
        .map_err(Error::Core)?;
    let ctx = RequestContext::new(Some(principal));
    let stream = into_byte_stream(body);
    let artifact = state
        .registry
        .upload(Format::Nuget, "", None, stream, &ctx)
        .await?;
    Ok((
        StatusCode::CREATED,
        axum::Json(serde_json::json!({ "id": artifact.name, "version": artifact.version })),
    )
        .into_response())
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response> {
    let filter = ArtifactFilter {
        format: Some(Format::Nuget),
        name: query.get("q").cloned(),
        name_exact: false,
        limit: query
            .get("take")
            .and_then(|v| v.parse().ok())
            .unwrap_or(20),
        offset: query.get("skip").and_then(|v| v.parse().ok()).unwrap_or(0),
        ..Default::default()
    };
    let (artifacts, total) = state.registry.list(&filter).await?;
    let data: Vec<_> = artifacts
        .iter()
        .filter(|a| !a.yanked)
        .map(|a| {
            serde_json::json!({
                "id": a.name,
                "version": a.version,
                "description": a.metadata.get("description"),
            })
        })
        .collect();
    Ok(axum::Json(serde_json::json!({ "totalHits": total, "data": data })).into_response())
}

async fn registration_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let filter = ArtifactFilter {
        format: Some(Format::Nuget),
        name: Some(id.clone()),
        name_exact: true,
        ..Default::default()
    };
    let (artifacts, _total) = state.registry.list(&filter).await?;
    Ok(axum::Json(lodestone_formats::nuget::render_registration_page(
        &state.base_url,
        &id,
        &artifacts,
    ))
    .into_response())
}
