//! The Cargo router (spec §6/§4.3 Cargo, SPEC_FULL §4 Open Question 1): crates.io's
//! publish/download/search/info endpoints, plus yank/unyank backed by
//! `RegistryCoreService::set_yanked` instead of the distilled spec's hardcoded
//! `yanked: false`.
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, put};
use axum::Router;
use http::StatusCode;
use std::collections::HashMap;

use lodestone_core::model::{ArtifactFilter, Format, SortKey, SortOrder};
use lodestone_core::registry::RequestContext;
use lodestone_core::Error as CoreError;

use crate::auth::require_principal;
use crate::body::into_byte_stream;
use crate::errors::{Error, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/crates/new", put(publish))
        .route("/api/v1/crates", get(search))
        .route("/api/v1/crates/:name", get(info))
        .route("/api/v1/crates/:name/:version/download", get(download))
        .route("/api/v1/crates/:name/:version/yank", delete(yank))
        .route("/api/v1/crates/:name/:version/unyank", put(unyank))
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
        .upload(Format::Cargo, "", None, stream, &ctx)
        .await?;
    Ok((
        StatusCode::OK,
        axum::Json(serde_json::json!({ "crate": { "name": artifact.name, "max_version": artifact.version }, "warnings": { "invalid_categories": [], "invalid_badges": [], "other": [] } })),
    )
        .into_response())
}

async fn download(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Response> {
    let ctx = RequestContext::new(None);
    let (_artifact, body) = state.registry.download(Format::Cargo, &name, &version, &ctx).await?;
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/x-tar")],
        axum::body::StreamBody::new(body),
    )
        .into_response())
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response> {
    let filter = ArtifactFilter {
        format: Some(Format::Cargo),
        name: query.get("q").cloned(),
        name_exact: false,
        limit: query
            .get("per_page")
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
        ..Default::default()
    };
    let (artifacts, total) = state.registry.list(&filter).await?;
    let crates: Vec<_> = artifacts
        .iter()
        .filter(|a| !a.yanked)
        .map(|a| {
            serde_json::json!({
                "name": a.name,
                "max_version": a.version,
                "description": a.metadata.get("description"),
            })
        })
        .collect();
    Ok(axum::Json(serde_json::json!({
        "crates": crates,
        "meta": { "total": total },
    }))
    .into_response())
}

async fn info(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response> {
    let filter = ArtifactFilter {
        format: Some(Format::Cargo),
        name: Some(name.clone()),
        name_exact: true,
        include_yanked: true,
        sort_key: SortKey::Created,
        sort_order: SortOrder::Ascending,
        ..Default::default()
    };
    let (mut artifacts, total) = state.registry.list(&filter).await?;
    if total == 0 {
        return Err(CoreError::NotFound.into());
    }
    // The index is read in semver order (spec §4.1), not upload order.
    lodestone_formats::support::sort_by_version(&mut artifacts);
    let versions: Vec<_> = artifacts
        .iter()
        .map(lodestone_formats::cargo::render_index_entry)
        .collect();
    Ok(axum::Json(serde_json::json!({ "versions": versions })).into_response())
}

async fn yank(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
    headers: axum::http::HeaderMap,
) -> Result<Response> {
    set_yanked(state, name, version, headers, true).await
}

async fn unyank(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
    headers: axum::http::HeaderMap,
) -> Result<Response> {
    set_yanked(state, name, version, headers, false).await
}

async fn set_yanked(
    state: AppState,
    name: String,
    version: String,
    headers: axum::http::HeaderMap,
    yanked: bool,
) -> Result<Response> {
    let principal = require_principal(&headers, state.principals.as_ref())
        .await
        .map_err(Error::Core)?;
    let ctx = RequestContext::new(Some(principal));
    state
        .registry
        .set_yanked(Format::Cargo, &name, &version, yanked, &ctx)
        .await?;
    Ok(axum::Json(serde_json::json!({ "ok": true })).into_response())
}
