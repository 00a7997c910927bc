//! The OPA router (spec §6/§4.3 OPA): bundles have no embedded identifier, so the
//! version comes entirely from an `X-Bundle-Version` request header (defaulting to
//! `"latest"`), resolved here into `url_version` before the core ever sees it.
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::Router;
use http::StatusCode;

use lodestone_core::model::{ArtifactFilter, Format, SortKey, SortOrder};
use lodestone_core::registry::RequestContext;
use lodestone_core::Error as CoreError;

use crate::auth::require_principal;
use crate::body::into_byte_stream;
use crate::errors::{Error, Result};
use crate::state::AppState;

const BUNDLE_VERSION_HEADER: &str = "x-bundle-version";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bundles/:name", put(publish).get(latest))
        .route("/bundles/:name/:version", get(download))
}

fn bundle_version(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(BUNDLE_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| format!("v{v}"))
        .unwrap_or_else(|| "latest".to_string())
}

async fn publish(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: axum::http::HeaderMap,
    body: axum::body::BodyStream,
) -> Result<Response> {
    let principal = require_principal(&headers, state.principals.as_ref())
        .await
        .map_err(Error::Core)?;
    let ctx = RequestContext::new(Some(principal));
    let version = bundle_version(&headers);
    let stream = into_byte_stream(body);
    state
        .registry
        .upload(Format::Opa, &name, Some(&version), stream, &ctx)
        .await?;
    Ok(StatusCode::CREATED.into_response())
}

async fn download(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Response> {
    let ctx = RequestContext::new(None);
    let (_artifact, body) = state.registry.download(Format::Opa, &name, &version, &ctx).await?;
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/gzip")],
        axum::body::StreamBody::new(body),
    )
        .into_response())
}

async fn latest(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response> {
    let filter = ArtifactFilter {
        format: Some(Format::Opa),
        name: Some(name.clone()),
        name_exact: true,
        sort_key: SortKey::Created,
        sort_order: SortOrder::Descending,
        limit: 1,
        ..Default::default()
    };
    let (artifacts, _total) = state.registry.list(&filter).await?;
    let artifact = artifacts.into_iter().next().ok_or(CoreError::NotFound)?;
    let ctx = RequestContext::new(None);
    let (_artifact, body) = state
        .registry
        .download(Format::Opa, &name, &artifact.version, &ctx)
        .await?;
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/gzip")],
        axum::body::StreamBody::new(body),
    )
        .into_response())
}
