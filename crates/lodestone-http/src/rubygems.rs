//! The RubyGems router (spec §6/§4.3 RubyGems): `POST /api/v1/gems` with the raw `.gem`
//! body, download by its `{name}-{version}.gem` storage-path filename, and a degraded
//! `/api/v1/dependencies` that returns an empty marshaled payload (spec §4.3 RubyGems
//! explicitly accepts this as "acceptable degradation" — full Marshal serialization has
//! no equivalent crate in the stack).
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use http::StatusCode;

use lodestone_core::model::Format;
use lodestone_core::registry::RequestContext;
use lodestone_core::Error as CoreError;
use lodestone_formats::support::split_name_version;

use crate::auth::require_principal;
use crate::body::into_byte_stream;
use crate::errors::{Error, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/gems", post(publish))
        .route("/api/v1/dependencies", get(dependencies))
        .route("/gems/:filename", get(download))
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
        .upload(Format::Rubygems, "", None, stream, &ctx)
        .await?;
    Ok((
        StatusCode::CREATED,
        format!("Successfully registered gem: {} ({})", artifact.name, artifact.version),
    )
        .into_response())
}

async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> Result<Response> {
    let stem = filename
        .strip_suffix(".gem")
        .ok_or(CoreError::InvalidRequest("gem filename must end in .gem".to_string()))?;
    let (name, version) =
        split_name_version(stem).ok_or(CoreError::InvalidRequest("malformed gem filename".to_string()))?;
    let ctx = RequestContext::new(None);
    let (_artifact, body) = state.registry.download(Format::Rubygems, &name, &version, &ctx).await?;
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/octet-stream")],
        axum::body::StreamBody::new(body),
    )
        .into_response())
}

/// Degraded: RubyGems clients that fall back to the dependency-resolution API get an
/// empty result set rather than a real Marshal-encoded response (spec §4.3 RubyGems).
async fn dependencies() -> impl IntoResponse {
    (StatusCode::OK, [(axum::http::header::CONTENT_TYPE, "application/octet-stream")], Vec::<u8>::new())
}
