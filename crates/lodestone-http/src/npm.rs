//! The npm router (spec §6 npm, §4.3 npm): packument read, per-version read, publish,
//! and tarball download, plus scoped `@scope/name` variants which need a wildcard route
//! since the package name itself contains a `/`. Grounded on spec §4.3 npm directly.
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::Router;
use http::StatusCode;

use lodestone_core::model::{ArtifactFilter, Format};
use lodestone_core::registry::RequestContext;
use lodestone_core::Error as CoreError;

use crate::auth::require_principal;
use crate::body::into_byte_stream;
use crate::errors::{Error, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/*rest", get(dispatch_get).put(publish))
}

/// Every npm GET route shares one package-name-then-suffix shape; scoped names
/// (`@scope/name`) make a fixed `:name/:version` route ambiguous with
/// `:name/-/:filename`, so the wildcard tail is parsed by hand the same way
/// `crate::oci::parse_route` handles OCI's slash-delimited repository names.
enum Route<'a> {
    Packument { name: &'a str },
    Version { name: &'a str, version: &'a str },
    Tarball { name: &'a str, filename: &'a str },
}

fn parse_route(path: &str) -> Option<Route<'_>> {
    if let Some(idx) = path.rfind("/-/") {
        let (name, rest) = path.split_at(idx);
        let filename = &rest["/-/".len()..];
        if name.is_empty() || filename.is_empty() {
            return None;
        }
        return Some(Route::Tarball { name, filename });
    }
    match path.rsplit_once('/') {
        // Scoped package with no version suffix: "@scope/name".
        Some((scope, name)) if scope.starts_with('@') && !scope.contains('/') => {
            Some(Route::Packument { name: path })
                .filter(|_| !name.is_empty())
        }
        Some((name, version)) => Some(Route::Version { name, version }),
        None => Some(Route::Packument { name: path }),
    }
}

async fn dispatch_get(State(state): State<AppState>, Path(path): Path<String>) -> Result<Response> {
    let route = parse_route(&path).ok_or(CoreError::NotFound)?;
    match route {
        Route::Packument { name } => packument(state, name).await,
        Route::Version { name, version } => version(state, name, version).await,
        Route::Tarball { name, filename } => tarball(state, name, filename).await,
    }
}

async fn packument(state: AppState, name: &str) -> Result<Response> {
    let filter = ArtifactFilter {
        format: Some(Format::Npm),
        name: Some(name.to_string()),
        name_exact: true,
        ..Default::default()
    };
    let (artifacts, total) = state.registry.list(&filter).await?;
    if total == 0 {
        return Err(CoreError::NotFound.into());
    }
    Ok(axum::Json(lodestone_formats::npm::render_packument(
        name,
        &artifacts,
        &state.base_url,
    ))
    .into_response())
}

async fn version(state: AppState, name: &str, version: &str) -> Result<Response> {
    let ctx = RequestContext::new(None);
    let (artifact, _body) = state.registry.download(Format::Npm, name, version, &ctx).await?;
    let packument = lodestone_formats::npm::render_packument(name, std::slice::from_ref(&artifact), &state.base_url);
    let manifest = packument
        .get("versions")
        .and_then(|v| v.get(version))
        .cloned()
        .unwrap_or(packument);
    Ok(axum::Json(manifest).into_response())
}

async fn tarball(state: AppState, name: &str, filename: &str) -> Result<Response> {
    let version = filename
        .strip_prefix(&format!("{}-", name.rsplit('/').next().unwrap_or(name)))
        .and_then(|s| s.strip_suffix(".tgz"))
        .ok_or(CoreError::InvalidRequest("malformed tarball filename".to_string()))?;
    let ctx = RequestContext::new(None);
    let (artifact, body) = state.registry.download(Format::Npm, name, version, &ctx).await?;
    let mut response = (StatusCode::OK, axum::body::StreamBody::new(body)).into_response();
    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_str(&artifact.content_type)
            .unwrap_or_else(|_| axum::http::HeaderValue::from_static("application/octet-stream")),
    );
    Ok(response)
}

async fn publish(
    State(state): State<AppState>,
    Path(path): Path<String>,
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
        .upload(Format::Npm, &path, None, stream, &ctx)
        .await?;
    Ok((
        StatusCode::CREATED,
        axum::Json(serde_json::json!({ "ok": true, "name": artifact.name, "version": artifact.version })),
    )
        .into_response())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_unscoped_packument_route() {
        match parse_route("left-pad") {
            Some(Route::Packument { name }) => assert_eq!(name, "left-pad"),
            _ => panic!("expected packument route"),
        }
    }

    #[test]
    fn parses_unscoped_version_route() {
        match parse_route("left-pad/1.0.0") {
            Some(Route::Version { name, version }) => {
                assert_eq!(name, "left-pad");
                assert_eq!(version, "1.0.0");
            }
            _ => panic!("expected version route"),
        }
    }

    #[test]
    fn parses_scoped_packument_route() {
        match parse_route("@acme/widgets") {
            Some(Route::Packument { name }) => assert_eq!(name, "@acme/widgets"),
            _ => panic!("expected packument route"),
        }
    }

    #[test]
    fn parses_tarball_route() {
        match parse_route("@acme/widgets/-/widgets-1.0.0.tgz") {
            Some(Route::Tarball { name, filename }) => {
                assert_eq!(name, "@acme/widgets");
                assert_eq!(filename, "widgets-1.0.0.tgz");
            }
            _ => panic!("expected tarball route"),
        }
    }
}
