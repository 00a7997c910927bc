//! The Go module proxy router (spec §6/§4.3 Go): `@latest`, `@v/list`,
//! `@v/{version}.info`, `@v/{version}.mod`, `@v/{version}.zip`, plus a `PUT` on the zip
//! route for publishing (the official proxy protocol is read-only; Lodestone needs one
//! ingress point, so `PUT` on the same `.zip` suffix is the natural wire shape — this is
//! SPEC_FULL §6's "Go module zip validation depth" decision surfacing at the HTTP layer).
//! The module path itself is slash-delimited and of unbounded depth
//! (`github.com/foo/bar`), so the suffix is parsed out of a wildcard tail the same way
//! `crate::oci::parse_route` handles OCI repository names.
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use http::StatusCode;

use lodestone_core::model::{ArtifactFilter, Format, SortKey, SortOrder};
use lodestone_core::registry::RequestContext;
use lodestone_core::Error as CoreError;

use crate::auth::require_principal;
use crate::body::into_byte_stream;
use crate::errors::{Error, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/*path",
        get(dispatch_get).put(dispatch_put),
    )
}

enum Route<'a> {
    Latest { module: &'a str },
    List { module: &'a str },
    Info { module: &'a str, version: &'a str },
    Mod { module: &'a str, version: &'a str },
    Zip { module: &'a str, version: &'a str },
}

fn parse_route(path: &str) -> Option<Route<'_>> {
    if let Some(module) = path.strip_suffix("/@latest") {
        return Some(Route::Latest { module });
    }
    if let Some(module) = path.strip_suffix("/@v/list") {
        return Some(Route::List { module });
    }
    let idx = path.rfind("/@v/")?;
    let (module, rest) = path.split_at(idx);
    let rest = &rest["/@v/".len()..];
    if let Some(version) = rest.strip_suffix(".info") {
        return Some(Route::Info { module, version });
    }
    if let Some(version) = rest.strip_suffix(".mod") {
        return Some(Route::Mod { module, version });
    }
    if let Some(version) = rest.strip_suffix(".zip") {
        return Some(Route::Zip { module, version });
    }
    None
}

async fn dispatch_get(State(state): State<AppState>, Path(path): Path<String>) -> Result<Response> {
    let route = parse_route(&path).ok_or(CoreError::NotFound)?;
    match route {
        Route::Latest { module } => latest(state, module).await,
        Route::List { module } => list(state, module).await,
        Route::Info { module, version } => info(state, module, version).await,
        Route::Mod { module, version } => module_file(state, module, version).await,
        Route::Zip { module, version } => zip(state, module, version).await,
    }
}

async fn dispatch_put(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: axum::http::HeaderMap,
    body: axum::body::BodyStream,
) -> Result<Response> {
    match parse_route(&path) {
        Some(Route::Zip { module, version }) => publish(state, module, version, &headers, body).await,
        _ => Err(CoreError::InvalidRequest("unsupported Go module PUT route".to_string()).into()),
    }
}

async fn module_versions(state: &AppState, module: &str) -> Result<Vec<lodestone_core::model::Artifact>> {
    let filter = ArtifactFilter {
        format: Some(Format::Go),
        name: Some(module.to_string()),
        name_exact: true,
        sort_key: SortKey::Created,
        sort_order: SortOrder::Ascending,
        ..Default::default()
    };
    let (mut artifacts, _total) = state.registry.list(&filter).await?;
    // `@latest`/`@v/list` are ordered by semver (spec §4.1), not upload order: a backport
    // published after a newer release must not become `@latest`.
    lodestone_formats::support::sort_by_version(&mut artifacts);
    Ok(artifacts)
}

async fn latest(state: AppState, module: &str) -> Result<Response> {
    let artifacts = module_versions(&state, module).await?;
    let latest = artifacts.last().ok_or(CoreError::NotFound)?;
    Ok(axum::Json(lodestone_formats::go::render_info(latest)).into_response())
}

async fn list(state: AppState, module: &str) -> Result<Response> {
    let artifacts = module_versions(&state, module).await?;
    let body = artifacts
        .iter()
        .map(|a| a.version.clone())
        .collect::<Vec<_>>()
        .join("\n");
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}

async fn info(state: AppState, module: &str, version: &str) -> Result<Response> {
    let ctx = RequestContext::new(None);
    let (artifact, _body) = state.registry.download(Format::Go, module, version, &ctx).await?;
    Ok(axum::Json(lodestone_formats::go::render_info(&artifact)).into_response())
}

async fn module_file(state: AppState, module: &str, version: &str) -> Result<Response> {
    let ctx = RequestContext::new(None);
    let (artifact, _body) = state.registry.download(Format::Go, module, version, &ctx).await?;
    let go_mod = lodestone_formats::go::render_mod(&artifact).ok_or(CoreError::NotFound)?;
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        go_mod,
    )
        .into_response())
}

async fn zip(state: AppState, module: &str, version: &str) -> Result<Response> {
    let ctx = RequestContext::new(None);
    let (_artifact, body) = state.registry.download(Format::Go, module, version, &ctx).await?;
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/zip")],
        axum::body::StreamBody::new(body),
    )
        .into_response())
}

async fn publish(
    state: AppState,
    module: &str,
    version: &str,
    headers: &axum::http::HeaderMap,
    body: axum::body::BodyStream,
) -> Result<Response> {
    let principal = require_principal(headers, state.principals.as_ref())
        .await
        .map_err(Error::Core)?;
    let ctx = RequestContext::new(Some(principal));
    let stream = into_byte_stream(body);
    state
        .registry
        .upload(Format::Go, module, Some(version), stream, &ctx)
        .await?;
    Ok(StatusCode::CREATED.into_response())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_latest_route() {
        match parse_route("example.com/foo/@latest") {
            Some(Route::Latest { module }) => assert_eq!(module, "example.com/foo"),
            _ => panic!("expected latest route"),
        }
    }

    #[test]
    fn parses_list_route() {
        match parse_route("example.com/foo/@v/list") {
            Some(Route::List { module }) => assert_eq!(module, "example.com/foo"),
            _ => panic!("expected list route"),
        }
    }

    #[test]
    fn parses_zip_route() {
        match parse_route("example.com/foo/@v/v1.0.0.zip") {
            Some(Route::Zip { module, version }) => {
                assert_eq!(module, "example.com/foo");
                assert_eq!(version, "v1.0.0");
            }
            _ => panic!("expected zip route"),
        }
    }
}
