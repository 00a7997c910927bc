//! The Maven router (spec §6/§4.3 Maven): the repository-layout path itself is the
//! entire request — `GET|PUT /com/example/artifact/1.2.3/artifact-1.2.3.jar` — with no
//! container to parse. `lodestone_formats::maven::MavenAdapter` expects
//! `url_name = "groupId:artifactId"` and `url_version = "version::filename"`
//! (`MavenAdapter`'s own doc comment), so this router's only job is splitting the path
//! into those four components.
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use http::StatusCode;

use lodestone_core::model::Format;
use lodestone_core::registry::RequestContext;
use lodestone_core::Error as CoreError;
use lodestone_formats::maven::MavenAdapter;

use crate::auth::require_principal;
use crate::body::into_byte_stream;
use crate::errors::{Error, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/*path", get(download).put(publish))
}

/// Splits `com/example/artifact/1.2.3/artifact-1.2.3.jar` into
/// `("com.example:artifact", "1.2.3", "artifact-1.2.3.jar")`.
fn split_path(path: &str) -> Result<(String, String, String)> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 4 {
        return Err(CoreError::InvalidRequest("maven path too short".to_string()).into());
    }
    let (group_segments, rest) = segments.split_at(segments.len() - 3);
    let artifact_id = rest[0];
    let version = rest[1];
    let filename = rest[2];
    let group_id = group_segments.join(".");
    Ok((
        format!("{group_id}:{artifact_id}"),
        version.to_string(),
        filename.to_string(),
    ))
}

async fn download(State(state): State<AppState>, Path(path): Path<String>) -> Result<Response> {
    let (name, version, filename) = split_path(&path)?;
    let ctx = RequestContext::new(None);
    let (_artifact, body) = state
        .registry
        .download(Format::Maven, &name, &format!("{version}::{filename}"), &ctx)
        .await?;
    let mut response = (StatusCode::OK, axum::body::StreamBody::new(body)).into_response();
    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static(MavenAdapter::content_type(&filename)),
    );
    Ok(response)
}

async fn publish(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: axum::http::HeaderMap,
    body: axum::body::BodyStream,
) -> Result<Response> {
    let (name, version, filename) = split_path(&path)?;
    let principal = require_principal(&headers, state.principals.as_ref())
        .await
        .map_err(Error::Core)?;
    let ctx = RequestContext::new(Some(principal));
    let stream = into_byte_stream(body);
    state
        .registry
        .upload(
            Format::Maven,
            &name,
            Some(&format!("{version}::{filename}")),
            stream,
            &ctx,
        )
        .await?;
    Ok(StatusCode::CREATED.into_response())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_group_artifact_version_filename() {
        let (name, version, filename) =
            split_path("com/example/mylib/1.0.0/mylib-1.0.0.jar").unwrap();
        assert_eq!(name, "com.example:mylib");
        assert_eq!(version, "1.0.0");
        assert_eq!(filename, "mylib-1.0.0.jar");
    }

    #[test]
    fn rejects_short_paths() {
        assert!(split_path("mylib/1.0.0").is_err());
    }
}
