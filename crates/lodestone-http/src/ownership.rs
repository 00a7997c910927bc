//! Ownership management endpoints (spec §4.1 `GetOwners`/`AddOwner`/`RemoveOwner`): not
//! part of any single ecosystem's native wire protocol, so these live under a uniform
//! `/api/v1/{format}/owners/{name}` prefix (spec §6's general "`/api/v1/{format}/…`"
//! rule, which the ecosystem-native representative endpoints in the same section
//! override for everything format-specific).
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, put};
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use lodestone_core::model::OwnerRole;
use lodestone_core::registry::RequestContext;

use crate::auth::require_principal;
use crate::errors::{Error, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/:format/owners/:name", get(get_owners).put(add_owner))
        .route("/api/v1/:format/owners/:name/:user_id", delete(remove_owner))
}

#[derive(Debug, Deserialize)]
struct AddOwnerBody {
    user_id: Uuid,
    role: OwnerRole,
}

async fn get_owners(
    State(state): State<AppState>,
    Path((format, name)): Path<(String, String)>,
) -> Result<Response> {
    let format = format.parse().map_err(Error::Core)?;
    let owners = state.registry.get_owners(format, &name).await?;
    Ok(axum::Json(owners).into_response())
}

async fn add_owner(
    State(state): State<AppState>,
    Path((format, name)): Path<(String, String)>,
    headers: axum::http::HeaderMap,
    axum::Json(body): axum::Json<AddOwnerBody>,
) -> Result<Response> {
    let format = format.parse().map_err(Error::Core)?;
    let principal = require_principal(&headers, state.principals.as_ref())
        .await
        .map_err(Error::Core)?;
    let ctx = RequestContext::new(Some(principal));
    state
        .registry
        .add_owner(format, &name, body.user_id, body.role, &ctx)
        .await?;
    Ok(axum::Json(serde_json::json!({ "ok": true })).into_response())
}

async fn remove_owner(
    State(state): State<AppState>,
    Path((format, name, user_id)): Path<(String, String, Uuid)>,
    headers: axum::http::HeaderMap,
) -> Result<Response> {
    let format = format.parse().map_err(Error::Core)?;
    let principal = require_principal(&headers, state.principals.as_ref())
        .await
        .map_err(Error::Core)?;
    let ctx = RequestContext::new(Some(principal));
    state.registry.remove_owner(format, &name, user_id, &ctx).await?;
    Ok(axum::Json(serde_json::json!({ "ok": true })).into_response())
}
