//! Admin surface for `RegistrySetting` (spec §3, §8 scenario 6): no ecosystem wire
//! protocol carries a "disable this format" call, so this lives under the same uniform
//! `/api/v1/…` prefix as [`crate::ownership`] rather than any per-format router.
//! `RegistryCoreService::update_setting`/`list_settings` enforce the admin-only gate;
//! this module is just the wire translation.
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::Router;
use serde::Deserialize;

use lodestone_core::registry::RequestContext;

use crate::auth::require_principal;
use crate::errors::{Error, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/settings", get(list_settings))
        .route("/api/v1/settings/:format", put(update_setting))
}

async fn list_settings(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Result<Response> {
    let principal = require_principal(&headers, state.principals.as_ref())
        .await
        .map_err(Error::Core)?;
    let ctx = RequestContext::new(Some(principal));
    let settings = state.registry.list_settings(&ctx).await?;
    Ok(axum::Json(settings).into_response())
}

#[derive(Debug, Deserialize)]
struct UpdateSettingBody {
    enabled: bool,
    #[serde(default)]
    description: Option<String>,
}

async fn update_setting(
    State(state): State<AppState>,
    Path(format): Path<String>,
    headers: axum::http::HeaderMap,
    axum::Json(body): axum::Json<UpdateSettingBody>,
) -> Result<Response> {
    let format = format.parse().map_err(Error::Core)?;
    let principal = require_principal(&headers, state.principals.as_ref())
        .await
        .map_err(Error::Core)?;
    let ctx = RequestContext::new(Some(principal));
    let setting = state
        .registry
        .update_setting(format, body.enabled, body.description, &ctx)
        .await?;
    Ok(axum::Json(setting).into_response())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn router_builds() {
        let _: Router<AppState> = router();
    }
}
