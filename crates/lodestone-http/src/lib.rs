//! # Lodestone HTTP
//!
//! The Wire Protocol Surface (spec §2, §6): one `axum::Router` per ecosystem plus the
//! OCI Distribution v2 router, assembled by [`router`] into the single app the
//! `lodestone-server` binary serves. Every per-format router translates its ecosystem's
//! native request shape into a [`lodestone_core::registry::RegistryCoreService`] call
//! and renders the response back through the matching `lodestone_formats` renderer;
//! `lodestone_http` itself holds no format-specific business logic beyond that
//! translation. Mirrors `portfolio_http::Portfolio::router`'s per-concern `nest`/`merge`
//! assembly.
pub mod auth;
pub mod body;
pub mod cargo;
pub mod errors;
pub mod go;
pub mod headers;
pub mod helm;
mod integration_test;
pub mod maven;
pub mod npm;
pub mod nuget;
pub mod oci;
pub mod opa;
pub mod ownership;
pub mod rubygems;
pub mod settings;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Builds the complete application router (spec §6): every format gets its own
/// path-rooted sub-router except OCI, which lives at `/v2` (Docker CLI compatibility),
/// plus the uniform ownership endpoints (spec §4.1). `tower_http::trace::TraceLayer`
/// gives every request a span the way `portfolio_http::Portfolio::router` does,
/// threading `request_id`/method/path per spec §9 "Context propagation".
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/nuget", nuget::router())
        .nest("/npm", npm::router())
        .nest("/maven", maven::router())
        .nest("/go", go::router())
        .nest("/helm", helm::router())
        .nest("/cargo", cargo::router())
        .nest("/rubygems", rubygems::router())
        .nest("/opa", opa::router())
        .nest("/v2", oci::router())
        .merge(ownership::router())
        .merge(settings::router())
        .layer(TraceLayer::new_for_http())
}
