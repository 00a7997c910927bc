//! Shared application state threaded through every router via `axum::extract::State`
//! (spec §9 "Context propagation" — the services themselves are stateless w.r.t. the
//! request, only the principal/request-id vary per call). Unlike `portfolio_http::Portfolio`,
//! which injects a per-repository store via middleware because each repository can have a
//! distinct backend, Lodestone has exactly one `RegistryCoreService`/`OciSessionManager`/
//! `OciManifestService` shared across every format and repository.
use std::sync::Arc;

use lodestone_core::oci_manifest::OciManifestService;
use lodestone_core::oci_session::OciSessionManager;
use lodestone_core::ports::{BlobStore, PrincipalResolver};
use lodestone_core::registry::RegistryCoreService;

#[derive(Clone)]
pub struct AppState(pub Arc<Inner>);

pub struct Inner {
    pub registry: RegistryCoreService,
    pub oci_sessions: OciSessionManager,
    pub oci_manifests: OciManifestService,
    /// Direct handle onto the blob store, used only by OCI's digest-addressed blob
    /// routes (`GET`/`HEAD`/`DELETE /v2/{repo}/blobs/{digest}`) which look blobs up by
    /// content hash rather than by `(format, name, version)` and so bypass
    /// `RegistryCoreService` entirely (spec §4.4 content-addressed layout).
    pub blobs: Arc<dyn BlobStore>,
    pub principals: Arc<dyn PrincipalResolver>,
    /// Absolute base URL this server is reachable at (e.g. `https://registry.example.com`),
    /// used to render absolute URLs in npm's `dist.tarball`, NuGet's service index, Helm's
    /// `index.yaml`, and Go's proxy responses.
    pub base_url: String,
}

impl AppState {
    pub fn new(
        registry: RegistryCoreService,
        oci_sessions: OciSessionManager,
        oci_manifests: OciManifestService,
        blobs: Arc<dyn BlobStore>,
        principals: Arc<dyn PrincipalResolver>,
        base_url: String,
    ) -> Self {
        Self(Arc::new(Inner {
            registry,
            oci_sessions,
            oci_manifests,
            blobs,
            principals,
            base_url,
        }))
    }
}

impl std::ops::Deref for AppState {
    type Target = Inner;

    fn deref(&self) -> &Inner {
        &self.0
    }
}
