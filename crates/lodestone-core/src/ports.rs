//! The external interfaces the core consumes but does not implement (spec §1): blob
//! storage, metadata storage, and credential resolution. `lodestone-storage` and
//! `lodestone-db` provide concrete implementations; `lodestone-test-support` provides
//! in-memory doubles for tests.
//!
//! Every trait here is written to stay object-safe (`Box<dyn Trait>`/`Arc<dyn Trait>`),
//! unlike `portfolio_core::registry`'s associated-type traits, because
//! [`crate::adapter::AdapterRegistry`] needs to hold a single concrete map of
//! `format -> Box<dyn FormatAdapter>` and [`RegistryCoreService`](crate::registry::RegistryCoreService)
//! needs to hold a single concrete `Arc<dyn BlobStore>` / `Arc<dyn MetadataStore>` pair
//! regardless of which backend crate is wired in.
use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use std::pin::Pin;
use uuid::Uuid;

use crate::errors::Result;
use crate::model::{
    Artifact, ArtifactFilter, DownloadEvent, Format, OwnerRole, Ownership, Principal,
    RegistrySetting, UploadSession, User,
};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Byte-addressable content storage (spec §2): `put`/`get`/`exists`/`delete`, streaming
/// only, mirroring `portfolio_objectstore::ObjectStore`'s shape.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Streams `body` to `path`, returning the number of bytes written and their SHA-256.
    /// Implementations MUST NOT buffer the full body in memory (spec §5 Backpressure).
    async fn put(&self, path: &str, body: ByteStream) -> Result<(u64, String)>;

    /// Opens a streaming reader over the object at `path`.
    async fn get(&self, path: &str) -> Result<ByteStream>;

    /// Opens a streaming reader over `path` starting at byte `offset` (used for OCI's
    /// `Range` support and resumed downloads).
    async fn get_range(&self, path: &str, offset: u64) -> Result<ByteStream>;

    async fn exists(&self, path: &str) -> Result<bool>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Atomically moves `from` to `to` when both live on the same store (used to promote
    /// an OCI session's tmp blob to its permanent content-addressed path, spec §4.2).
    /// Implementations that cannot rename across their own namespaces fall back to
    /// copy-then-delete; either is acceptable per spec §4.2.
    async fn rename(&self, from: &str, to: &str) -> Result<()>;
}

/// A single atomic unit of metadata work (spec §4.1 step 4, §5 Ordering guarantees).
/// Obtained from [`MetadataStore::begin`], consumed by exactly one of `commit`/`rollback`.
#[async_trait]
pub trait MetadataTx: Send {
    async fn insert_artifact(&mut self, artifact: &Artifact) -> Result<()>;

    async fn delete_artifact(&mut self, id: Uuid) -> Result<()>;

    async fn get_ownership(&mut self, format: Format, name: &str) -> Result<Vec<Ownership>>;

    async fn insert_ownership(&mut self, ownership: &Ownership) -> Result<()>;

    async fn remove_ownership(&mut self, format: Format, name: &str, user_id: Uuid) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Transactional record of users, artifacts, ownerships, upload sessions, download events,
/// and registry settings (spec §2). Mirrors the split `portfolio_backend_postgres` makes
/// between its `RepositoryStore`/`ManifestStore` query surface and its transaction type,
/// collapsed here into one trait since Lodestone's metadata shape is uniform across formats.
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    async fn begin(&self) -> Result<Box<dyn MetadataTx>>;

    async fn get_artifact(
        &self,
        format: Format,
        name: &str,
        version: &str,
    ) -> Result<Option<Artifact>>;

    async fn get_artifact_by_id(&self, id: Uuid) -> Result<Option<Artifact>>;

    async fn list_artifacts(&self, filter: &ArtifactFilter) -> Result<(Vec<Artifact>, i64)>;

    async fn set_yanked(&self, format: Format, name: &str, version: &str, yanked: bool) -> Result<()>;

    async fn increment_download_count(&self, artifact_id: Uuid) -> Result<()>;

    async fn record_download_event(&self, event: &DownloadEvent) -> Result<()>;

    async fn get_ownership(&self, format: Format, name: &str) -> Result<Vec<Ownership>>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn get_setting(&self, format: Format) -> Result<RegistrySetting>;

    async fn set_setting(&self, setting: &RegistrySetting) -> Result<()>;

    async fn list_settings(&self) -> Result<Vec<RegistrySetting>>;

    // -- OCI upload sessions (spec §4.2) --

    async fn insert_upload_session(&self, session: &UploadSession) -> Result<()>;

    async fn get_upload_session(&self, id: Uuid) -> Result<Option<UploadSession>>;

    async fn update_upload_session(&self, session: &UploadSession) -> Result<()>;

    async fn delete_upload_session(&self, id: Uuid) -> Result<()>;

    /// Sessions whose `last_activity_at` is older than `idle_threshold_secs` ago (spec §4.2 GC).
    async fn list_expired_upload_sessions(&self, idle_threshold_secs: i64) -> Result<Vec<UploadSession>>;

    // -- OCI tag bookkeeping --

    /// Returns the tags recorded for `repository`, lexicographically ordered (spec §4.3 OCI).
    async fn list_oci_tags(&self, repository: &str) -> Result<Vec<String>>;

    /// Every repository name with at least one recorded artifact, for `GET /v2/_catalog`.
    async fn list_oci_repositories(&self) -> Result<Vec<String>>;
}

/// Resolves an opaque credential (bearer token, API key, or HTTP Basic password) to a
/// [`Principal`], or rejects it (spec §2, §6). Token issuance and password hashing are
/// explicitly out of scope (spec §1); this trait only covers the read side the core needs.
#[async_trait]
pub trait PrincipalResolver: Send + Sync + 'static {
    async fn resolve(&self, credential: &str) -> Result<Principal>;
}

#[cfg(test)]
mod test {
    use super::*;

    // Trait-object construction exercises object-safety; this is a compile-time check more
    // than a runtime assertion.
    #[allow(dead_code)]
    struct Holder {
        blobs: std::sync::Arc<dyn BlobStore>,
        metadata: std::sync::Arc<dyn MetadataStore>,
        principals: std::sync::Arc<dyn PrincipalResolver>,
    }

    #[allow(dead_code)]
    fn ownership_role_gate(roles: &[OwnerRole]) -> bool {
        roles.iter().any(|r| r.can_publish())
    }
}
