//! In-memory `BlobStore`/`MetadataStore`/`PrincipalResolver` doubles, grounded on
//! `portfolio_backend_postgres`'s test suite pattern of exercising real trait
//! implementations against an in-process store rather than mocking individual calls.
//!
//! Unlike a production `MetadataStore`, [`InMemoryMetadataStore`]'s transactions are not
//! isolated: every [`InMemoryTx`] operation mutates the shared map immediately, and
//! `rollback` is a no-op. None of this crate's fixtures exercise rollback-after-partial-write
//! semantics, so the simplification is harmless here; a real backend (`lodestone-db`) must
//! not take this shortcut.
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use lodestone_core::errors::{Error, Result};
use lodestone_core::model::{
    Artifact, ArtifactFilter, DownloadEvent, Format, Ownership, Principal, RegistrySetting, User,
};
use lodestone_core::ports::{BlobStore, ByteStream, MetadataStore, MetadataTx, PrincipalResolver};

#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronously inspects a stored object. Test-only convenience; no production
    /// `BlobStore` exposes anything like it.
    pub fn peek(&self, path: &str) -> Option<Bytes> {
        self.objects.lock().expect("poisoned").get(path).cloned()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, path: &str, body: ByteStream) -> Result<(u64, String)> {
        let bytes = lodestone_core::stream::collect(body).await?;
        let digest = lodestone_core::digest::Sha256Digest::from_bytes(&bytes);
        let len = bytes.len() as u64;
        self.objects
            .lock()
            .expect("poisoned")
            .insert(path.to_string(), bytes);
        Ok((len, digest.as_str().to_string()))
    }

    async fn get(&self, path: &str) -> Result<ByteStream> {
        let bytes = self
            .objects
            .lock()
            .expect("poisoned")
            .get(path)
            .cloned()
            .ok_or(Error::NotFound)?;
        Ok(lodestone_core::stream::once(bytes))
    }

    async fn get_range(&self, path: &str, offset: u64) -> Result<ByteStream> {
        let bytes = self
            .objects
            .lock()
            .expect("poisoned")
            .get(path)
            .cloned()
            .ok_or(Error::NotFound)?;
        let offset = offset as usize;
        if offset > bytes.len() {
            return Err(Error::RangeNotSatisfiable);
        }
        Ok(lodestone_core::stream::once(bytes.slice(offset..)))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.objects.lock().expect("poisoned").contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects.lock().expect("poisoned").remove(path);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut objects = self.objects.lock().expect("poisoned");
        let bytes = objects.remove(from).ok_or(Error::NotFound)?;
        objects.insert(to.to_string(), bytes);
        Ok(())
    }
}

#[derive(Default)]
struct Inner {
    artifacts: HashMap<Uuid, Artifact>,
    users: HashMap<Uuid, User>,
    ownerships: Vec<Ownership>,
    upload_sessions: HashMap<Uuid, lodestone_core::model::UploadSession>,
    download_events: Vec<DownloadEvent>,
    settings: HashMap<Format, RegistrySetting>,
}

pub struct InMemoryMetadataStore {
    inner: std::sync::Arc<Mutex<Inner>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Seeds a user directly, bypassing the transactional surface; convenient test setup.
    pub fn seed_user(&self, user: User) {
        self.inner.lock().expect("poisoned").users.insert(user.id, user);
    }

    /// Seeds a per-format setting directly, defaulting every other format to enabled.
    pub fn seed_setting(&self, setting: RegistrySetting) {
        self.inner
            .lock()
            .expect("poisoned")
            .settings
            .insert(setting.format, setting);
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

struct InMemoryTx {
    inner: std::sync::Arc<Mutex<Inner>>,
}

#[async_trait]
impl MetadataTx for InMemoryTx {
    async fn insert_artifact(&mut self, artifact: &Artifact) -> Result<()> {
        let mut inner = self.inner.lock().expect("poisoned");
        if inner.artifacts.values().any(|a| {
            a.id != artifact.id
                && a.format == artifact.format
                && a.name == artifact.name
                && a.version == artifact.version
        }) {
            return Err(Error::AlreadyExists);
        }
        inner.artifacts.insert(artifact.id, artifact.clone());
        Ok(())
    }

    async fn delete_artifact(&mut self, id: Uuid) -> Result<()> {
        self.inner.lock().expect("poisoned").artifacts.remove(&id);
        Ok(())
    }

    async fn get_ownership(&mut self, format: Format, name: &str) -> Result<Vec<Ownership>> {
        Ok(self
            .inner
            .lock()
            .expect("poisoned")
            .ownerships
            .iter()
            .filter(|o| o.format == format && o.name == name)
            .cloned()
            .collect())
    }

    async fn insert_ownership(&mut self, ownership: &Ownership) -> Result<()> {
        self.inner.lock().expect("poisoned").ownerships.push(ownership.clone());
        Ok(())
    }

    async fn remove_ownership(&mut self, format: Format, name: &str, user_id: Uuid) -> Result<()> {
        self.inner
            .lock()
            .expect("poisoned")
            .ownerships
            .retain(|o| !(o.format == format && o.name == name && o.user_id == user_id));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn begin(&self) -> Result<Box<dyn MetadataTx>> {
        Ok(Box::new(InMemoryTx {
            inner: self.inner.clone(),
        }))
    }

    async fn get_artifact(
        &self,
        format: Format,
        name: &str,
        version: &str,
    ) -> Result<Option<Artifact>> {
        Ok(self
            .inner
            .lock()
            .expect("poisoned")
            .artifacts
            .values()
            .find(|a| a.format == format && a.name == name && a.version == version)
            .cloned())
    }

    async fn get_artifact_by_id(&self, id: Uuid) -> Result<Option<Artifact>> {
        Ok(self.inner.lock().expect("poisoned").artifacts.get(&id).cloned())
    }

    async fn list_artifacts(&self, filter: &ArtifactFilter) -> Result<(Vec<Artifact>, i64)> {
        let inner = self.inner.lock().expect("poisoned");
        let mut matches: Vec<Artifact> = inner
            .artifacts
            .values()
            .filter(|a| filter.format.map_or(true, |f| f == a.format))
            .filter(|a| match &filter.name {
                None => true,
                Some(n) if filter.name_exact => &a.name == n,
                Some(n) => a.name.contains(n.as_str()),
            })
            .filter(|a| filter.publisher.map_or(true, |p| a.published_by == Some(p)))
            .filter(|a| filter.is_public.map_or(true, |v| a.is_public == v))
            .filter(|a| filter.include_yanked || !a.yanked)
            .cloned()
            .collect();

        use lodestone_core::model::{SortKey, SortOrder};
        matches.sort_by(|a, b| {
            let ord = match filter.sort_key {
                SortKey::Name => a.name.cmp(&b.name),
                SortKey::Created => a.created_at.cmp(&b.created_at),
                SortKey::Updated => a.updated_at.cmp(&b.updated_at),
                SortKey::Downloads => a.download_count.cmp(&b.download_count),
            };
            match filter.sort_order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });

        let total = matches.len() as i64;
        let skipped = matches.into_iter().skip(filter.offset.max(0) as usize);
        // `limit <= 0` means "unbounded", matching the Postgres store: ArtifactFilter's
        // derived Default has limit: 0, and index/packument endpoints never set it.
        let page = if filter.limit > 0 {
            skipped.take(filter.limit as usize).collect()
        } else {
            skipped.collect()
        };
        Ok((page, total))
    }

    async fn set_yanked(&self, format: Format, name: &str, version: &str, yanked: bool) -> Result<()> {
        let mut inner = self.inner.lock().expect("poisoned");
        let artifact = inner
            .artifacts
            .values_mut()
            .find(|a| a.format == format && a.name == name && a.version == version)
            .ok_or(Error::NotFound)?;
        artifact.yanked = yanked;
        artifact.updated_at = Utc::now();
        Ok(())
    }

    async fn increment_download_count(&self, artifact_id: Uuid) -> Result<()> {
        if let Some(artifact) = self.inner.lock().expect("poisoned").artifacts.get_mut(&artifact_id) {
            artifact.download_count += 1;
        }
        Ok(())
    }

    async fn record_download_event(&self, event: &DownloadEvent) -> Result<()> {
        self.inner.lock().expect("poisoned").download_events.push(event.clone());
        Ok(())
    }

    async fn get_ownership(&self, format: Format, name: &str) -> Result<Vec<Ownership>> {
        Ok(self
            .inner
            .lock()
            .expect("poisoned")
            .ownerships
            .iter()
            .filter(|o| o.format == format && o.name == name)
            .cloned()
            .collect())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.inner.lock().expect("poisoned").users.get(&id).cloned())
    }

    async fn get_setting(&self, format: Format) -> Result<RegistrySetting> {
        Ok(self
            .inner
            .lock()
            .expect("poisoned")
            .settings
            .get(&format)
            .cloned()
            .unwrap_or(RegistrySetting {
                format,
                enabled: true,
                description: None,
                updated_by: None,
                updated_at: Utc::now(),
            }))
    }

    async fn set_setting(&self, setting: &RegistrySetting) -> Result<()> {
        self.inner
            .lock()
            .expect("poisoned")
            .settings
            .insert(setting.format, setting.clone());
        Ok(())
    }

    async fn list_settings(&self) -> Result<Vec<RegistrySetting>> {
        Ok(self.inner.lock().expect("poisoned").settings.values().cloned().collect())
    }

    async fn insert_upload_session(&self, session: &lodestone_core::model::UploadSession) -> Result<()> {
        self.inner
            .lock()
            .expect("poisoned")
            .upload_sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn get_upload_session(&self, id: Uuid) -> Result<Option<lodestone_core::model::UploadSession>> {
        Ok(self.inner.lock().expect("poisoned").upload_sessions.get(&id).cloned())
    }

    async fn update_upload_session(&self, session: &lodestone_core::model::UploadSession) -> Result<()> {
        self.inner
            .lock()
            .expect("poisoned")
            .upload_sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn delete_upload_session(&self, id: Uuid) -> Result<()> {
        self.inner.lock().expect("poisoned").upload_sessions.remove(&id);
        Ok(())
    }

    async fn list_expired_upload_sessions(
        &self,
        idle_threshold_secs: i64,
    ) -> Result<Vec<lodestone_core::model::UploadSession>> {
        let cutoff = Utc::now() - chrono::Duration::seconds(idle_threshold_secs);
        Ok(self
            .inner
            .lock()
            .expect("poisoned")
            .upload_sessions
            .values()
            .filter(|s| s.last_activity_at < cutoff)
            .cloned()
            .collect())
    }

    async fn list_oci_tags(&self, repository: &str) -> Result<Vec<String>> {
        let mut tags: Vec<String> = self
            .inner
            .lock()
            .expect("poisoned")
            .artifacts
            .values()
            .filter(|a| a.format == Format::Oci && a.name == repository)
            .map(|a| a.version.clone())
            .collect();
        tags.sort();
        Ok(tags)
    }

    async fn list_oci_repositories(&self) -> Result<Vec<String>> {
        let mut repos: Vec<String> = self
            .inner
            .lock()
            .expect("poisoned")
            .artifacts
            .values()
            .filter(|a| a.format == Format::Oci)
            .map(|a| a.name.clone())
            .collect();
        repos.sort();
        repos.dedup();
        Ok(repos)
    }
}

/// Resolves every credential to the same fixed [`Principal`]. Covers the common case of a
/// single authenticated test user; construct [`PrincipalResolver`] directly for multi-user
/// auth tests.
pub struct StaticPrincipalResolver(Principal);

impl StaticPrincipalResolver {
    pub fn new(principal: Principal) -> Self {
        Self(principal)
    }

    pub fn admin() -> Self {
        Self(Principal::admin(Uuid::new_v4(), "test-admin"))
    }
}

#[async_trait]
impl PrincipalResolver for StaticPrincipalResolver {
    async fn resolve(&self, _credential: &str) -> Result<Principal> {
        Ok(self.0.clone())
    }
}
