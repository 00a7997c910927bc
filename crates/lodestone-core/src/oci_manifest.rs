//! Stateless OCI manifest and tag operations (spec §4.2 "Manifest operations are
//! stateless", §9 Open Question 4). These deliberately do not go through
//! [`crate::adapter::FormatAdapter`]/[`crate::registry::RegistryCoreService::upload`]:
//! OCI tags are mutable (re-pushing `latest` must replace it, not fail with
//! `AlreadyExists`), so the write path here upserts the `(oci, repo, tag)` Artifact row
//! directly instead of going through the generic Upload's uniqueness-conflict
//! semantics. This is the one write path the spec's design note 4 calls for: the
//! manifest body lives only at its content-addressed blob path; the Artifact row for a
//! tag just points at it.
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::digest::OciDigest;
use crate::errors::{Error, Result};
use crate::model::{Artifact, Format};
use crate::ports::{BlobStore, ByteStream, MetadataStore};
use crate::registry::RequestContext;
use crate::stream;

pub struct OciManifestService {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
}

impl OciManifestService {
    pub fn new(blobs: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { blobs, metadata }
    }

    /// `PUT /v2/{repo}/manifests/{reference}`. Writes the manifest body to the blob
    /// store at its digest-addressed path, then upserts the `(oci, repo, reference)`
    /// Artifact row to point at it. Returns the computed digest.
    pub async fn put_manifest(
        &self,
        repo: &str,
        reference: &str,
        content_type: &str,
        body: bytes::Bytes,
        ctx: &RequestContext,
    ) -> Result<OciDigest> {
        let setting = self.metadata.get_setting(Format::Oci).await?;
        let is_admin = ctx.principal.as_ref().map(|p| p.is_admin).unwrap_or(false);
        if !setting.enabled && !is_admin {
            return Err(Error::FormatDisabled);
        }
        let principal = ctx.principal.as_ref().ok_or(Error::Unauthenticated)?;

        let digest = OciDigest::from_bytes(&body);
        let blob_path = digest.blob_path();
        if !self.blobs.exists(&blob_path).await? {
            self.blobs
                .put(&blob_path, stream::once(body.clone()))
                .await?;
        }

        let existing = self
            .metadata
            .get_artifact(Format::Oci, repo, reference)
            .await?;

        // Same ownership gate as RegistryCoreService::upload (spec §4.1 precondition):
        // OCI's manifest write path differs only in how it resolves a conflicting
        // `(repo, reference)` (replace, not `AlreadyExists`), not in who may publish.
        let ownerships = self.metadata.get_ownership(Format::Oci, repo).await?;
        if !ownerships.is_empty() && !principal.is_admin {
            match ownerships.iter().find(|o| o.user_id == principal.user_id) {
                Some(o) if o.role.can_publish() => {}
                _ => return Err(Error::Forbidden),
            }
        }

        let now = Utc::now();
        let artifact = Artifact {
            id: existing.as_ref().map(|a| a.id).unwrap_or_else(Uuid::new_v4),
            format: Format::Oci,
            name: repo.to_string(),
            version: reference.to_string(),
            content_type: content_type.to_string(),
            size: body.len() as i64,
            sha256: digest.encoded().to_string(),
            sha1: None,
            storage_path: blob_path,
            metadata: Default::default(),
            download_count: existing.as_ref().map(|a| a.download_count).unwrap_or(0),
            published_by: Some(principal.user_id),
            is_public: true,
            yanked: false,
            created_at: existing.as_ref().map(|a| a.created_at).unwrap_or(now),
            updated_at: now,
        };

        let mut tx = self.metadata.begin().await?;
        if let Some(existing) = &existing {
            tx.delete_artifact(existing.id).await?;
        } else if ownerships.is_empty() {
            tx.insert_ownership(&crate::model::Ownership {
                format: Format::Oci,
                name: repo.to_string(),
                user_id: principal.user_id,
                role: crate::model::OwnerRole::Owner,
                granted_at: now,
            })
            .await?;
        }
        if let Err(e) = tx.insert_artifact(&artifact).await {
            let _ = tx.rollback().await;
            return Err(e);
        }
        tx.commit().await?;

        Ok(digest)
    }

    /// `GET`/`HEAD /v2/{repo}/manifests/{reference}`.
    pub async fn get_manifest(&self, repo: &str, reference: &str) -> Result<(Artifact, ByteStream)> {
        let artifact = self
            .metadata
            .get_artifact(Format::Oci, repo, reference)
            .await?
            .ok_or(Error::NotFound)?;
        let body = self.blobs.get(&artifact.storage_path).await?;
        Ok((artifact, body))
    }

    /// `DELETE /v2/{repo}/manifests/{reference}`. Only the tag record is removed; the
    /// content-addressed blob is left in place since other tags or repos may reference
    /// the same digest (spec §4.4 "content-addressed layout enables deduplication").
    pub async fn delete_manifest(&self, repo: &str, reference: &str) -> Result<()> {
        let artifact = self
            .metadata
            .get_artifact(Format::Oci, repo, reference)
            .await?
            .ok_or(Error::NotFound)?;
        let mut tx = self.metadata.begin().await?;
        if let Err(e) = tx.delete_artifact(artifact.id).await {
            let _ = tx.rollback().await;
            return Err(e);
        }
        tx.commit().await
    }

    /// `GET /v2/{repo}/tags/list`.
    pub async fn list_tags(&self, repo: &str) -> Result<Vec<String>> {
        self.metadata.list_oci_tags(repo).await
    }

    /// `GET /v2/_catalog`.
    pub async fn list_repositories(&self) -> Result<Vec<String>> {
        self.metadata.list_oci_repositories().await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use lodestone_test_support::{InMemoryBlobStore, InMemoryMetadataStore};

    #[test]
    fn blob_path_is_content_addressed() {
        let digest = OciDigest::from_bytes(b"{}");
        assert!(digest.blob_path().starts_with("blobs/sha256/"));
    }

    fn service() -> OciManifestService {
        OciManifestService::new(
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(InMemoryMetadataStore::new()),
        )
    }

    fn principal() -> crate::model::Principal {
        crate::model::Principal {
            user_id: Uuid::new_v4(),
            username: "alice".into(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn pushing_latest_twice_replaces_rather_than_conflicts() {
        let svc = service();
        let ctx = RequestContext::new(Some(principal()));

        svc.put_manifest("alpine", "latest", "application/vnd.oci.image.manifest.v1+json", bytes::Bytes::from_static(b"{\"a\":1}"), &ctx)
            .await
            .unwrap();
        // A second push of the same tag with different bytes must succeed (replace, not
        // AlreadyExists) per spec §9 Open Question 4.
        let digest = svc
            .put_manifest("alpine", "latest", "application/vnd.oci.image.manifest.v1+json", bytes::Bytes::from_static(b"{\"a\":2}"), &ctx)
            .await
            .unwrap();

        let (artifact, body) = svc.get_manifest("alpine", "latest").await.unwrap();
        assert_eq!(artifact.sha256, digest.encoded());
        let bytes = crate::stream::collect(body).await.unwrap();
        assert_eq!(&bytes[..], b"{\"a\":2}");
    }

    #[tokio::test]
    async fn non_owner_cannot_push_an_existing_repo() {
        let svc = service();
        let alice = principal();
        let bob = principal();
        let ctx_alice = RequestContext::new(Some(alice));
        let ctx_bob = RequestContext::new(Some(bob));

        svc.put_manifest("alpine", "latest", "application/vnd.oci.image.manifest.v1+json", bytes::Bytes::from_static(b"{}"), &ctx_alice)
            .await
            .unwrap();
        let err = svc
            .put_manifest("alpine", "v2", "application/vnd.oci.image.manifest.v1+json", bytes::Bytes::from_static(b"{}"), &ctx_bob)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[tokio::test]
    async fn delete_manifest_removes_the_tag_not_the_blob() {
        let svc = service();
        let ctx = RequestContext::new(Some(principal()));
        svc.put_manifest("alpine", "latest", "application/vnd.oci.image.manifest.v1+json", bytes::Bytes::from_static(b"{}"), &ctx)
            .await
            .unwrap();

        svc.delete_manifest("alpine", "latest").await.unwrap();
        assert!(matches!(svc.get_manifest("alpine", "latest").await, Err(Error::NotFound)));
    }
}
