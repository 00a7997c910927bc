//! The OCI Session Manager (spec §4.2): resumable chunked blob uploads. Sessions live in
//! an in-memory sharded lock map keyed by session id (spec §9 "Per-session locking") and
//! are mirrored to the metadata store so a server restart does not lose an in-flight push.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::digest::OciDigest;
use crate::errors::{Error, Result};
use crate::ports::{BlobStore, ByteStream, MetadataStore};
use crate::model::UploadSession;

const SESSION_SHARDS: usize = 16;

fn shard_of(id: Uuid) -> usize {
    (id.as_u128() as usize) % SESSION_SHARDS
}

/// Sharded `session-id -> lock` map (spec §9). A short-lived lock on the shard itself
/// guards lookup/insert/remove; the returned guard is then held across the whole
/// PATCH/PUT body stream, which is acceptable because sessions are never operated on
/// concurrently by more than one client per the protocol.
struct SessionLocks {
    shards: Vec<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SessionLocks {
    fn new() -> Self {
        Self {
            shards: (0..SESSION_SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn lock_for(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut shard = self.shards[shard_of(id)].lock().expect("session lock shard poisoned");
        shard.entry(id).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))).clone()
    }

    fn remove(&self, id: Uuid) {
        let mut shard = self.shards[shard_of(id)].lock().expect("session lock shard poisoned");
        shard.remove(&id);
    }
}

pub struct OciSessionManager {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    locks: SessionLocks,
    idle_threshold_secs: i64,
}

impl OciSessionManager {
    pub fn new(blobs: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>, idle_threshold_secs: i64) -> Self {
        Self {
            blobs,
            metadata,
            locks: SessionLocks::new(),
            idle_threshold_secs,
        }
    }

    fn tmp_path(id: Uuid) -> String {
        format!("tmp/{id}")
    }

    /// `StartUpload(repo, userId) -> session` (spec §4.2).
    pub async fn start_upload(&self, repo: &str, user_id: Uuid) -> Result<UploadSession> {
        let now = Utc::now();
        let session = UploadSession {
            id: Uuid::new_v4(),
            repository: repo.to_string(),
            owner: user_id,
            size: 0,
            tmp_path: Self::tmp_path(Uuid::new_v4()),
            created_at: now,
            last_activity_at: now,
        };
        // tmp_path embeds a fresh uuid rather than the session id so a lingering blob
        // from a cancelled session can never collide with a reused session id.
        self.blobs.put(&session.tmp_path, crate::stream::once(bytes::Bytes::new())).await?;
        self.metadata.insert_upload_session(&session).await?;
        Ok(session)
    }

    /// `AppendChunk(sessionId, stream, contentRange?) -> session` (spec §4.2).
    pub async fn append_chunk(
        &self,
        session_id: Uuid,
        content_range_start: Option<u64>,
        chunk: ByteStream,
    ) -> Result<UploadSession> {
        let lock = self.locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let mut session = self
            .metadata
            .get_upload_session(session_id)
            .await?
            .ok_or(Error::NotFound)?;

        if let Some(start) = content_range_start {
            if start != session.size as u64 {
                return Err(Error::RangeNotSatisfiable);
            }
        }

        let existing = self.blobs.get(&session.tmp_path).await?;
        let appended = AppendStream::new(existing, chunk);
        let new_path = format!("{}.next", session.tmp_path);
        let (total_size, _digest) = self.blobs.put(&new_path, Box::pin(appended)).await?;
        self.blobs.rename(&new_path, &session.tmp_path).await?;

        session.size = total_size as i64;
        session.last_activity_at = Utc::now();
        self.metadata.update_upload_session(&session).await?;
        Ok(session)
    }

    /// `Status(sessionId) -> session` (spec §4.2), backing the `Range` response header.
    pub async fn status(&self, session_id: Uuid) -> Result<UploadSession> {
        self.metadata
            .get_upload_session(session_id)
            .await?
            .ok_or(Error::NotFound)
    }

    /// `Complete(sessionId, expectedDigest) -> (session, permanentPath)` (spec §4.2).
    ///
    /// The running digest is not persisted on every PATCH (spec §4.2 allows either);
    /// instead the tmp blob is rehashed here, which the spec calls "simpler" and is the
    /// approach taken throughout this implementation.
    pub async fn complete(
        &self,
        session_id: Uuid,
        expected_digest: &OciDigest,
    ) -> Result<(UploadSession, String)> {
        let lock = self.locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let session = self
            .metadata
            .get_upload_session(session_id)
            .await?
            .ok_or(Error::NotFound)?;

        let body = self.blobs.get(&session.tmp_path).await?;
        let computed = rehash(body).await?;

        if &computed != expected_digest {
            self.blobs.delete(&session.tmp_path).await.ok();
            self.metadata.delete_upload_session(session_id).await.ok();
            self.locks.remove(session_id);
            return Err(Error::DigestMismatch {
                expected: expected_digest.to_string(),
                computed: computed.to_string(),
            });
        }

        let permanent_path = expected_digest.blob_path();
        self.blobs.rename(&session.tmp_path, &permanent_path).await?;
        self.metadata.delete_upload_session(session_id).await?;
        self.locks.remove(session_id);

        Ok((session, permanent_path))
    }

    /// `Cancel(sessionId)` (spec §4.2): never errors on unknown session.
    pub async fn cancel(&self, session_id: Uuid) -> Result<()> {
        let lock = self.locks.lock_for(session_id);
        let _guard = lock.lock().await;

        if let Some(session) = self.metadata.get_upload_session(session_id).await? {
            self.blobs.delete(&session.tmp_path).await.ok();
            self.metadata.delete_upload_session(session_id).await.ok();
        }
        self.locks.remove(session_id);
        Ok(())
    }

    /// `GC` (spec §4.2): a background sweep removes sessions idle past the configured
    /// threshold. tmp blob is deleted before the metadata row, so a crash mid-sweep
    /// leaves at worst an orphan tmp blob, never a dangling session that points at a
    /// blob no longer there.
    pub async fn gc(&self) -> Result<usize> {
        let expired = self
            .metadata
            .list_expired_upload_sessions(self.idle_threshold_secs)
            .await?;
        let count = expired.len();
        for session in expired {
            self.blobs.delete(&session.tmp_path).await.ok();
            self.metadata.delete_upload_session(session.id).await.ok();
            self.locks.remove(session.id);
        }
        Ok(count)
    }
}

async fn rehash(mut body: ByteStream) -> Result<OciDigest> {
    use futures::StreamExt;
    use sha2::{Digest as _, Sha256};

    let mut hasher = Sha256::new();
    while let Some(chunk) = body.next().await {
        hasher.update(chunk?.as_ref());
    }
    let encoded = format!("{:x}", hasher.finalize());
    OciDigest::try_from(format!("sha256:{encoded}").as_str()).map_err(Error::from)
}

/// Concatenates an existing tmp blob stream with a freshly-arrived chunk, used by
/// `append_chunk` to produce the next tmp blob generation without buffering either
/// stream fully in memory.
struct AppendStream {
    first: Option<ByteStream>,
    second: ByteStream,
}

impl AppendStream {
    fn new(first: ByteStream, second: ByteStream) -> Self {
        Self {
            first: Some(first),
            second,
        }
    }
}

impl futures_core::Stream for AppendStream {
    type Item = Result<bytes::Bytes>;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        let this = self.get_mut();
        if let Some(first) = this.first.as_mut() {
            match first.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => return Poll::Ready(Some(item)),
                Poll::Ready(None) => {
                    this.first = None;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
        this.second.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use lodestone_test_support::{InMemoryBlobStore, InMemoryMetadataStore};

    #[test]
    fn shard_of_is_stable_and_bounded() {
        let id = Uuid::new_v4();
        let a = shard_of(id);
        let b = shard_of(id);
        assert_eq!(a, b);
        assert!(a < SESSION_SHARDS);
    }

    fn manager() -> OciSessionManager {
        OciSessionManager::new(
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(InMemoryMetadataStore::new()),
            86400,
        )
    }

    fn chunk(bytes: &'static [u8]) -> ByteStream {
        crate::stream::once(bytes::Bytes::from(bytes))
    }

    #[tokio::test]
    async fn start_append_complete_round_trips_blob_by_digest() {
        let mgr = manager();
        let session = mgr.start_upload("alpine", Uuid::new_v4()).await.unwrap();

        let session = mgr.append_chunk(session.id, Some(0), chunk(b"hello world")).await.unwrap();
        assert_eq!(session.size, 11);

        let digest = OciDigest::from_bytes(b"hello world");
        let (_session, permanent_path) = mgr.complete(session.id, &digest).await.unwrap();
        assert_eq!(permanent_path, digest.blob_path());

        // Completion removes the session; subsequent ops report NotFound (state machine's
        // Terminal state, spec §4.5).
        assert!(matches!(mgr.status(session.id).await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn mismatched_content_range_is_rejected() {
        let mgr = manager();
        let session = mgr.start_upload("alpine", Uuid::new_v4()).await.unwrap();
        let err = mgr
            .append_chunk(session.id, Some(5), chunk(b"late"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RangeNotSatisfiable));
    }

    #[tokio::test]
    async fn digest_mismatch_destroys_the_session() {
        let mgr = manager();
        let session = mgr.start_upload("alpine", Uuid::new_v4()).await.unwrap();
        let session = mgr.append_chunk(session.id, Some(0), chunk(b"hello world")).await.unwrap();

        let wrong = OciDigest::from_bytes(b"not the right bytes");
        let err = mgr.complete(session.id, &wrong).await.unwrap_err();
        assert!(matches!(err, Error::DigestMismatch { .. }));
        assert!(matches!(mgr.status(session.id).await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn cancel_is_idempotent_on_unknown_session() {
        let mgr = manager();
        mgr.cancel(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn gc_sweeps_only_idle_sessions() {
        let mgr = OciSessionManager::new(
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(InMemoryMetadataStore::new()),
            0,
        );
        mgr.start_upload("alpine", Uuid::new_v4()).await.unwrap();
        mgr.start_upload("alpine", Uuid::new_v4()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let swept = mgr.gc().await.unwrap();
        assert_eq!(swept, 2);
    }
}
