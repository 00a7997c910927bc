//! Local-filesystem [`BlobStore`], the default backend for development and single-node
//! deployments. The teacher repo's own history only ever shipped an S3 backend; this
//! implementation follows the same streaming contract as [`crate::s3::S3BlobStore`] but
//! reads/writes through `tokio::fs`, which is the idiomatic choice the rest of this
//! example pack reaches for when a filesystem-backed store is needed (see DESIGN.md).
use std::path::PathBuf;

use async_trait::async_trait;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use lodestone_core::errors::Result as CoreResult;
use lodestone_core::ports::{BlobStore, ByteStream};

use crate::errors::{Error, Result};
use crate::path;

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(path::validate(key)?))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, mut body: ByteStream) -> CoreResult<(u64, String)> {
        let full = self.resolve(path).map_err(lodestone_core::Error::from)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| lodestone_core::Error::from(Error::from(e)))?;
        }

        let mut file = tokio::fs::File::create(&full)
            .await
            .map_err(|e| lodestone_core::Error::from(Error::from(e)))?;

        let mut hasher = Sha256::new();
        let mut total: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            total += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| lodestone_core::Error::from(Error::from(e)))?;
        }
        file.flush()
            .await
            .map_err(|e| lodestone_core::Error::from(Error::from(e)))?;

        Ok((total, format!("{:x}", hasher.finalize())))
    }

    async fn get(&self, path: &str) -> CoreResult<ByteStream> {
        self.get_range(path, 0).await
    }

    async fn get_range(&self, path: &str, offset: u64) -> CoreResult<ByteStream> {
        use tokio::io::AsyncSeekExt;

        let full = self.resolve(path).map_err(lodestone_core::Error::from)?;
        let mut file = tokio::fs::File::open(&full).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                lodestone_core::Error::NotFound
            } else {
                lodestone_core::Error::from(Error::from(e))
            }
        })?;
        if offset > 0 {
            file.seek(std::io::SeekFrom::Start(offset))
                .await
                .map_err(|e| lodestone_core::Error::from(Error::from(e)))?;
        }

        let stream = file_read_stream(file);
        Ok(Box::pin(stream))
    }

    async fn exists(&self, path: &str) -> CoreResult<bool> {
        let full = self.resolve(path).map_err(lodestone_core::Error::from)?;
        Ok(tokio::fs::try_exists(&full)
            .await
            .map_err(|e| lodestone_core::Error::from(Error::from(e)))?)
    }

    async fn delete(&self, path: &str) -> CoreResult<()> {
        let full = self.resolve(path).map_err(lodestone_core::Error::from)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(lodestone_core::Error::from(Error::from(e))),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> CoreResult<()> {
        let from_full = self.resolve(from).map_err(lodestone_core::Error::from)?;
        let to_full = self.resolve(to).map_err(lodestone_core::Error::from)?;
        if let Some(parent) = to_full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| lodestone_core::Error::from(Error::from(e)))?;
        }
        match tokio::fs::rename(&from_full, &to_full).await {
            Ok(()) => Ok(()),
            Err(_) => {
                // Cross-device rename: fall back to copy+delete (spec §4.2 permits either).
                tokio::fs::copy(&from_full, &to_full)
                    .await
                    .map_err(|e| lodestone_core::Error::from(Error::from(e)))?;
                tokio::fs::remove_file(&from_full)
                    .await
                    .map_err(|e| lodestone_core::Error::from(Error::from(e)))?;
                Ok(())
            }
        }
    }
}

fn file_read_stream(
    file: tokio::fs::File,
) -> impl futures_core::Stream<Item = CoreResult<bytes::Bytes>> + Send + 'static {
    tokio_stream::wrappers::ReceiverStream::new({
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tokio::spawn(async move {
            let mut file = file;
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                use tokio::io::AsyncReadExt;
                match file.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx
                            .send(Ok(bytes::Bytes::copy_from_slice(&buf[..n])))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(lodestone_core::Error::from(Error::from(e))))
                            .await;
                        break;
                    }
                }
            }
        });
        rx
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use lodestone_core::stream;

    #[tokio::test]
    async fn put_then_get_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let body = stream::once(bytes::Bytes::from_static(b"hello"));
        let (size, sha) = store.put("a/b/c", body).await.unwrap();
        assert_eq!(size, 5);
        assert_eq!(sha.len(), 64);

        let mut got = store.get("a/b/c").await.unwrap();
        let mut collected = Vec::new();
        while let Some(chunk) = got.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"hello");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        store.delete("never/existed").await.unwrap();
    }

    #[tokio::test]
    async fn exists_reflects_puts_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert!(!store.exists("x").await.unwrap());
        store
            .put("x", stream::once(bytes::Bytes::from_static(b"y")))
            .await
            .unwrap();
        assert!(store.exists("x").await.unwrap());
        store.delete("x").await.unwrap();
        assert!(!store.exists("x").await.unwrap());
    }

    #[tokio::test]
    async fn rename_promotes_tmp_blob_to_permanent_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        store
            .put("tmp/session", stream::once(bytes::Bytes::from_static(b"z")))
            .await
            .unwrap();
        store.rename("tmp/session", "blobs/sha256/ab/abc").await.unwrap();
        assert!(!store.exists("tmp/session").await.unwrap());
        assert!(store.exists("blobs/sha256/ab/abc").await.unwrap());
    }
}
