//! S3-backed [`BlobStore`], generalized from `portfolio_objectstore::s3::S3` (teacher)
//! onto this crate's `(path, body) -> (size, sha256)` contract instead of
//! `portfolio_core::registry::BlobStore`'s digest-keyed, OCI-specific shape.
use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream as SdkByteStream;
use aws_sdk_s3::Client;
use futures::stream::{StreamExt, TryStreamExt};
use http::{StatusCode, Uri};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use lodestone_core::errors::Result as CoreResult;
use lodestone_core::ports::{BlobStore, ByteStream};

use crate::errors::{Error, Result};
use crate::path;

#[derive(Clone, Deserialize)]
pub struct S3Config {
    pub access_key: String,
    pub secret_key: String,
    pub hostname: String,
    pub bucket_name: String,
    pub region: String,
}

impl S3Config {
    pub async fn connect(&self) -> Result<S3BlobStore> {
        let scp = SharedCredentialsProvider::new(
            Credentials::new(
                self.access_key.clone(),
                self.secret_key.clone(),
                None,
                None,
                "lodestone",
            )
            .provide_credentials()
            .await?,
        );

        let uri = Uri::builder()
            .scheme("https")
            .authority(self.hostname.as_str())
            .path_and_query("/")
            .build()?;

        let sdk_config = aws_config::load_from_env().await;
        let config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .region(Region::new(self.region.clone()))
            .credentials_provider(scp)
            .endpoint_url(uri.to_string())
            .build();

        Ok(S3BlobStore {
            bucket_name: self.bucket_name.clone(),
            client: Client::from_conf(config),
        })
    }
}

#[derive(Clone)]
pub struct S3BlobStore {
    bucket_name: String,
    client: Client,
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, path_str: &str, mut body: ByteStream) -> CoreResult<(u64, String)> {
        path::validate(path_str).map_err(lodestone_core::Error::from)?;

        let mut hasher = Sha256::new();
        let mut total: u64 = 0;
        let mut buf = bytes::BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            total += chunk.len() as u64;
            buf.extend_from_slice(&chunk);
        }

        self.client
            .put_object()
            .key(path_str)
            .body(SdkByteStream::from(buf.freeze()))
            .content_length(total as i64)
            .bucket(&self.bucket_name)
            .send()
            .await
            .map_err(|e| lodestone_core::Error::from(Error::from(e)))?;

        Ok((total, format!("{:x}", hasher.finalize())))
    }

    async fn get(&self, path_str: &str) -> CoreResult<ByteStream> {
        self.get_range(path_str, 0).await
    }

    async fn get_range(&self, path_str: &str, offset: u64) -> CoreResult<ByteStream> {
        path::validate(path_str).map_err(lodestone_core::Error::from)?;

        let mut req = self.client.get_object().key(path_str).bucket(&self.bucket_name);
        if offset > 0 {
            req = req.range(format!("bytes={offset}-"));
        }

        let output = req.send().await.map_err(|e| match &e {
            SdkError::ServiceError(se) if se.raw().status() == StatusCode::NOT_FOUND => {
                lodestone_core::Error::NotFound
            }
            _ => lodestone_core::Error::from(Error::from(e)),
        })?;

        let stream = output
            .body
            .map_err(|e| lodestone_core::Error::from(Error::from(e)))
            .boxed();
        Ok(Box::pin(stream))
    }

    async fn exists(&self, path_str: &str) -> CoreResult<bool> {
        path::validate(path_str).map_err(lodestone_core::Error::from)?;
        match self
            .client
            .head_object()
            .key(path_str)
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(se)) if se.raw().status() == StatusCode::NOT_FOUND => {
                Ok(false)
            }
            Err(e) => Err(lodestone_core::Error::from(Error::from(e))),
        }
    }

    async fn delete(&self, path_str: &str) -> CoreResult<()> {
        path::validate(path_str).map_err(lodestone_core::Error::from)?;
        self.client
            .delete_object()
            .key(path_str)
            .bucket(&self.bucket_name)
            .send()
            .await
            .map_err(|e| lodestone_core::Error::from(Error::from(e)))?;
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> CoreResult<()> {
        path::validate(from).map_err(lodestone_core::Error::from)?;
        path::validate(to).map_err(lodestone_core::Error::from)?;

        self.client
            .copy_object()
            .copy_source(format!("{}/{}", self.bucket_name, from))
            .key(to)
            .bucket(&self.bucket_name)
            .send()
            .await
            .map_err(|e| lodestone_core::Error::from(Error::from(e)))?;

        self.delete(from).await
    }
}
