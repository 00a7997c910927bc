//! Deserializable blob backend selection (SPEC_FULL §6, Open Question "Blob backend
//! choice"), mirroring `portfolio_objectstore::config::Config`'s tagged-enum shape.
use std::sync::Arc;

use serde::Deserialize;

use lodestone_core::ports::BlobStore;

use crate::errors::Result;
use crate::local::LocalBlobStore;
use crate::s3::S3Config;

#[derive(Clone, Deserialize)]
#[serde(tag = "backend")]
pub enum Config {
    #[serde(rename = "local")]
    Local { root: String },
    #[serde(rename = "s3")]
    S3(S3Config),
}

impl Config {
    pub async fn build(&self) -> Result<Arc<dyn BlobStore>> {
        match self {
            Config::Local { root } => Ok(Arc::new(LocalBlobStore::new(root))),
            Config::S3(cfg) => Ok(Arc::new(cfg.connect().await?)),
        }
    }
}
