//! # Lodestone Storage
//!
//! Implements [`lodestone_core::ports::BlobStore`] against two backends: a local
//! filesystem store (default for development) and S3 (`aws-sdk-s3`), selected at startup
//! via [`config::Config`]. Mirrors `portfolio_objectstore`'s crate shape.
pub mod config;
pub mod errors;
pub mod local;
pub mod path;
pub mod s3;

pub use local::LocalBlobStore;
pub use s3::{S3BlobStore, S3Config};
