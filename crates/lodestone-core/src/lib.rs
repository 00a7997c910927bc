//! # Lodestone Core
//!
//! `lodestone_core` provides the format-agnostic heart of the registry: the unified data
//! model (spec §3), the port traits the rest of the workspace implements
//! ([`ports::BlobStore`], [`ports::MetadataStore`], [`ports::PrincipalResolver`]), the
//! `FormatAdapter` trait and registry ([`adapter`]) that the ecosystem adapters in
//! `lodestone_formats` plug into, and the services that orchestrate them:
//! [`registry::RegistryCoreService`], [`oci_session::OciSessionManager`], and
//! [`oci_manifest::OciManifestService`] (OCI's manifest/tag operations are stateless and
//! bypass the generic adapter dispatch, spec §4.2).
//!
//! Nothing in this crate knows about HTTP, Postgres, S3, or any specific ecosystem wire
//! format — those live in `lodestone_http`, `lodestone_db`, `lodestone_storage`, and
//! `lodestone_formats` respectively.
pub mod adapter;
pub mod digest;
pub mod errors;
pub mod model;
pub mod oci_manifest;
pub mod oci_session;
pub mod ports;
pub mod registry;
pub mod stream;

pub use errors::{Error, Result};
pub use oci_manifest::OciManifestService;
pub use registry::{RegistryCoreService, RequestContext};
