//! Test doubles and fixtures shared by every crate's test suite: in-memory
//! `BlobStore`/`MetadataStore`/`PrincipalResolver` implementations ([`fakes`]), OCI
//! image/index builders ([`oci`], grounded on `legacy/oci-distribution-test`), and
//! synthetic container bytes for the eight direct-artifact formats ([`fixtures`]).
//!
//! Mirrors `legacy/oci-distribution-test`'s role in the teacher's own workspace — a
//! dev-dependency-only crate that no production binary links against.
pub mod errors;
pub mod fakes;
pub mod fixtures;
pub mod oci;

pub use fakes::{InMemoryBlobStore, InMemoryMetadataStore, StaticPrincipalResolver};
