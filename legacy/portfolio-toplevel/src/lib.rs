mod config;
pub use config::{Config, RepositoryBackend, RepositoryDefinition};

pub mod errors;
pub use errors::{DistributionErrorCode, Error, Result};

pub mod http;

mod oci_digest;
pub(crate) use oci_digest::DigestState;
pub use oci_digest::{Digester, OciDigest};

mod sha256;
mod sha512;

pub mod registry;

mod portfolio;
pub use portfolio::Portfolio;
