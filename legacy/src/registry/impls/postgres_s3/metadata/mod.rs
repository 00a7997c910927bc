mod postgres;
pub use postgres::{PostgresConfig, PostgresMetadataPool, PostgresMetadataTx};

mod traits;

mod types;
pub use types::{Blobs, IndexManifests, Layers, Manifests, Repositories, Tags};
