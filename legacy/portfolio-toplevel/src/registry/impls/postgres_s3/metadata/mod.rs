mod postgres;
pub use postgres::{PostgresConfig, PostgresMetadataPool, PostgresMetadataTx};

mod types;
pub use types::{
    Blob, Blobs, IndexManifests, Layers, Manifest, Manifests, Repositories, Repository, Tag, Tags,
};
