mod postgres;
pub use postgres::{PostgresConfig, PostgresMetadataPool, PostgresMetadataTx};

mod types;
pub use types::{
    Blob, Blobs, Chunk, Chunks, IndexManifests, Layers, Manifest, Manifests, Repositories,
    Repository, Tag, Tags, UploadSession, UploadSessions,
};
