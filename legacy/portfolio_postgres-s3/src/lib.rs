mod blobs;
mod config;
mod errors;
mod manifests;
mod metadata;
mod objects;
mod repositories;

pub use config::PgS3RepositoryFactory;
pub use config::PgS3RepositoryConfig;
pub use repositories::PgS3Repository;
