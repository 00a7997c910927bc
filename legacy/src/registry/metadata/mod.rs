mod postgres;
pub use postgres::PostgresConfig;
pub use postgres::PostgresMetadata;

mod traits;

mod types;
pub use types::{Blob, ImageManifest, ManifestRef, Registry, Repository};

