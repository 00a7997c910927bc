//! Deserializable Postgres connection config, mirroring
//! `portfolio_postgres_s3::metadata::postgres::PostgresConfig`.
use serde::Deserialize;

use crate::errors::Result;
use crate::store::PgMetadataStore;

#[derive(Clone, Deserialize)]
pub struct PgConfig {
    pub connection_string: String,
}

impl PgConfig {
    /// Connects and runs embedded migrations, so a freshly-provisioned database is
    /// ready to serve on first boot.
    pub async fn connect(&self) -> Result<PgMetadataStore> {
        let store = PgMetadataStore::connect(&self.connection_string).await?;
        store.migrate().await?;
        Ok(store)
    }
}
