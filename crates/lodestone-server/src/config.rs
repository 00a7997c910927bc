//! Deserializable top-level server configuration, mirroring `portfolio`'s own
//! `config.rs`: one YAML document loaded at startup selects the storage backend,
//! database connection, and (since token issuance is out of scope, SPEC_FULL §6)
//! which static principal every authenticated request resolves to.
use serde::Deserialize;
use uuid::Uuid;

use lodestone_db::PgConfig;
use lodestone_storage::config::Config as StorageConfig;

#[derive(Clone, Deserialize)]
pub struct Config {
    pub bind_address: String,
    pub base_url: String,
    pub db: PgConfig,
    pub storage: StorageConfig,
    pub principal: PrincipalConfig,
    #[serde(default = "default_oci_session_idle_threshold_secs")]
    pub oci_session_idle_threshold_secs: i64,
    #[serde(default = "default_oci_session_gc_interval_secs")]
    pub oci_session_gc_interval_secs: u64,
}

fn default_oci_session_idle_threshold_secs() -> i64 {
    3600
}

fn default_oci_session_gc_interval_secs() -> u64 {
    300
}

/// Backs [`lodestone_core::ports::PrincipalResolver`] with a single fixed identity
/// rather than real credential validation (SPEC_FULL §6 "Principal resolution
/// transport" — out of scope per spec §1).
#[derive(Clone, Deserialize)]
#[serde(tag = "mode")]
pub enum PrincipalConfig {
    #[serde(rename = "admin")]
    Admin { user_id: Uuid, username: String },
    #[serde(rename = "user")]
    User {
        user_id: Uuid,
        username: String,
        #[serde(default)]
        is_admin: bool,
    },
}
