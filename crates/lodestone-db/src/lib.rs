//! # Lodestone DB
//!
//! Postgres-backed [`lodestone_core::ports::MetadataStore`]. Queries are built with
//! `sea-query`/`sea-query-binder` and executed through `sqlx`, exactly as
//! `portfolio_backend_postgres`/`portfolio_postgres_s3` do for the OCI-only teacher
//! repo; this crate generalizes the same pattern across all nine formats' shared
//! `artifacts`/`package_ownerships`/`upload_sessions` tables (spec §3, §6 "Persisted
//! state layout"). Migrations are embedded via `sqlx::migrate!` and run at startup.
pub mod config;
pub mod errors;
pub mod rows;
pub mod schema;
pub mod store;

pub use config::PgConfig;
pub use store::PgMetadataStore;
