use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use lodestone_core::model::Principal;
use lodestone_core::oci_manifest::OciManifestService;
use lodestone_core::oci_session::OciSessionManager;
use lodestone_core::registry::RegistryCoreService;
use lodestone_http::AppState;

mod config;
mod static_principal;

use crate::config::{Config, PrincipalConfig};
use crate::static_principal::StaticPrincipalResolver;

#[derive(Parser)]
struct Cli {
    #[arg(short, long)]
    config_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .compact()
        .init();

    tracing::info!("info enabled");
    tracing::warn!("warning enabled");
    tracing::debug!("debug enabled");
    tracing::trace!("trace enabled");

    // load configuration
    let mut config_file = File::open(cli.config_file.unwrap_or_else(|| "./dev-config.yml".into()))?;
    let mut s = String::new();
    config_file.read_to_string(&mut s)?;
    let config: Config = serde_yaml::from_str(&s)?;

    // initialize persistence layer
    let metadata = Arc::new(config.db.connect().await?);
    let blobs = config.storage.build().await?;

    let principal = match config.principal {
        PrincipalConfig::Admin { user_id, username } => Principal::admin(user_id, username),
        PrincipalConfig::User {
            user_id,
            username,
            is_admin,
        } => Principal {
            user_id,
            username,
            is_admin,
        },
    };
    let principals = Arc::new(StaticPrincipalResolver::new(principal));

    let adapters = lodestone_formats::build_adapter_registry();
    let registry = RegistryCoreService::new(adapters, blobs.clone(), metadata.clone());
    let oci_sessions = OciSessionManager::new(
        blobs.clone(),
        metadata.clone(),
        config.oci_session_idle_threshold_secs,
    );
    let oci_manifests = OciManifestService::new(blobs.clone(), metadata.clone());

    let state = AppState::new(
        registry,
        oci_sessions,
        oci_manifests,
        blobs,
        principals,
        config.base_url,
    );

    // periodically sweep abandoned OCI upload sessions (SPEC_FULL §4 "OCI session GC
    // sweep") so a client that starts a chunked push and disappears doesn't leak blobs.
    let gc_state = state.clone();
    let gc_interval = Duration::from_secs(config.oci_session_gc_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(gc_interval);
        loop {
            ticker.tick().await;
            match gc_state.oci_sessions.gc().await {
                Ok(count) if count > 0 => tracing::info!(count, "swept abandoned OCI upload sessions"),
                Ok(_) => {}
                Err(err) => tracing::warn!(%err, "OCI session GC sweep failed"),
            }
        }
    });

    let router = lodestone_http::router().with_state(state);

    // run HTTP server
    axum::Server::bind(&config.bind_address.parse()?)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}
