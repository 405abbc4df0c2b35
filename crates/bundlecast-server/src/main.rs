// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Bundlecast.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Bundlecast server - entry point
//!
//! Wires the repository and the core components together and serves the
//! OTA API. Configuration comes from `bundlecast.toml` and the
//! environment (`BUNDLECAST_PORT`/`PORT`, `BUNDLECAST_DB`).

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use bundlecast_core::{
    ReleasePublisher, ReleaseRepository, ReleaseResolver, ReleaseRollbackManager,
    SqliteReleaseRepository,
};
use bundlecast_server::config::{DEFAULT_CONFIG_PATH, ServerConfig};
use bundlecast_server::routes::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bundlecast_core=debug".parse()?)
                .add_directive("bundlecast_server=debug".parse()?),
        )
        .init();

    info!("Starting Bundlecast OTA server");

    let config = ServerConfig::load(DEFAULT_CONFIG_PATH)?;

    let uploads_dir = Path::new(&config.uploads.dir);
    if !uploads_dir.exists() {
        std::fs::create_dir_all(uploads_dir).with_context(|| {
            format!("Failed to create uploads directory: {}", uploads_dir.display())
        })?;
        info!("Created uploads directory: {}", uploads_dir.display());
    }

    let repo: Arc<dyn ReleaseRepository> = Arc::new(
        SqliteReleaseRepository::open(&config.database.path)
            .with_context(|| format!("Failed to open release store: {}", config.database.path))?,
    );
    info!("Release store ready at {}", config.database.path);

    let state = AppState {
        resolver: Arc::new(ReleaseResolver::new(Arc::clone(&repo))),
        publisher: Arc::new(ReleasePublisher::new(Arc::clone(&repo))),
        rollback: Arc::new(ReleaseRollbackManager::new(repo)),
        config: Arc::new(config.clone()),
    };

    let app = router(state);
    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("OTA server running on http://{addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
