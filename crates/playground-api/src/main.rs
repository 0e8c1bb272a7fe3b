// Playground API server
//
// Serves the HTTP facade over the hosted platform. Configuration comes from
// the environment (see HatchetConfig and ServerConfig); `.env` is loaded first.

use anyhow::{Context, Result};
use playground_api::{router, serve, AppState, ServerConfig};
use playground_core::TaskRunner;
use playground_hatchet::{HatchetClient, HatchetConfig};
use playground_schemas::default_registry;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playground_api=info,playground_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let hatchet = HatchetConfig::from_env().context("Invalid Hatchet configuration")?;
    tracing::info!(server_url = %hatchet.server_url, tenant_id = %hatchet.tenant_id, "Using Hatchet API");

    let registry = default_registry().context("Failed to build task schema registry")?;
    let runner = TaskRunner::new(Arc::new(HatchetClient::new(hatchet)), Arc::new(registry));

    let config = ServerConfig::from_env()?;
    let app = router(AppState::new(runner), &config);

    serve(app, &config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Received shutdown signal");
    })
    .await
}
