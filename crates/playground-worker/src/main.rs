// Playground worker
//
// Hosts the selected worker bootstraps on an in-process orchestrator and
// serves the HTTP facade over it until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use playground_api::{router, serve, AppState, ServerConfig};
use playground_core::{LocalOrchestrator, TaskRunner};
use playground_schemas::default_registry;
use playground_worker::{start_workers, AppContext, WorkerSelection};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "playground-worker", version, about = "Run playground workers")]
struct Args {
    /// Worker bootstrap(s) to host
    #[arg(long, value_enum, default_value_t = WorkerSelection::All, env = "PLAYGROUND_WORKER")]
    worker: WorkerSelection,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "playground_worker=info,playground_core=info,playground_api=info,tower_http=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(worker = ?args.worker, "playground-worker starting...");

    let ctx = AppContext::init().context("Failed to initialize application context")?;
    let orchestrator = LocalOrchestrator::new();

    let workers = start_workers(&ctx, &orchestrator, args.worker)
        .await
        .context("Failed to start workers")?;
    for worker in &workers {
        tracing::info!(
            worker = worker.name(),
            slots = worker.slots(),
            tasks = ?worker.task_names(),
            "Worker started"
        );
    }

    let registry = default_registry().context("Failed to build task schema registry")?;
    let runner = TaskRunner::new(Arc::new(orchestrator.clone()), Arc::new(registry));
    let config = ServerConfig::from_env()?;
    let app = router(AppState::new(runner), &config);

    let result = serve(app, &config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Received shutdown signal");
    })
    .await;

    orchestrator.shutdown().await;
    ctx.shutdown().await;
    tracing::info!("Worker shutdown complete");
    result
}
