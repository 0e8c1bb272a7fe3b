// Playground CLI
//
// Triggers one task and follows it to a terminal status, by polling or by
// streaming its events. Runs go to the hosted platform by default, or to an
// in-process orchestrator hosting both worker bootstraps with `--local`.
//
// Exit codes: 0 on completion (any terminal status) or `--list-tasks`,
// 2 on usage errors, 1 on runtime errors.

mod output;

use anyhow::{Context, Result};
use clap::Parser;
use playground_core::{
    positive_duration, LocalOrchestrator, OrchestrationClient, Payload, RunOptions, TaskRunner,
    WaitMode,
};
use playground_hatchet::{HatchetClient, HatchetConfig};
use playground_schemas::default_registry;
use playground_worker::{start_workers, AppContext, WorkerSelection};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "playground")]
#[command(about = "Trigger a playground task and wait for its result")]
#[command(version)]
pub struct Cli {
    /// Task to run
    #[arg(long, required_unless_present = "list_tasks")]
    pub task_name: Option<String>,

    /// Task input as a JSON object
    #[arg(long, default_value = "{}", value_parser = parse_payload)]
    pub input_json: Payload,

    /// Follow the run's event stream instead of polling
    #[arg(long)]
    pub stream: bool,

    /// Print registered task names and exit
    #[arg(long)]
    pub list_tasks: bool,

    /// Seconds between status queries
    #[arg(long, default_value = "1.0", value_parser = parse_seconds)]
    pub poll_interval: Duration,

    /// Give up waiting after this many seconds
    #[arg(long, value_parser = parse_seconds)]
    pub timeout: Option<Duration>,

    /// Run tasks in-process instead of on the hosted platform
    #[arg(long)]
    pub local: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

fn parse_payload(raw: &str) -> Result<Payload, String> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", other)),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("invalid number of seconds: {}", e))?;
    positive_duration(secs, "value").map_err(|e| e.to_string())
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            mode: if self.stream {
                WaitMode::Stream
            } else {
                WaitMode::Poll
            },
            poll_interval: self.poll_interval,
            timeout: self.timeout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the result
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playground=info,playground_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let registry = Arc::new(default_registry().context("Failed to build task schema registry")?);

    if cli.list_tasks {
        println!("{}", cli.output.render_task_list(&registry.task_names())?);
        return Ok(());
    }

    let task_name = cli
        .task_name
        .clone()
        .context("--task-name is required")?;

    if cli.local {
        let ctx = AppContext::init().context("Failed to initialize application context")?;
        let orchestrator = LocalOrchestrator::new();
        start_workers(&ctx, &orchestrator, WorkerSelection::All)
            .await
            .context("Failed to start local workers")?;

        let result = run_task(&cli, &task_name, Arc::new(orchestrator.clone()), registry).await;

        orchestrator.shutdown().await;
        ctx.shutdown().await;
        return result;
    }

    let config = HatchetConfig::from_env().context("Invalid Hatchet configuration")?;
    run_task(&cli, &task_name, Arc::new(HatchetClient::new(config)), registry).await
}

async fn run_task(
    cli: &Cli,
    task_name: &str,
    client: Arc<dyn OrchestrationClient>,
    registry: Arc<playground_core::SchemaRegistry>,
) -> Result<()> {
    let runner = TaskRunner::new(client, registry);
    let outcome = runner
        .run(task_name, &cli.input_json, cli.run_options())
        .await
        .with_context(|| format!("Failed to run task '{}'", task_name))?;

    println!("{}", cli.output.render_outcome(&outcome)?);
    Ok(())
}
