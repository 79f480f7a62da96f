//! Storm-surge worker service.
//!
//! `surge-worker submit <request.json>` validates a request, stores a pending
//! job and queues it. `surge-worker run` consumes the queue.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use storage::{Catalog, JobQueue, SurgeStore};
use surge_common::track::SurgeRequest;
use surge_worker::{submit, SurgePipeline, Worker, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "surge-worker")]
#[command(about = "Storm-surge model job worker")]
struct Args {
    /// YAML configuration file (environment variables are used when omitted)
    #[arg(short, long, env = "SURGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Consume jobs from the queue
    Run {
        /// Process a single job and exit
        #[arg(long)]
        once: bool,
    },
    /// Submit a request JSON file as a new job
    Submit {
        /// Path to the request body
        request: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG wins over --log-level when set
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => WorkerConfig::from_yaml(path)?,
        None => WorkerConfig::from_env()?,
    };
    info!(
        model_root = %config.model.root.display(),
        max_jobs = config.max_concurrent_jobs,
        levels = ?config.coverage.levels,
        "Loaded configuration"
    );

    let catalog = Catalog::connect(&config.database_url).await?;
    catalog.migrate().await?;
    let store: Arc<dyn SurgeStore> = Arc::new(catalog);
    let mut queue = JobQueue::connect(&config.redis_url).await?;

    match args.command {
        Command::Submit { request } => {
            let body = std::fs::read_to_string(&request)
                .with_context(|| format!("Failed to read request {}", request.display()))?;
            let request: SurgeRequest = serde_json::from_str(&body).context("Invalid request JSON")?;
            let job_id = submit(store.as_ref(), &mut queue, request).await?;
            println!("{}", job_id);
        }
        Command::Run { once } => {
            if let Some(addr) = &config.metrics_addr {
                let addr: SocketAddr = addr.parse().context("Invalid metrics_addr")?;
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .with_http_listener(addr)
                    .install()?;
                info!(%addr, "Prometheus metrics exporter initialized");
            }

            let pipeline = SurgePipeline::new(store, &config)?;
            let mut worker = Worker::new(queue, pipeline, &config);

            let cancel = CancellationToken::new();
            let shutdown = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling");
                    shutdown.cancel();
                }
            });

            if once {
                match worker.run_once(cancel).await? {
                    Some(outcome) => info!(status = %outcome.status, "Single job finished"),
                    None => info!("No job processed"),
                }
            } else {
                worker.run_forever(cancel).await?;
            }
        }
    }

    Ok(())
}
