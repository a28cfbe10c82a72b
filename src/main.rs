use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dispatch_lite::config::{DispatcherConfig, JobConfig, DEFAULT_CATEGORIES};
use dispatch_lite::dashboard::{run_dashboard, DashboardState};
use dispatch_lite::metrics::PrometheusSink;
use dispatch_lite::scheduler::{CategorySet, RandomJobSource};
use dispatch_lite::shutdown::install_shutdown_handler;
use dispatch_lite::Dispatcher;

#[derive(Parser, Debug)]
#[command(name = "dispatch-lite")]
#[command(version)]
#[command(about = "A bounded-concurrency job dispatcher with Prometheus metrics")]
struct Args {
    /// Number of workers to use
    #[arg(long, default_value = "10")]
    workers: usize,

    /// Port for the metrics endpoint
    #[arg(long, default_value = "9009")]
    metrics_port: u16,

    /// Number of jobs the work queue can hold
    #[arg(long, default_value = "10000")]
    queue_capacity: usize,

    /// Pause after each enqueued job, in milliseconds
    #[arg(long, default_value = "5")]
    pacing_ms: u64,

    /// Shortest simulated job duration, in milliseconds
    #[arg(long, default_value = "10")]
    min_duration_ms: u64,

    /// Longest simulated job duration, in milliseconds
    #[arg(long, default_value = "109")]
    max_duration_ms: u64,

    /// Job categories (comma-separated)
    #[arg(long, value_delimiter = ',')]
    categories: Vec<String>,

    /// How long to wait for workers on shutdown, in milliseconds
    #[arg(long, default_value = "5000")]
    shutdown_grace_ms: u64,
}

impl Args {
    fn dispatcher_config(&self) -> DispatcherConfig {
        let categories = if self.categories.is_empty() {
            DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
        } else {
            self.categories.clone()
        };

        DispatcherConfig {
            worker_count: self.workers,
            queue_capacity: self.queue_capacity,
            shutdown_grace_ms: self.shutdown_grace_ms,
            jobs: JobConfig {
                categories,
                min_duration_ms: self.min_duration_ms,
                max_duration_ms: self.max_duration_ms,
                pacing_ms: self.pacing_ms,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = args.dispatcher_config();
    config.validate()?;

    let metrics_addr: SocketAddr = format!("0.0.0.0:{}", args.metrics_port).parse()?;
    let categories = CategorySet::new(&config.jobs.categories)?;

    tracing::info!(
        workers = config.worker_count,
        queue_capacity = config.queue_capacity,
        categories = ?categories.iter().map(|c| &**c).collect::<Vec<_>>(),
        metrics_addr = %metrics_addr,
        "Starting dispatch-lite"
    );

    let shutdown = install_shutdown_handler();
    let sink = Arc::new(PrometheusSink::new()?);
    let source = RandomJobSource::from_config(&config.jobs)?;
    let dispatcher = Dispatcher::new(config.clone(), sink.clone())?;

    let dashboard_state = DashboardState {
        sink,
        queue: dispatcher.queue(),
        categories,
        worker_count: config.worker_count,
        started_at: chrono::Utc::now(),
    };
    let dashboard_shutdown = shutdown.clone();
    let dashboard = tokio::spawn(async move {
        let server_shutdown = dashboard_shutdown.clone();
        if let Err(e) = run_dashboard(metrics_addr, dashboard_state, server_shutdown).await {
            tracing::error!(error = %e, "Metrics server failed");
            dashboard_shutdown.cancel();
        }
    });

    let result = dispatcher.run(source, shutdown.clone()).await;

    // A fatal dispatcher error leaves the caller's token untouched; stop the
    // metrics server too.
    shutdown.cancel();
    if let Err(e) = dashboard.await {
        tracing::warn!(error = %e, "Metrics server task ended abnormally");
    }

    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}
