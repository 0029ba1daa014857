use anyhow::{Context, Result};
use clap::Parser;
use sign_gesture::{config::Config, web::serve};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sign-gesture")]
#[command(about = "Sign language gesture recognition service")]
struct Args {
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Enable debug mode (verbose logs, longer timeouts)
    #[arg(long)]
    debug: bool,

    /// Model directory path
    #[arg(long, default_value = "models")]
    models_dir: String,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Minimum hand presence score for a detection to count
    #[arg(long, default_value_t = 0.5)]
    min_detection_confidence: f32,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { args.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = Config::new(
        &args.host,
        args.port,
        args.models_dir,
        args.workers,
        args.debug,
        args.min_detection_confidence,
    )?;

    tracing::info!("Starting sign gesture service...");
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Models directory: {}", config.models_dir.display());
    tracing::info!("Worker threads: {}", config.workers);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(serve(config))?;

    Ok(())
}
