//! B3 Trading Hours Service
//!
//! ```text
//! ┌──────────────┐      ┌──────────────────┐      ┌──────────────┐
//! │  API server  │─────▶│   HoursService   │─────▶│    Redis     │
//! │   (:8000)    │      │ resolver + cache │      │              │
//! └──────────────┘      └──────────────────┘      └──────────────┘
//! ┌──────────────┐               │
//! │Metrics server│◀──────────────┘
//! │   (:9090)    │
//! └──────────────┘
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use b3hours::api;
use b3hours::config::Settings;
use b3hours::error::Result;
use b3hours::service::HoursService;

// =============================================================================
// CLI Arguments
// =============================================================================

/// B3 Trading Hours API - trading hours from Redis with a fallback cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    settings: Settings,

    /// API server bind address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8000")]
    api_addr: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:9090")]
    metrics_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting B3 Trading Hours API v{}", env!("CARGO_PKG_VERSION"));
    info!("  Redis URL: {}", args.settings.redis_url);
    info!(
        "  Keys: open={} close={}",
        args.settings.redis_key_open, args.settings.redis_key_close
    );
    info!("  Cache TTL: {}s", args.settings.cache_ttl_seconds);
    info!("  Timezone: {}", args.settings.timezone);

    let config = args.settings.clone().into_config().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    // Never fails on an unreachable Redis
    let service = Arc::new(HoursService::connect(config).await?);

    let api_listener = api::bind(&args.api_addr).await?;
    let metrics_listener = api::bind(&args.metrics_addr).await?;

    let shutdown = CancellationToken::new();

    let api_task = tokio::spawn(api::serve_api(
        api_listener,
        service.clone(),
        shutdown.clone(),
    ));
    let metrics_task = tokio::spawn(api::serve_metrics(
        metrics_listener,
        service.metrics().clone(),
        shutdown.clone(),
    ));

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
    shutdown.cancel();

    for (name, task) in [("API", api_task), ("Metrics", metrics_task)] {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("{} server error: {}", name, e),
            Err(e) => error!("{} server task failed: {}", name, e),
        }
    }

    info!("Shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "redis=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
