//! Main entry point for the scrim-queue service
//!
//! Initializes logging and configuration, then runs the queue service until
//! a shutdown signal arrives.

use anyhow::Result;
use clap::Parser;
use scrim_queue::config::AppConfig;
use scrim_queue::service::{AppState, HealthCheck, HealthContext, HealthStatus};
use std::path::PathBuf;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Scrim Queue - random two-team matchmaking for chat communities
#[derive(Parser)]
#[command(
    name = "scrim-queue",
    version,
    about = "Matchmaking queue service that splits community members into random teams",
    long_about = "Scrim Queue consumes join/leave/status/clear commands over AMQP, keeps one \
                 queue and one high-priority list per community, and announces two random \
                 teams whenever a community's pool reaches the match size."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Perform health check and exit
    #[arg(long, help = "Perform a health check and exit with status code")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// AMQP URL override
    #[arg(long, value_name = "URL", help = "Override AMQP connection URL")]
    amqp_url: Option<String>,

    /// Health server port override
    #[arg(long, value_name = "PORT", help = "Override health and metrics server port")]
    health_port: Option<u16>,

    /// Match size override
    #[arg(long, value_name = "N", help = "Override users per matchup")]
    match_size: Option<usize>,

    /// Team size override
    #[arg(long, value_name = "N", help = "Override users per team")]
    team_size: Option<usize>,

    /// Fixed shuffle seed
    #[arg(long, value_name = "SEED", help = "Seed team shuffling for reproducible draws")]
    shuffle_seed: Option<u64>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Connect the components once and report whether they are usable
async fn perform_health_check(config: AppConfig) -> Result<()> {
    info!("Performing health check...");

    let app_state = AppState::new(config).await?;
    let health = HealthCheck::check(&app_state.health_context()).await?;

    // The service loop is not started here, so only the components count
    let components_healthy = health
        .checks
        .iter()
        .filter(|check| check.name != "service_running")
        .all(|check| check.status == HealthStatus::Healthy);

    println!("Health Check: {}", health.status);
    for check in &health.checks {
        println!(
            "  {}: {}{}",
            check.name,
            check.status,
            check
                .message
                .as_deref()
                .map(|m| format!(" ({})", m))
                .unwrap_or_default()
        );
    }

    if components_healthy {
        std::process::exit(0);
    } else {
        std::process::exit(1);
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Run periodic health checks
async fn health_check_task(context: HealthContext) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));

    while context.is_running().await {
        interval.tick().await;

        match HealthCheck::check(&context).await {
            Ok(health) => {
                info!(
                    "Health check: {} - {} scopes, {} queued, {} high-priority, {} matchups formed",
                    health.status,
                    health.stats.active_scopes,
                    health.stats.players_queued,
                    health.stats.players_high_priority,
                    health.stats.matchups_formed
                );
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
            }
        }
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Scrim Queue Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Health port: {}", config.service.health_port);
    info!("   AMQP: {}", config.amqp.url);
    info!("   Command queue: {}", config.amqp.command_queue);
    info!(
        "   Matchups: {} users, teams of {}",
        config.matchmaking.match_size, config.matchmaking.team_size
    );
    if let Some(seed) = config.matchmaking.shuffle_seed {
        info!("   Shuffle seed: {}", seed);
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from file/environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(amqp_url) = &args.amqp_url {
        config.amqp.url = amqp_url.clone();
    }

    if let Some(health_port) = args.health_port {
        config.service.health_port = health_port;
    }

    if let Some(match_size) = args.match_size {
        config.matchmaking.match_size = match_size;
    }

    if let Some(team_size) = args.team_size {
        config.matchmaking.team_size = team_size;
    }

    if args.shuffle_seed.is_some() {
        config.matchmaking.shuffle_seed = args.shuffle_seed;
    }

    scrim_queue::config::validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.health_check {
        return perform_health_check(config).await;
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    let mut app_state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let health_task = tokio::spawn(health_check_task(app_state.health_context()));

    info!("✅ Scrim Queue Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
    health_task.abort();

    match tokio::time::timeout(config.shutdown_timeout(), app_state.shutdown()).await {
        Ok(Ok(())) => info!("✅ Graceful shutdown completed successfully"),
        Ok(Err(e)) => warn!("Shutdown finished with errors: {}", e),
        Err(_) => warn!("⚠️  Shutdown timeout exceeded, forcing exit"),
    }

    info!("🛑 Scrim Queue Service stopped");
    Ok(())
}
