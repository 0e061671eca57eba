//! tabrelay - browser command relay
//!
//! Main entry point. `serve` runs the relay listener and the stdio tool
//! server in one process; `agent` runs the browser dispatcher.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tabrelay_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use tabrelay_dispatcher::BrowserAgent;
use tabrelay_dispatcher::cdp::CdpRuntime;
use tabrelay_mcp::McpServer;
use tabrelay_relay::{RelayEndpoint, RelayServer};

use cli::{Cli, Commands};

/// Initialize tracing with stderr and optional file output.
///
/// Stdout is reserved for protocol traffic, so console logs go to stderr.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = if logging.file {
        let log_dir = PathBuf::from(ConfigLoader::expand_path(&logging.directory));
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("tabrelay")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Keeps the background writer alive for the whole process.
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);
    init_tracing(&config.logging)?;

    for warning in ConfigValidator::validate(&config).into_result()? {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    match cli.command {
        None | Some(Commands::Serve { .. }) => run_serve(config).await,
        Some(Commands::Agent { .. }) => run_agent(config).await,
    }
}

/// Relay listener plus the stdio tool server, until stdin closes.
async fn run_serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting tabrelay v{}", env!("CARGO_PKG_VERSION"));

    let relay = Arc::new(RelayEndpoint::new(config.relay.clone()));
    let listener = RelayServer::bind(relay.clone())
        .await
        .map_err(|e| format!("Failed to bind relay on {}: {}", config.relay.address(), e))?;
    let relay_task = listener.spawn();

    let server = McpServer::new(config.server.clone(), relay);
    tokio::select! {
        result = server.serve_stdio() => result?,
        _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
    }

    relay_task.abort();
    info!("tabrelay stopped");
    Ok(())
}

/// Browser dispatcher driving Chrome, until interrupted.
async fn run_agent(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = config.dispatcher.cdp_endpoint.clone();
    info!(
        "Starting dispatcher: relay {} / Chrome {}",
        config.dispatcher.relay_url, endpoint
    );

    // The runtime reconnects lazily, so a missing browser is not fatal here.
    let runtime = match CdpRuntime::connect(endpoint.clone()).await {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!("Chrome not reachable yet: {}", e);
            CdpRuntime::new(endpoint)
        }
    };

    let agent = BrowserAgent::start(config.dispatcher.clone(), Arc::new(runtime));
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");
    agent.stop().await;
    Ok(())
}
