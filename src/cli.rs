//! CLI definitions for tabrelay.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use tabrelay_config::Config;

/// tabrelay CLI.
#[derive(Debug, Parser)]
#[command(name = "tabrelay")]
#[command(about = "Bridge between a stdio MCP host and an in-browser command dispatcher")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.tabrelay/config.toml)
    #[arg(short, long, env = "TABRELAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log filter when RUST_LOG is not set
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also write daily log files
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Run the relay and serve tools on stdin/stdout (default)
    Serve {
        /// Relay listen host
        #[arg(long)]
        host: Option<String>,

        /// Relay listen port
        #[arg(long, env = "TABRELAY_PORT")]
        port: Option<u16>,

        /// Per-command response timeout in milliseconds
        #[arg(long)]
        request_timeout_ms: Option<u64>,
    },

    /// Run the browser dispatcher against Chrome's remote debugging endpoint
    Agent {
        /// Relay WebSocket URL
        #[arg(long, env = "TABRELAY_RELAY_URL")]
        relay_url: Option<String>,

        /// Chrome remote debugging endpoint
        #[arg(long, env = "TABRELAY_CDP_ENDPOINT")]
        cdp_endpoint: Option<String>,
    },
}

impl Cli {
    /// Overlay command line values on the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.log_file {
            config.logging.file = true;
        }

        match &self.command {
            Some(Commands::Serve {
                host,
                port,
                request_timeout_ms,
            }) => {
                if let Some(host) = host {
                    config.relay.host = host.clone();
                }
                if let Some(port) = port {
                    config.relay.port = *port;
                }
                if let Some(ms) = request_timeout_ms {
                    config.relay.request_timeout_ms = *ms;
                }
            }
            Some(Commands::Agent {
                relay_url,
                cdp_endpoint,
            }) => {
                if let Some(url) = relay_url {
                    config.dispatcher.relay_url = url.clone();
                }
                if let Some(endpoint) = cdp_endpoint {
                    config.dispatcher.cdp_endpoint = endpoint.clone();
                }
            }
            None => {}
        }
    }
}
