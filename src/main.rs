//! Pacuare MCP Server - Main entry point.
//!
//! This server provides the MCP (Model Context Protocol) `query` tool for AI
//! assistants to run SQL against the Pacuare database.

use clap::Parser;
use pacuare_mcp_server::config::{Config, TransportMode};
use pacuare_mcp_server::db::{PacuareConnector, QueryExecutor};
use pacuare_mcp_server::mcp::ServiceConfig;
use pacuare_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so they never mix with MCP traffic on stdout.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    info!(
        transport = %config.transport,
        "Starting Pacuare MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let connector = PacuareConnector::new(config.parsed_api_url()?);
    let default_api_key = config.default_api_key();
    info!(
        api_url = %connector.api_url(),
        default_api_key = default_api_key.is_some(),
        "Configured Pacuare API"
    );

    let executor = QueryExecutor::new(Arc::new(connector));
    let service_config = Arc::new(ServiceConfig::new(executor, default_api_key));

    // Run the appropriate transport
    let result = match config.transport {
        TransportMode::Stdio => {
            let transport = StdioTransport::new(service_config);
            info!(transport = transport.name(), "Using stdio transport");
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                service_config,
                &config.http_host,
                config.port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
