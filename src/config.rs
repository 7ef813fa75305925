//! Configuration handling for the Pacuare MCP Server.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::auth::Credential;
use crate::db::DEFAULT_API_URL;
use crate::error::{DbError, DbResult};
use clap::{Parser, ValueEnum};
use url::Url;

pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_MCP_ENDPOINT: &str = "/mcp";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Stateless Streamable HTTP (for remote clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the Pacuare MCP Server.
#[derive(Clone, Parser)]
#[command(
    name = "pacuare-mcp-server",
    about = "MCP server exposing SQL queries against the Pacuare database",
    version,
    author
)]
pub struct Config {
    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "PORT"
    )]
    pub port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Default Pacuare API key, used when a request has no x-api-key header
    #[arg(long, value_name = "KEY", env = "PACUARE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the Pacuare API
    #[arg(
        long,
        value_name = "URL",
        default_value = DEFAULT_API_URL,
        env = "PACUARE_API_URL"
    )]
    pub api_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Check the values that clap cannot validate on its own.
    pub fn validate(&self) -> DbResult<()> {
        self.parsed_api_url()?;
        if !self.mcp_endpoint.starts_with('/') {
            return Err(DbError::configuration(format!(
                "MCP endpoint must start with '/': {}",
                self.mcp_endpoint
            )));
        }
        if self.http_host.trim().is_empty() {
            return Err(DbError::configuration("HTTP host must not be empty"));
        }
        Ok(())
    }

    /// The API base URL, parsed. Only http and https are accepted.
    pub fn parsed_api_url(&self) -> DbResult<Url> {
        let url = Url::parse(&self.api_url)
            .map_err(|e| DbError::configuration(format!("Invalid API URL '{}': {}", self.api_url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(DbError::configuration(format!(
                "API URL must use http or https, got '{}'",
                other
            ))),
        }
    }

    /// The process-wide default API key. Blank values count as unset.
    pub fn default_api_key(&self) -> Option<Credential> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(Credential::new)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("transport", &self.transport)
            .field("http_host", &self.http_host)
            .field("port", &self.port)
            .field("mcp_endpoint", &self.mcp_endpoint)
            .field("api_key", &self.default_api_key())
            .field("api_url", &self.api_url)
            .field("log_level", &self.log_level)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}
