//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.
//! There is one channel for the whole process: the service is bound to it
//! once and never rebound.

use crate::error::{DbError, DbResult};
use crate::mcp::{PacuareService, ServiceConfig};
use crate::transport::{Transport, wait_for_signal};
use rmcp::{RoleServer, ServiceExt, service::RunningService};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout, following the MCP protocol specification.
pub struct StdioTransport {
    config: Arc<ServiceConfig>,
    bound: AtomicBool,
}

impl StdioTransport {
    /// Create a new stdio transport.
    ///
    /// # Arguments
    ///
    /// * `config` - Shared service configuration (executor and default API key)
    pub fn new(config: Arc<ServiceConfig>) -> Self {
        Self {
            config,
            bound: AtomicBool::new(false),
        }
    }

    /// Whether the service has already been bound to a channel.
    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    /// Bind the service to `reader`/`writer` and complete the MCP handshake.
    ///
    /// Only the first call binds; later calls fail without touching the IO pair.
    pub async fn serve_io<R, W>(
        &self,
        reader: R,
        writer: W,
    ) -> DbResult<RunningService<RoleServer, PacuareService>>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        if self.bound.swap(true, Ordering::SeqCst) {
            return Err(DbError::internal("stdio transport is already bound"));
        }

        let service = PacuareService::new(self.config.clone());
        service
            .serve((reader, writer))
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        if self.config.default_api_key().is_none() {
            warn!("PACUARE_API_KEY is not set; queries over stdio will be sent without an API key");
        }

        let running_service = self.serve_io(tokio::io::stdin(), tokio::io::stdout()).await?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        return Err(DbError::internal(format!(
                            "Stdio transport error: {}",
                            e
                        )));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            // Spawn a task to listen for second signal and force exit
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });

            // tokio::select! cannot interrupt a blocking stdin read
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}
