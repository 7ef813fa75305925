//! HTTP transport with Streamable HTTP support for the MCP server.
//!
//! The transport runs rmcp in stateless mode: no session id is issued and every
//! POST is served by a fresh service instance on its own one-shot transport, so
//! concurrent callers can reuse JSON-RPC request ids without colliding.
//!
//! Each request holds a [`TransportLease`](crate::transport::TransportLease)
//! from the moment it is routed until its response body is dropped.

use crate::error::{DbError, DbResult};
use crate::mcp::{PacuareService, ServiceConfig};
use crate::transport::json_response::negotiate_response;
use crate::transport::{LeasedStream, Transport, TransportTracker, wait_for_signal};
use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
};
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// HTTP transport implementation with Streamable HTTP support.
///
/// This transport provides:
/// - A single MCP endpoint accepting POST requests
/// - JSON responses, or Server-Sent Events for clients that accept only those
/// - One transport per request, released when the response is closed
pub struct HttpTransport {
    config: Arc<ServiceConfig>,
    tracker: Arc<TransportTracker>,
    /// Host to bind to
    host: String,
    /// Port to bind to
    port: u16,
    /// MCP endpoint path
    endpoint: String,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// # Arguments
    ///
    /// * `config` - Shared service configuration (executor and default API key)
    /// * `host` - Host address to bind to
    /// * `port` - Port to bind to
    /// * `endpoint` - MCP endpoint path (e.g., "/mcp")
    pub fn new(
        config: Arc<ServiceConfig>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            config,
            tracker: Arc::new(TransportTracker::default()),
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Counters for per-request transports opened and released by this host.
    pub fn tracker(&self) -> &Arc<TransportTracker> {
        &self.tracker
    }

    /// Build the axum router serving the MCP endpoint.
    pub fn router(&self) -> Router {
        let config = self.config.clone();

        // Called once per POST in stateless mode
        let service = StreamableHttpService::new(
            move || Ok(PacuareService::new(config.clone())),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig {
                stateful_mode: false,
                ..Default::default()
            },
        );

        Router::new()
            .route_service(&self.endpoint, service)
            .route_layer(middleware::from_fn(negotiate_response))
            .route_layer(middleware::from_fn_with_state(
                self.tracker.clone(),
                lease_transport,
            ))
            .layer(middleware::from_fn(log_request))
    }

    /// Serve on an already bound listener until a shutdown signal arrives.
    pub async fn serve(&self, listener: TcpListener) -> DbResult<()> {
        let app = self.router();

        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        // Streaming responses may keep the server alive indefinitely,
        // so we force exit after a timeout once shutdown signal is received
        const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

        // Use a notify to coordinate shutdown timing
        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();

        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        // Race between: server completing normally vs forced timeout/second signal after shutdown
        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(DbError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {
                // Timeout or second signal reached - server will be dropped
            }
        }

        info!(
            opened = self.tracker.opened(),
            active = self.tracker.active(),
            "HTTP transports at shutdown"
        );

        Ok(())
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting MCP server with HTTP transport on {}", bind_addr);

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available or set PORT",
            )
        })?;

        self.serve(listener).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Hold a transport lease for one request until its response body is dropped.
///
/// If the client goes away before the response starts, the lease is released
/// with this future.
async fn lease_transport(
    State(tracker): State<Arc<TransportTracker>>,
    mut request: Request,
    next: Next,
) -> Response {
    let lease = tracker.open();
    request.extensions_mut().insert(lease.id());

    let response = next.run(request).await;
    response.map(|body| Body::from_stream(LeasedStream::new(body.into_data_stream(), lease)))
}

/// Log one line per HTTP request: method, path, status and latency.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "HTTP request"
    );
    response
}
