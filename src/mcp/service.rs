//! MCP service implementation using rmcp.
//!
//! This module defines the PacuareService struct exposing the `query` tool
//! via the MCP protocol using the rmcp framework's macros.

use crate::auth::{Credential, resolve_credential};
use crate::db::QueryExecutor;
use crate::tools::query::{QueryInput, QueryOutput, QueryToolHandler, to_call_tool_result};
use crate::transport::TransportId;
use axum::http::{HeaderMap, request::Parts};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Process-wide state shared by every transport. Read-only once built.
pub struct ServiceConfig {
    executor: QueryExecutor,
    default_api_key: Option<Credential>,
}

impl ServiceConfig {
    /// # Arguments
    ///
    /// * `executor` - Executor used for every query
    /// * `default_api_key` - Key used when a request carries no `x-api-key` header
    pub fn new(executor: QueryExecutor, default_api_key: Option<Credential>) -> Self {
        Self {
            executor,
            default_api_key,
        }
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn default_api_key(&self) -> Option<&Credential> {
        self.default_api_key.as_ref()
    }
}

#[derive(Clone)]
pub struct PacuareService {
    config: Arc<ServiceConfig>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl fmt::Debug for PacuareService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacuareService")
            .field("default_api_key", &self.config.default_api_key())
            .finish_non_exhaustive()
    }
}

impl PacuareService {
    pub fn new(config: Arc<ServiceConfig>) -> Self {
        Self {
            config,
            tool_router: Self::tool_router(),
        }
    }

    /// Run one `query` invocation.
    ///
    /// `headers` are the HTTP request headers when the call arrived over HTTP,
    /// `None` otherwise.
    pub async fn invoke_query(
        &self,
        headers: Option<&HeaderMap>,
        input: QueryInput,
    ) -> Result<CallToolResult, McpError> {
        let (credential, source) = resolve_credential(headers, self.config.default_api_key());
        debug!(source = %source, "Resolved API key");

        let handler = QueryToolHandler::new(self.config.executor().clone());
        to_call_tool_result(handler.query(&credential, input).await)
    }
}

#[tool_router]
impl PacuareService {
    #[tool(
        title = "Query Database",
        description = "Execute SQL queries against the Pacuare database.\nThis tool can be used for data retrieval, aggregations, and mathematical calculations.\nFor math operations, convert them to SQL queries (e.g., 'SELECT 5 + 3 AS result' for addition).\nThis is a PostgreSQL database. Use examples from https://pacuare.dev/en/latest/useful-queries.html to help write queries.\nMost data is in the pacuare_raw table.\nAvoid writing data if at all possible.\nReturns results as a formatted table.\nFor parameterized queries, send the (PostgreSQL-formatted) statement to be prepared in 'sql', and the parameters in 'params'.",
        output_schema = rmcp::handler::server::tool::schema_for_type::<QueryOutput>()
    )]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryInput>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let parts = context.extensions.get::<Parts>();
        match parts {
            Some(parts) => debug!(
                transport_id = ?parts.extensions.get::<TransportId>(),
                "Query over HTTP"
            ),
            None => {
                debug!("No HTTP request info for this call; falling back to the default API key")
            }
        }
        self.invoke_query(parts.map(|p| &p.headers), input).await
    }
}

#[tool_handler]
impl ServerHandler for PacuareService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "pacuare-mcp-server".to_owned(),
                title: Some("Pacuare MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: Some("https://pacuare.dev".to_owned()),
            },
            instructions: Some(
                "Query the Pacuare sea turtle database with SQL.\n\
                \n\
                Call `query` with a PostgreSQL statement in `sql` and positional parameters in `params`.\n\
                Most data lives in the `pacuare_raw` table. Prefer read-only statements.\n\
                Over HTTP, send your API key in the `x-api-key` header; otherwise the server's default key is used."
                    .to_string(),
            ),
        }
    }
}
