//! Pacuare database API client.
//!
//! The database is reached over HTTPS. A client is bound to exactly one
//! credential and is built fresh for every tool invocation; nothing is pooled.
//!
//! The [`Connector`] and [`DatabaseClient`] traits are the seam between the
//! tool layer and the network, so the executor can be driven by an in-memory
//! database in tests.

use crate::auth::Credential;
use crate::error::{DbError, DbResult};
use crate::models::{QueryRequest, QueryResult};
use futures_util::future::BoxFuture;
use tracing::debug;
use url::Url;

/// Default base URL of the Pacuare API.
pub const DEFAULT_API_URL: &str = "https://api.pacuare.dev/v1";

/// A database client bound to one credential.
pub trait DatabaseClient: Send + Sync {
    /// Execute `sql` with positional `params`.
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [String],
    ) -> BoxFuture<'a, DbResult<QueryResult>>;
}

/// Builds a [`DatabaseClient`] from a credential.
pub trait Connector: Send + Sync {
    fn connect(&self, credential: &Credential) -> DbResult<Box<dyn DatabaseClient>>;
}

/// Connector producing [`PacuareClient`]s for a fixed API base URL.
#[derive(Debug, Clone)]
pub struct PacuareConnector {
    api_url: Url,
}

impl PacuareConnector {
    pub fn new(api_url: Url) -> Self {
        Self { api_url }
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }
}

impl Connector for PacuareConnector {
    fn connect(&self, credential: &Credential) -> DbResult<Box<dyn DatabaseClient>> {
        Ok(Box::new(PacuareClient::new(
            self.api_url.clone(),
            credential.clone(),
        )?))
    }
}

/// HTTP client for the Pacuare query endpoint.
pub struct PacuareClient {
    http: reqwest::Client,
    endpoint: Url,
    credential: Credential,
}

impl PacuareClient {
    /// Create a client for `api_url`, authorized with `credential`.
    pub fn new(api_url: Url, credential: Credential) -> DbResult<Self> {
        let endpoint = query_endpoint(&api_url)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("pacuare-mcp-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DbError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            credential,
        })
    }

    async fn send_query(&self, sql: &str, params: &[String]) -> DbResult<QueryResult> {
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .json(&QueryRequest::new(sql, params));
        // An empty key is left off so the API answers with its own 401.
        if !self.credential.is_empty() {
            request = request.bearer_auth(self.credential.expose());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = match response.text().await {
                Ok(detail) => detail,
                Err(e) => {
                    debug!(error = %e, "Failed to read error body from database API");
                    String::new()
                }
            };
            debug!(status = status.as_u16(), detail = %detail, "Database API rejected query");
            return Err(DbError::execution(status.as_u16(), detail));
        }

        let body = response.bytes().await?;
        let result: QueryResult = serde_json::from_slice(&body)
            .map_err(|e| DbError::decode(format!("Malformed result set: {}", e)))?;
        result.check_shape()?;
        Ok(result)
    }
}

impl DatabaseClient for PacuareClient {
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [String],
    ) -> BoxFuture<'a, DbResult<QueryResult>> {
        Box::pin(self.send_query(sql, params))
    }
}

/// `{api_url}/query`, tolerating a trailing slash on the base URL.
fn query_endpoint(api_url: &Url) -> DbResult<Url> {
    let mut endpoint = api_url.clone();
    endpoint
        .path_segments_mut()
        .map_err(|_| DbError::configuration(format!("API URL cannot be a base: {}", api_url)))?
        .pop_if_empty()
        .push("query");
    Ok(endpoint)
}
