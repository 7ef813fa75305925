//! Shared helpers for integration tests: a fake Pacuare API and MCP request helpers.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use pacuare_mcp_server::db::{PacuareConnector, QueryExecutor};
use pacuare_mcp_server::{Credential, ServiceConfig};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

/// Key the fake API always rejects with 401.
pub const BAD_KEY: &str = "bad-key";

/// A request seen by the fake API.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

/// In-process stand-in for the Pacuare query endpoint.
#[derive(Clone, Default)]
pub struct FakeApi {
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    completed: Arc<AtomicUsize>,
}

impl FakeApi {
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Requests that have been fully answered.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Bearer tokens received, in order. Missing headers show up as `None`.
    pub fn keys(&self) -> Vec<Option<String>> {
        self.seen()
            .into_iter()
            .map(|r| {
                r.authorization
                    .map(|v| v.trim_start_matches("Bearer ").to_string())
            })
            .collect()
    }

    /// Start serving on a random loopback port; returns the API base URL.
    pub async fn spawn(&self) -> Url {
        let app = Router::new()
            .route("/v1/query", post(handle_query))
            .with_state(self.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{}/v1", addr)).unwrap()
    }
}

async fn handle_query(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let response = respond(&api, headers, body).await;
    api.completed.fetch_add(1, Ordering::SeqCst);
    response
}

async fn respond(api: &FakeApi, headers: HeaderMap, body: Value) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    api.seen.lock().unwrap().push(SeenRequest {
        authorization: authorization.clone(),
        body: body.clone(),
    });

    match authorization.as_deref() {
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "missing api key" })),
            )
                .into_response();
        }
        Some(auth) if auth == format!("Bearer {}", BAD_KEY) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid api key" })),
            )
                .into_response();
        }
        Some(_) => {}
    }

    let sql = body["query"].as_str().unwrap_or_default();
    let params = body["params"].as_array().cloned().unwrap_or_default();

    match sql {
        "SELECT 5 + 3 AS result" => {
            Json(json!({ "columns": ["result"], "values": [[8]] })).into_response()
        }
        "SELECT $1::text AS echo" => {
            tokio::time::sleep(Duration::from_millis(150)).await;
            let value = params.first().cloned().unwrap_or(Value::Null);
            Json(json!({ "columns": ["echo"], "values": [[value]] })).into_response()
        }
        "SELECT pg_sleep(2)" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "columns": ["pg_sleep"], "values": [[null]] })).into_response()
        }
        "SELECT * FROM missing_table" => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "relation \"missing_table\" does not exist" })),
        )
            .into_response(),
        "SELECT ragged" => {
            Json(json!({ "columns": ["a", "b"], "values": [[1, 2], [3]] })).into_response()
        }
        "SELECT garbage" => (StatusCode::OK, "this is not json").into_response(),
        "SELECT mixed" => Json(json!({
            "columns": ["id", "species", "nesting", "notes"],
            "values": [[1, "Dermochelys coriacea", true, null], [2, "Chelonia mydas", false, "tagged"]]
        }))
        .into_response(),
        _ => Json(json!({ "columns": ["query"], "values": [[sql]] })).into_response(),
    }
}

/// Build service configuration backed by the real Pacuare client pointed at `api_url`.
pub fn service_config(api_url: Url, default_key: Option<&str>) -> Arc<ServiceConfig> {
    let executor = QueryExecutor::new(Arc::new(PacuareConnector::new(api_url)));
    Arc::new(ServiceConfig::new(executor, default_key.map(Credential::new)))
}

/// JSON-RPC `tools/call` request for the `query` tool.
pub fn query_call(id: u64, sql: &str, params: &[&str]) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {
            "name": "query",
            "arguments": { "sql": sql, "params": params }
        }
    })
}

/// Extract the JSON-RPC message with `id` from a JSON or SSE response body.
pub fn parse_rpc_response(content_type: &str, body: &str, id: u64) -> Value {
    if content_type.starts_with("application/json") {
        let value: Value = serde_json::from_str(body).unwrap();
        assert_eq!(value["id"], json!(id));
        return value;
    }

    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| !data.is_empty())
        .filter_map(|data| serde_json::from_str::<Value>(data).ok())
        .find(|value| value["id"] == json!(id))
        .unwrap_or_else(|| panic!("no response with id {} in body: {}", id, body))
}
