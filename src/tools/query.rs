//! Query execution tool.
//!
//! This module implements the `query` MCP tool: input and output shapes, the
//! handler that runs a statement through the [`QueryExecutor`], and the
//! translation of its outcome into an MCP tool result.

use crate::auth::Credential;
use crate::db::QueryExecutor;
use crate::error::{DbError, DbResult};
use crate::models::QueryResult;
use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL query to execute. Use standard PostgreSQL syntax. For math, use SELECT statements with arithmetic operators.
    pub sql: String,
    /// Positional parameters for the $1, $2... placeholders in `sql`
    #[serde(default)]
    pub params: Vec<String>,
}

/// Output from the query tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryOutput {
    /// Columns and rows returned by the database
    pub result: QueryResult,
}

impl From<QueryResult> for QueryOutput {
    fn from(result: QueryResult) -> Self {
        Self { result }
    }
}

impl QueryOutput {
    /// Wrap the output as both a serialized text block and structured content.
    pub fn into_call_tool_result(self) -> Result<CallToolResult, McpError> {
        let value = serde_json::to_value(&self).map_err(|e| {
            McpError::from(DbError::internal(format!(
                "Failed to serialize query result: {}",
                e
            )))
        })?;
        Ok(CallToolResult::structured(value))
    }
}

/// Translate a handler outcome into what the MCP runtime sends back.
///
/// Execution faults become a tool-level error whose only content is the status
/// line; the API's detail is dropped here. Every other fault is a protocol error.
pub fn to_call_tool_result(outcome: DbResult<QueryOutput>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(output) => output.into_call_tool_result(),
        Err(err @ DbError::Execution { .. }) => {
            Ok(CallToolResult::error(vec![Content::text(err.to_string())]))
        }
        Err(err) => Err(err.into()),
    }
}

/// Handler for query execution.
pub struct QueryToolHandler {
    executor: QueryExecutor,
}

impl QueryToolHandler {
    /// Create a new query tool handler.
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Handle the query tool call.
    ///
    /// No validation is done beyond the input shape: statement correctness,
    /// placeholder counts and write permissions are left to the database.
    pub async fn query(&self, credential: &Credential, input: QueryInput) -> DbResult<QueryOutput> {
        let result = self
            .executor
            .execute(credential, &input.sql, &input.params)
            .await;

        match result {
            Ok(result) => {
                info!(
                    columns = result.column_count(),
                    row_count = result.row_count(),
                    "Query executed"
                );
                Ok(result.into())
            }
            Err(err) => {
                if let DbError::Execution { status, detail } = &err {
                    warn!(status = *status, detail = %detail, "Query rejected by database");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Connector, DatabaseClient};
    use futures_util::future::BoxFuture;
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct FixedConnector(fn() -> DbResult<QueryResult>);

    struct FixedClient(fn() -> DbResult<QueryResult>);

    impl DatabaseClient for FixedClient {
        fn query<'a>(
            &'a self,
            _sql: &'a str,
            _params: &'a [String],
        ) -> BoxFuture<'a, DbResult<QueryResult>> {
            let outcome = (self.0)();
            Box::pin(async move { outcome })
        }
    }

    impl Connector for FixedConnector {
        fn connect(&self, _credential: &Credential) -> DbResult<Box<dyn DatabaseClient>> {
            Ok(Box::new(FixedClient(self.0)))
        }
    }

    fn handler(outcome: fn() -> DbResult<QueryResult>) -> QueryToolHandler {
        QueryToolHandler::new(QueryExecutor::new(Arc::new(FixedConnector(outcome))))
    }

    fn eight() -> DbResult<QueryResult> {
        Ok(QueryResult::new(
            vec!["result".to_string()],
            vec![vec![json!(8)]],
        ))
    }

    fn not_found() -> DbResult<QueryResult> {
        Err(DbError::execution(404, "{\"error\":\"no such table\"}"))
    }

    fn unreachable_api() -> DbResult<QueryResult> {
        Err(DbError::connection("connection refused", "check network"))
    }

    fn as_json(result: &CallToolResult) -> Value {
        serde_json::to_value(result).unwrap()
    }

    #[test]
    fn test_query_input_deserialization() {
        let input: QueryInput = serde_json::from_value(json!({
            "sql": "SELECT * FROM pacuare_raw WHERE species = $1",
            "params": ["Chelonia mydas"]
        }))
        .unwrap();
        assert_eq!(input.params, vec!["Chelonia mydas"]);
    }

    #[test]
    fn test_query_input_params_default_to_empty() {
        let input: QueryInput = serde_json::from_value(json!({ "sql": "SELECT 1" })).unwrap();
        assert!(input.params.is_empty());
    }

    #[test]
    fn test_query_input_rejects_non_string_params() {
        let result: Result<QueryInput, _> =
            serde_json::from_value(json!({ "sql": "SELECT $1", "params": [42] }));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_handler_returns_result_envelope() {
        let input = QueryInput {
            sql: "SELECT 5 + 3 AS result".to_string(),
            params: Vec::new(),
        };
        let output = handler(eight)
            .query(&Credential::new("key"), input)
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({ "result": { "columns": ["result"], "values": [[8]] } })
        );
    }

    #[tokio::test]
    async fn test_success_is_text_and_structured() {
        let input = QueryInput {
            sql: "SELECT 5 + 3 AS result".to_string(),
            params: Vec::new(),
        };
        let outcome = handler(eight).query(&Credential::new("key"), input).await;
        let result = to_call_tool_result(outcome).unwrap();
        let value = as_json(&result);

        let expected = json!({ "result": { "columns": ["result"], "values": [[8]] } });
        assert_eq!(value["structuredContent"], expected);
        let text = value["content"][0]["text"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), expected);
        assert_ne!(value["isError"], json!(true));
    }

    #[tokio::test]
    async fn test_execution_fault_becomes_status_message() {
        let input = QueryInput {
            sql: "SELECT * FROM nope".to_string(),
            params: Vec::new(),
        };
        let outcome = handler(not_found).query(&Credential::new("key"), input).await;
        let result = to_call_tool_result(outcome).unwrap();
        let value = as_json(&result);

        assert_eq!(value["isError"], json!(true));
        assert_eq!(value["content"].as_array().unwrap().len(), 1);
        assert_eq!(value["content"][0]["text"], "query returned status 404");
        assert!(value.get("structuredContent").is_none_or(Value::is_null));
    }

    #[tokio::test]
    async fn test_other_faults_propagate_as_protocol_errors() {
        let input = QueryInput {
            sql: "SELECT 1".to_string(),
            params: Vec::new(),
        };
        let outcome = handler(unreachable_api)
            .query(&Credential::new("key"), input)
            .await;
        let err = to_call_tool_result(outcome).unwrap_err();
        assert_eq!(err.code.0, -32603);
        assert!(err.message.contains("connection refused"));
    }
}
