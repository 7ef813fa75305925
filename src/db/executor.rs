//! Query execution engine.
//!
//! Each execution obtains a brand-new client for the resolved credential,
//! runs the statement once and hands the outcome back unchanged. There is no
//! pooling, no retry and no timeout beyond what the client itself applies.

use crate::auth::Credential;
use crate::db::client::Connector;
use crate::error::DbResult;
use crate::models::QueryResult;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Query executor that handles database query execution.
#[derive(Clone)]
pub struct QueryExecutor {
    connector: Arc<dyn Connector>,
}

impl QueryExecutor {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Execute `sql` with positional `params` under `credential`.
    pub async fn execute(
        &self,
        credential: &Credential,
        sql: &str,
        params: &[String],
    ) -> DbResult<QueryResult> {
        let start = Instant::now();

        if credential.is_empty() {
            debug!("No API key resolved; the database API will decide whether to accept the query");
        }

        debug!(
            sql_len = sql.len(),
            params = params.len(),
            api_key = %credential.masked(),
            "Executing query"
        );

        let client = self.connector.connect(credential)?;
        let result = client.query(sql, params).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(rows) => debug!(
                columns = rows.column_count(),
                rows = rows.row_count(),
                elapsed_ms,
                "Query completed"
            ),
            Err(e) => warn!(error = %e, status = ?e.status(), elapsed_ms, "Query failed"),
        }

        result
    }
}
