//! Query-related data models.
//!
//! This module defines the request body sent to the Pacuare API and the
//! column/row result set it answers with.

use crate::error::{DbError, DbResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Body of a query request sent to the Pacuare API.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    /// PostgreSQL statement, may contain `$1`, `$2`... placeholders
    pub query: &'a str,
    /// Positional parameters bound to the placeholders
    pub params: &'a [String],
}

impl<'a> QueryRequest<'a> {
    pub fn new(query: &'a str, params: &'a [String]) -> Self {
        Self { query, params }
    }
}

/// Result set returned by a query.
///
/// Cell values are kept exactly as the database API returned them
/// (numbers, strings, booleans, null); no coercion happens here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryResult {
    /// Column names in result order. Not guaranteed to be unique.
    pub columns: Vec<String>,
    /// Rows of cell values, positionally aligned with `columns`
    pub values: Vec<Vec<JsonValue>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, values: Vec<Vec<JsonValue>>) -> Self {
        Self { columns, values }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.values.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Ensure every row has exactly one cell per column.
    pub fn check_shape(&self) -> DbResult<()> {
        let width = self.columns.len();
        match self.values.iter().position(|row| row.len() != width) {
            Some(index) => Err(DbError::decode(format!(
                "row {} has {} values but the result has {} columns",
                index,
                self.values[index].len(),
                width
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_request_serializes_api_shape() {
        let params = vec!["42".to_string()];
        let req = QueryRequest::new("SELECT * FROM pacuare_raw WHERE id = $1", &params);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({ "query": "SELECT * FROM pacuare_raw WHERE id = $1", "params": ["42"] })
        );
    }

    #[test]
    fn test_query_result_deserializes_mixed_values() {
        let result: QueryResult = serde_json::from_value(json!({
            "columns": ["id", "name", "active", "note"],
            "values": [[1, "turtle", true, null], [2.5, "nest", false, "x"]]
        }))
        .unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.column_count(), 4);
        assert_eq!(result.values[0][0], json!(1));
        assert_eq!(result.values[1][0], json!(2.5));
        assert!(result.values[0][3].is_null());
        assert!(result.check_shape().is_ok());
    }

    #[test]
    fn test_query_result_empty() {
        let result = QueryResult::new(vec!["a".to_string()], Vec::new());
        assert_eq!(result.row_count(), 0);
        assert!(result.check_shape().is_ok());
    }

    #[test]
    fn test_check_shape_rejects_ragged_rows() {
        let result = QueryResult::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![json!(1), json!(2)], vec![json!(3)]],
        );
        let err = result.check_shape().unwrap_err();
        assert!(matches!(err, DbError::Decode { .. }));
        assert!(err.to_string().contains("row 1 has 1 values"));
    }

    #[test]
    fn test_duplicate_column_names_are_kept() {
        let result: QueryResult = serde_json::from_value(json!({
            "columns": ["x", "x"],
            "values": [[1, 2]]
        }))
        .unwrap();
        assert_eq!(result.columns, vec!["x", "x"]);
    }
}
