//! MCP tool implementations.
//!
//! This module contains the tool handlers:
//! - `query`: Execute a parameterized SQL statement against the Pacuare database

pub mod query;

pub use query::{QueryInput, QueryOutput, QueryToolHandler};
