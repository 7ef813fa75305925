//! Data models for the Pacuare MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;

// Re-export commonly used types
pub use query::{QueryRequest, QueryResult};
