//! Pacuare MCP Server Library
//!
//! This library exposes a single MCP (Model Context Protocol) tool, `query`,
//! that runs parameterized SQL against the Pacuare database, served either
//! over stdio or over stateless Streamable HTTP.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use auth::Credential;
pub use config::Config;
pub use error::DbError;
pub use mcp::{PacuareService, ServiceConfig};
