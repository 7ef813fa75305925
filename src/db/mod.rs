//! Database access layer.
//!
//! This module provides database access functionality:
//! - Pacuare API client and the connector seam used to build it
//! - Single-shot query execution

pub mod client;
pub mod executor;

pub use client::{Connector, DatabaseClient, DEFAULT_API_URL, PacuareClient, PacuareConnector};
pub use executor::QueryExecutor;
