//! API key resolution for Pacuare queries.
//!
//! Every tool invocation resolves exactly one [`Credential`]. A key supplied by the
//! caller in the `x-api-key` header wins over the process-wide default; when neither
//! is present the empty key is passed through and the Pacuare API rejects it.

use axum::http::HeaderMap;
use std::fmt;
use tracing::warn;

/// Header carrying a per-request API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// An opaque Pacuare API key.
///
/// `Debug` masks the value so credentials never reach the logs in clear.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The empty credential, used when no key is available at all.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw key, for building the outgoing `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked form safe for logs.
    pub fn masked(&self) -> String {
        mask_token(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Header,
    Default,
    Absent,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::Default => write!(f, "default"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// Resolve the credential for one invocation.
///
/// `headers` is `None` when no HTTP request context is available (stdio transport).
pub fn resolve_credential(
    headers: Option<&HeaderMap>,
    default: Option<&Credential>,
) -> (Credential, CredentialSource) {
    if let Some(key) = headers.and_then(header_api_key) {
        return (Credential::new(key), CredentialSource::Header);
    }

    match default {
        Some(key) => (key.clone(), CredentialSource::Default),
        None => (Credential::empty(), CredentialSource::Absent),
    }
}

fn header_api_key(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(API_KEY_HEADER)?;
    match value.to_str() {
        Ok(key) => Some(key),
        Err(_) => {
            warn!("Ignoring {} header: contains invalid characters", API_KEY_HEADER);
            None
        }
    }
}

fn mask_token(token: &str) -> String {
    match token.get(..3) {
        Some(prefix) if token.len() > 3 => format!("{}***", prefix),
        _ => "***".to_string(),
    }
}
