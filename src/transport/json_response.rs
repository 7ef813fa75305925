//! JSON response mode for the stateless MCP endpoint.
//!
//! rmcp answers every stateless POST with a Server-Sent Events stream that
//! carries the one JSON-RPC reply. Clients that accept `application/json` get
//! that reply as a plain JSON body instead. Clients that accept only
//! `text/event-stream` keep the stream.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

const JSON: &str = "application/json";
const EVENT_STREAM: &str = "text/event-stream";

/// Response body format chosen from the request's `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseMode {
    Json,
    EventStream,
    /// Neither format is acceptable; rmcp answers with 406.
    Unsupported,
}

impl ResponseMode {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let ranges: Vec<String> = headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter_map(|range| range.split(';').next())
            .map(|range| range.trim().to_ascii_lowercase())
            .filter(|range| !range.is_empty())
            .collect();

        if ranges.is_empty() {
            return Self::Json;
        }
        let accepts = |wanted: &str| ranges.iter().any(|range| range == wanted);

        if accepts(JSON) || accepts("application/*") || accepts("*/*") {
            Self::Json
        } else if accepts(EVENT_STREAM) || accepts("text/*") {
            Self::EventStream
        } else {
            Self::Unsupported
        }
    }
}

/// Middleware picking the response format for MCP POSTs.
pub(crate) async fn negotiate_response(mut request: Request, next: Next) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let mode = ResponseMode::from_headers(request.headers());
    if mode == ResponseMode::Unsupported {
        return next.run(request).await;
    }

    // rmcp only serves clients that list both formats
    request.headers_mut().insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/event-stream"),
    );
    let response = next.run(request).await;

    match mode {
        ResponseMode::Json => into_json_response(response).await,
        _ => response,
    }
}

async fn into_json_response(response: Response) -> Response {
    if !is_event_stream(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    match first_rpc_reply(body).await {
        Ok(Some(reply)) => {
            parts
                .headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON));
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(reply))
        }
        Ok(None) => {
            warn!("Event stream ended without a JSON-RPC reply");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            debug!(error = %e, "Failed to read MCP event stream");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(EVENT_STREAM))
}

/// Read events until one carries a JSON-RPC response or error.
async fn first_rpc_reply(body: Body) -> Result<Option<String>, axum::Error> {
    let mut stream = body.into_data_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        buffer.push_str(&String::from_utf8_lossy(&chunk?));
        if buffer.contains('\r') {
            buffer = buffer.replace("\r\n", "\n");
        }
        while let Some(event) = next_event(&mut buffer) {
            if let Some(data) = event_data(&event).filter(|data| is_rpc_reply(data)) {
                return Ok(Some(data));
            }
        }
    }

    Ok(event_data(&buffer).filter(|data| is_rpc_reply(data)))
}

/// Remove and return the first complete event from `buffer`.
fn next_event(buffer: &mut String) -> Option<String> {
    let end = buffer.find("\n\n")?;
    let event = buffer[..end].to_string();
    buffer.replace_range(..end + 2, "");
    Some(event)
}

/// Joined `data:` lines of one event, if it has any.
fn event_data(event: &str) -> Option<String> {
    let lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn is_rpc_reply(data: &str) -> bool {
    serde_json::from_str::<Value>(data).is_ok_and(|message| {
        message.get("id").is_some()
            && (message.get("result").is_some() || message.get("error").is_some())
    })
}
