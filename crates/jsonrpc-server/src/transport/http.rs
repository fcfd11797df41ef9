use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use jsonrpc_core::{ErrorCode, FramingBuffer, JsonRpcVersion};
use serde_json::Value;

use crate::dispatch::dispatch;
use crate::events::ServerEvents;
use crate::registry::MethodRegistry;

#[derive(Clone)]
struct HttpState {
    registry: Arc<MethodRegistry>,
    events: Arc<ServerEvents>,
    version: JsonRpcVersion,
    delimiter: Vec<u8>,
}

/// Build the single-route HTTP server (spec.md §4.6: stateless, one POST
/// body per call, status mapped from the reply rather than carried in band).
pub fn router(
    registry: Arc<MethodRegistry>,
    events: Arc<ServerEvents>,
    version: JsonRpcVersion,
    delimiter: Vec<u8>,
) -> Router {
    let state = HttpState { registry, events, version, delimiter };
    Router::new().route("/", post(handle)).with_state(state)
}

/// Split the body into delimiter-framed segments the same way the stream
/// transport splits a byte stream (spec.md §6.1: the body carries "one or
/// more delimiter-framed messages"), dispatch each in turn, and join the
/// non-empty replies back with the delimiter.
async fn handle(State(state): State<HttpState>, body: String) -> (StatusCode, String) {
    let mut framing = FramingBuffer::new(state.delimiter.clone());
    framing.push(body.as_bytes());
    framing.push(&state.delimiter);
    let segments = framing.extract();

    let mut status = None;
    let mut replies = Vec::new();
    for segment in segments {
        let result = dispatch(&segment, &state.registry, state.version).await;
        for (method, params) in result.notifications {
            state.events.emit_notify(&method, params).await;
        }
        if let Some(value) = result.reply {
            if status.is_none() {
                status = primary_error_status(&value);
            }
            replies.push(value.to_string());
        }
    }

    if replies.is_empty() {
        return (StatusCode::NO_CONTENT, String::new());
    }
    let joined = replies.join(&String::from_utf8_lossy(&state.delimiter));
    (status.unwrap_or(StatusCode::OK), joined)
}

/// The status an HTTP response maps to when its reply carries one or more
/// error objects: the first one found, depth-first (spec.md §4.6, §4.3).
fn primary_error_status(value: &Value) -> Option<StatusCode> {
    match value {
        Value::Object(fields) => fields
            .get("error")
            .and_then(|error| error.get("code"))
            .and_then(Value::as_i64)
            .and_then(ErrorCode::from_code)
            .and_then(|code| StatusCode::from_u16(code.http_status()).ok()),
        Value::Array(items) => items.iter().find_map(primary_error_status),
        _ => None,
    }
}
