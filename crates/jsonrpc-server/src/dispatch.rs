use jsonrpc_core::{
    decode_frame, encode_message, DecodeOutcome, ErrorCode, Id, JsonRpcError, JsonRpcVersion,
    Message,
};
use serde_json::Value;

use crate::registry::{HandlerFailure, MethodRegistry};

/// What a dispatched frame produced (spec.md §4.6).
///
/// `reply` is the exact wire payload to write back: `None` means no reply
/// at all (a lone notification, or a batch that was all notifications).
pub struct DispatchResult {
    pub reply: Option<Value>,
    pub notifications: Vec<(String, Value)>,
}

/// Validate, dispatch, and format the response for one incoming frame
/// (spec.md §4.6 steps 1-5).
pub async fn dispatch(text: &str, registry: &MethodRegistry, version: JsonRpcVersion) -> DispatchResult {
    match decode_frame(text, version) {
        DecodeOutcome::Invalid { error, id } => DispatchResult {
            reply: Some(encode_error(error, id, version)),
            notifications: Vec::new(),
        },
        DecodeOutcome::Message(message) => {
            let mut notifications = Vec::new();
            let reply = dispatch_single(message, registry, version, &mut notifications).await;
            DispatchResult { reply, notifications }
        }
        DecodeOutcome::Batch(elements) => dispatch_batch(elements, registry, version).await,
    }
}

async fn dispatch_batch(
    elements: Vec<DecodeOutcome>,
    registry: &MethodRegistry,
    version: JsonRpcVersion,
) -> DispatchResult {
    let mut replies = Vec::new();
    let mut notifications = Vec::new();

    for element in elements {
        match element {
            DecodeOutcome::Invalid { error, id } => {
                replies.push(encode_error(error, id, version));
            }
            DecodeOutcome::Message(message) => {
                if let Some(reply) = dispatch_single(message, registry, version, &mut notifications).await {
                    replies.push(reply);
                }
            }
            DecodeOutcome::Batch(_) => {
                // A batch element is itself an array, which is never a
                // valid single request object (spec.md §4.2 step 3).
                replies.push(encode_error(
                    JsonRpcError::new(ErrorCode::InvalidRequest),
                    None,
                    version,
                ));
            }
        }
    }

    DispatchResult {
        reply: if replies.is_empty() { None } else { Some(Value::Array(replies)) },
        notifications,
    }
}

async fn dispatch_single(
    message: Message,
    registry: &MethodRegistry,
    version: JsonRpcVersion,
    notifications: &mut Vec<(String, Value)>,
) -> Option<Value> {
    match message {
        Message::Notification(notification) => {
            notifications.push((notification.method, notification.params.unwrap_or(Value::Null)));
            None
        }
        Message::Request(request) => {
            let Some(handler) = registry.get(&request.method).cloned() else {
                tracing::debug!(method = %request.method, id = request.id.get(), "method not found");
                return Some(encode_error(
                    JsonRpcError::new(ErrorCode::MethodNotFound),
                    Some(request.id),
                    version,
                ));
            };

            let params = request.params.unwrap_or(Value::Array(Vec::new()));
            match handler.call(params).await {
                Ok(result) => Some(encode_message(&Message::response(result, request.id), version)),
                Err(HandlerFailure::InvalidParams(detail)) => {
                    tracing::debug!(method = %request.method, id = request.id.get(), %detail, "invalid params");
                    Some(encode_error(
                        JsonRpcError::with_data(ErrorCode::InvalidParams, Value::String(detail)),
                        Some(request.id),
                        version,
                    ))
                }
                Err(HandlerFailure::Internal(detail)) => {
                    tracing::warn!(method = %request.method, id = request.id.get(), %detail, "handler failed");
                    Some(encode_error(
                        JsonRpcError::internal(detail),
                        Some(request.id),
                        version,
                    ))
                }
            }
        }
        // A response/error-response arriving on the server's inbound side
        // is not a request this endpoint can answer meaningfully.
        Message::Response(response) => Some(encode_error(
            JsonRpcError::new(ErrorCode::InvalidRequest),
            Some(response.id),
            version,
        )),
        Message::ErrorResponse(error_response) => Some(encode_error(
            JsonRpcError::new(ErrorCode::InvalidRequest),
            error_response.id,
            version,
        )),
        Message::Batch(_) => None,
    }
}

fn encode_error(error: JsonRpcError, id: Option<Id>, version: JsonRpcVersion) -> Value {
    encode_message(&Message::error_response(error, id), version)
}
