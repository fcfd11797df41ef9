use jsonrpc_core::{decode_frame, DecodeOutcome, JsonRpcVersion, Message};
use serde_json::Value;
use tracing::warn;

use crate::correlation::CorrelationTable;
use crate::subscriptions::Subscriptions;

/// Classify one frame read off a persistent (stream/WS) connection and
/// route it to the correlation table or the subscription registry
/// (spec.md §4.2, §4.4, §4.5).
///
/// Requests arriving on a connection the client opened would be a peer
/// protocol violation (this client never registers methods of its own);
/// they are logged and dropped rather than answered.
pub async fn route_incoming(
    frame: &str,
    version: JsonRpcVersion,
    correlation: &CorrelationTable,
    subscriptions: &Subscriptions,
) {
    match decode_frame(frame, version) {
        DecodeOutcome::Message(Message::Response(response)) => {
            correlation.resolve(response.id, response.result).await;
        }
        DecodeOutcome::Message(Message::ErrorResponse(error)) => {
            if let Some(id) = error.id {
                correlation.reject(id, error.error).await;
            } else {
                warn!("dropping error response with no id to correlate: {:?}", error.error);
            }
        }
        DecodeOutcome::Message(Message::Notification(notification)) => {
            subscriptions
                .dispatch(&notification.method, notification.params.unwrap_or(Value::Null))
                .await;
        }
        DecodeOutcome::Message(Message::Request(request)) => {
            warn!("dropping unexpected server-to-client request for method {}", request.method);
        }
        DecodeOutcome::Message(Message::Batch(_)) => {
            // decode_frame never produces this variant directly; batches
            // surface as DecodeOutcome::Batch below.
        }
        DecodeOutcome::Batch(_) => {
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(frame) {
                if !correlation.match_batch(items).await {
                    warn!("received batch response matching no pending batch");
                }
            }
        }
        DecodeOutcome::Invalid { error, .. } => {
            warn!("dropping malformed frame from peer: {}", error.message);
        }
    }
}
