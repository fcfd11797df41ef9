use std::time::Duration;

use jsonrpc_core::{ErrorCode, JsonRpcError};
use thiserror::Error;

/// Errors a [`crate::Client`] can surface to its caller.
///
/// This is distinct from [`JsonRpcError`], the wire shape a peer sends
/// back: a `ClientError` also covers failures that never reach the wire
/// (timeouts, transport breakage, misuse of the subscription API).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server returned JSON-RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },
    #[error("request timed out after {duration:?}")]
    Timeout { duration: Duration, error: JsonRpcError },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("client is closed")]
    Closed,
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("\"{0}\" is a reserved event name")]
    ReservedEventName(String),
    #[error("batch id set overlaps a batch already pending on this client")]
    OverlappingBatch,
    #[error("batch response contained one or more errors")]
    BatchRejected(Vec<serde_json::Value>),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    pub fn from_wire(error: JsonRpcError) -> Self {
        ClientError::Rpc {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }

    /// The synthetic timeout error a peer never actually sends (spec §7),
    /// carried on [`ClientError::Timeout`] so callers inspecting the wire
    /// shape of a failure see the same `-32000` either way.
    pub fn synthesize_timeout() -> JsonRpcError {
        JsonRpcError::new(ErrorCode::RequestTimeout)
    }

    pub fn timeout(duration: Duration) -> Self {
        ClientError::Timeout { duration, error: Self::synthesize_timeout() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_carries_the_synthesized_request_timeout_error() {
        let err = ClientError::timeout(Duration::from_secs(1));
        match err {
            ClientError::Timeout { duration, error } => {
                assert_eq!(duration, Duration::from_secs(1));
                assert_eq!(error.code, -32000);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }
}
