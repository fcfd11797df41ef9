use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed JSON-RPC error taxonomy (spec.md §4.3).
///
/// `RequestTimeout` is client-synthesized and never appears on the wire
/// (spec.md §7: "Request Timeout (-32000): client-synthesized, never sent
/// on the wire"); it is included here because the client still needs the
/// canonical code/message pair to build the synthetic [`JsonRpcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    RequestTimeout,
}

impl ErrorCode {
    pub const fn code(self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::RequestTimeout => -32000,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse Error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid Parameters",
            ErrorCode::InternalError => "Internal Error",
            ErrorCode::RequestTimeout => "Request Timeout",
        }
    }

    /// HTTP status an HTTP server transport maps this error to.
    ///
    /// `RequestTimeout`'s 408 is only relevant client-side (the client
    /// never emits an HTTP response of its own), included for completeness.
    pub const fn http_status(self) -> u16 {
        match self {
            ErrorCode::ParseError => 500,
            ErrorCode::InvalidRequest => 400,
            ErrorCode::MethodNotFound => 404,
            ErrorCode::InvalidParams => 400,
            ErrorCode::InternalError => 500,
            ErrorCode::RequestTimeout => 408,
        }
    }

    /// Classify a raw wire code back into the catalogue, if it matches one
    /// of the fixed entries. Used by the client to special-case a
    /// `-32000` it receives from a peer the same way it treats its own
    /// synthesized timeout (it still reports it to the caller as a normal
    /// rejection; this is only used where behavior needs to branch on it).
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            -32700 => Some(ErrorCode::ParseError),
            -32600 => Some(ErrorCode::InvalidRequest),
            -32601 => Some(ErrorCode::MethodNotFound),
            -32602 => Some(ErrorCode::InvalidParams),
            -32603 => Some(ErrorCode::InternalError),
            -32000 => Some(ErrorCode::RequestTimeout),
            _ => None,
        }
    }
}

/// The wire shape of a JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
            data: None,
        }
    }

    pub fn with_data(code: ErrorCode, data: Value) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
            data: Some(data),
        }
    }

    /// Internal Error carrying a handler's failure text as `message`
    /// (spec.md §4.6 step 5, §7).
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InternalError.code(),
            message: message.into(),
            data: None,
        }
    }
}

impl From<ErrorCode> for JsonRpcError {
    fn from(code: ErrorCode) -> Self {
        JsonRpcError::new(code)
    }
}
