use serde_json::Value;

use crate::error::JsonRpcError;
use crate::id::Id;

/// Request/notification parameters: either a positional array or a named
/// object (spec.md §3). Anything else fails codec validation before a
/// [`Params`] is ever constructed.
pub type Params = Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub params: Option<Params>,
    pub id: Id,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Option<Params>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub result: Value,
    pub id: Id,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: JsonRpcError,
    pub id: Option<Id>,
}

/// A single decoded, *structurally valid* JSON-RPC message (spec.md §3).
///
/// Invalid shapes never become a [`Message`] — see [`crate::DecodeOutcome`],
/// which carries the taxonomy for everything that fails validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Notification(Notification),
    Response(Response),
    ErrorResponse(ErrorResponse),
    Batch(Vec<Message>),
}

impl Message {
    pub fn request(method: impl Into<String>, params: Option<Params>, id: Id) -> Self {
        Message::Request(Request {
            method: method.into(),
            params,
            id,
        })
    }

    pub fn notification(method: impl Into<String>, params: Option<Params>) -> Self {
        Message::Notification(Notification {
            method: method.into(),
            params,
        })
    }

    pub fn response(result: Value, id: Id) -> Self {
        Message::Response(Response { result, id })
    }

    pub fn error_response(error: JsonRpcError, id: Option<Id>) -> Self {
        Message::ErrorResponse(ErrorResponse { error, id })
    }

    /// The id carried by this message, if any (absent for notifications and
    /// for error responses answering an unparseable request).
    pub fn id(&self) -> Option<Id> {
        match self {
            Message::Request(r) => Some(r.id),
            Message::Notification(_) => None,
            Message::Response(r) => Some(r.id),
            Message::ErrorResponse(e) => e.id,
            Message::Batch(_) => None,
        }
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, Message::Notification(_))
    }
}
