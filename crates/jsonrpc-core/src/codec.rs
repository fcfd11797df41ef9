use serde_json::{Map, Value};

use crate::error::{ErrorCode, JsonRpcError};
use crate::id::Id;
use crate::message::{ErrorResponse, Message, Notification, Request, Response};
use crate::version::JsonRpcVersion;

/// The result of classifying one decoded JSON value against the shape
/// rules in spec.md §4.2.
///
/// A top-level array recurses into [`DecodeOutcome::Batch`]; everything
/// else either becomes a well-formed [`Message`] or fails with one of the
/// three decode-time error codes (`ParseError` only ever comes from
/// [`decode_frame`] itself, since by the time we have a [`Value`] the JSON
/// has already parsed).
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    Message(Message),
    Invalid { error: JsonRpcError, id: Option<Id> },
    Batch(Vec<DecodeOutcome>),
}

/// Parse a single stream/HTTP/WS frame and classify it.
pub fn decode_frame(text: &str, version: JsonRpcVersion) -> DecodeOutcome {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => decode_value(value, version),
        Err(_) => DecodeOutcome::Invalid {
            error: JsonRpcError::new(ErrorCode::ParseError),
            id: None,
        },
    }
}

fn decode_value(value: Value, version: JsonRpcVersion) -> DecodeOutcome {
    match value {
        Value::Array(elements) => {
            if elements.is_empty() {
                DecodeOutcome::Invalid {
                    error: JsonRpcError::new(ErrorCode::InvalidRequest),
                    id: None,
                }
            } else {
                DecodeOutcome::Batch(
                    elements
                        .into_iter()
                        .map(|element| decode_value(element, version))
                        .collect(),
                )
            }
        }
        Value::Object(map) => decode_object(map, version),
        _ => DecodeOutcome::Invalid {
            error: JsonRpcError::new(ErrorCode::InvalidRequest),
            id: None,
        },
    }
}

fn decode_object(map: Map<String, Value>, version: JsonRpcVersion) -> DecodeOutcome {
    let id_field = map.get("id");

    match map.get("method") {
        Some(method_value) if !method_value.is_string() => DecodeOutcome::Invalid {
            error: JsonRpcError::new(ErrorCode::InvalidRequest),
            id: parse_id(id_field).flatten(),
        },
        Some(method_value) => {
            let method = method_value.as_str().expect("checked is_string").to_string();

            if let Some(mismatch) = version_mismatch(&map, version) {
                return mismatch;
            }

            let params = map.get("params").cloned();
            if let Some(params) = &params {
                if !(params.is_array() || params.is_object()) {
                    return DecodeOutcome::Invalid {
                        error: JsonRpcError::new(ErrorCode::InvalidParams),
                        id: parse_id(id_field).flatten(),
                    };
                }
            }

            match id_field {
                None => DecodeOutcome::Message(Message::Notification(Notification {
                    method,
                    params,
                })),
                Some(_) => match parse_id(id_field) {
                    Some(Some(id)) => DecodeOutcome::Message(Message::Request(Request {
                        method,
                        params,
                        id,
                    })),
                    _ => DecodeOutcome::Invalid {
                        error: JsonRpcError::new(ErrorCode::InvalidRequest),
                        id: None,
                    },
                },
            }
        }
        None => {
            let result = map.get("result");
            let error = map.get("error").filter(|value| !value.is_null());

            if result.is_none() && error.is_none() {
                return DecodeOutcome::Invalid {
                    error: JsonRpcError::new(ErrorCode::InvalidRequest),
                    id: parse_id(id_field).flatten(),
                };
            }

            if let Some(mismatch) = version_mismatch(&map, version) {
                return mismatch;
            }

            if let Some(error_value) = error {
                match serde_json::from_value::<JsonRpcError>(error_value.clone()) {
                    Ok(wire_error) => {
                        DecodeOutcome::Message(Message::ErrorResponse(ErrorResponse {
                            error: wire_error,
                            id: parse_id(id_field).flatten(),
                        }))
                    }
                    Err(_) => DecodeOutcome::Invalid {
                        error: JsonRpcError::new(ErrorCode::InvalidRequest),
                        id: None,
                    },
                }
            } else {
                match parse_id(id_field) {
                    Some(Some(id)) => DecodeOutcome::Message(Message::Response(Response {
                        result: result.cloned().unwrap_or(Value::Null),
                        id,
                    })),
                    _ => DecodeOutcome::Invalid {
                        error: JsonRpcError::new(ErrorCode::InvalidRequest),
                        id: None,
                    },
                }
            }
        }
    }
}

/// `Some(outcome)` if `jsonrpc` is present and doesn't match, `None` if the
/// field is absent or matches.
fn version_mismatch(
    map: &Map<String, Value>,
    version: JsonRpcVersion,
) -> Option<DecodeOutcome> {
    match map.get("jsonrpc") {
        Some(value) if value.as_str() != Some(version.as_str()) => Some(DecodeOutcome::Invalid {
            error: JsonRpcError::new(ErrorCode::InvalidRequest),
            id: parse_id(map.get("id")).flatten(),
        }),
        _ => None,
    }
}

/// `None` if the `id` key is absent, `Some(None)` if present but not a
/// representable non-negative integer, `Some(Some(id))` otherwise.
fn parse_id(value: Option<&Value>) -> Option<Option<Id>> {
    value.map(|v| v.as_u64().map(Id::new))
}

/// Serialize a [`Message`] to its wire JSON shape (spec.md §4.2).
pub fn encode_message(message: &Message, version: JsonRpcVersion) -> Value {
    match message {
        Message::Request(req) => {
            let mut obj = Map::new();
            obj.insert("jsonrpc".into(), Value::String(version.as_str().into()));
            obj.insert("method".into(), Value::String(req.method.clone()));
            obj.insert(
                "params".into(),
                req.params.clone().unwrap_or(Value::Array(Vec::new())),
            );
            obj.insert("id".into(), Value::from(req.id.get()));
            Value::Object(obj)
        }
        Message::Notification(note) => {
            let mut obj = Map::new();
            obj.insert("jsonrpc".into(), Value::String(version.as_str().into()));
            obj.insert("method".into(), Value::String(note.method.clone()));
            obj.insert(
                "params".into(),
                note.params.clone().unwrap_or(Value::Array(Vec::new())),
            );
            Value::Object(obj)
        }
        Message::Response(resp) => encode_response(version, Some(resp.result.clone()), None, Some(resp.id)),
        Message::ErrorResponse(err) => encode_response(version, None, Some(err.error.clone()), err.id),
        Message::Batch(messages) => Value::Array(
            messages
                .iter()
                .map(|message| encode_message(message, version))
                .collect(),
        ),
    }
}

fn encode_response(
    version: JsonRpcVersion,
    result: Option<Value>,
    error: Option<JsonRpcError>,
    id: Option<Id>,
) -> Value {
    let mut obj = Map::new();
    match version {
        JsonRpcVersion::V2 => {
            obj.insert("jsonrpc".into(), Value::String("2.0".into()));
            match (result, error) {
                (_, Some(error)) => {
                    obj.insert("error".into(), serde_json::to_value(error).expect("error serializes"));
                }
                (Some(result), None) => {
                    obj.insert("result".into(), result);
                }
                (None, None) => {
                    obj.insert("result".into(), Value::Null);
                }
            }
        }
        JsonRpcVersion::V1 => {
            obj.insert("result".into(), result.unwrap_or(Value::Null));
            obj.insert(
                "error".into(),
                error
                    .map(|e| serde_json::to_value(e).expect("error serializes"))
                    .unwrap_or(Value::Null),
            );
        }
    }
    obj.insert("id".into(), id.map(|id| Value::from(id.get())).unwrap_or(Value::Null));
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_well_formed_request() {
        let outcome = decode_frame(r#"{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}"#, JsonRpcVersion::V2);
        assert_eq!(
            outcome,
            DecodeOutcome::Message(Message::Request(Request {
                method: "add".into(),
                params: Some(json!([1, 2])),
                id: Id::new(1),
            }))
        );
    }

    #[test]
    fn missing_id_is_notification() {
        let outcome = decode_frame(r#"{"jsonrpc":"2.0","method":"ping","params":[]}"#, JsonRpcVersion::V2);
        assert!(matches!(outcome, DecodeOutcome::Message(Message::Notification(_))));
    }

    #[test]
    fn empty_batch_is_invalid_request() {
        let outcome = decode_frame("[]", JsonRpcVersion::V2);
        assert_eq!(
            outcome,
            DecodeOutcome::Invalid {
                error: JsonRpcError::new(ErrorCode::InvalidRequest),
                id: None,
            }
        );
    }

    #[test]
    fn non_object_is_invalid_request() {
        let outcome = decode_frame("\"just a string\"", JsonRpcVersion::V2);
        assert_eq!(
            outcome,
            DecodeOutcome::Invalid {
                error: JsonRpcError::new(ErrorCode::InvalidRequest),
                id: None,
            }
        );
    }

    #[test]
    fn non_string_method_is_invalid_request_but_keeps_id() {
        let outcome = decode_frame(r#"{"jsonrpc":"2.0","method":1,"params":[],"id":69}"#, JsonRpcVersion::V2);
        assert_eq!(
            outcome,
            DecodeOutcome::Invalid {
                error: JsonRpcError::new(ErrorCode::InvalidRequest),
                id: Some(Id::new(69)),
            }
        );
    }

    #[test]
    fn version_mismatch_is_invalid_request() {
        let outcome = decode_frame(r#"{"jsonrpc":"1.0","method":"add","params":[],"id":1}"#, JsonRpcVersion::V2);
        assert_eq!(
            outcome,
            DecodeOutcome::Invalid {
                error: JsonRpcError::new(ErrorCode::InvalidRequest),
                id: Some(Id::new(1)),
            }
        );
    }

    #[test]
    fn non_array_object_params_is_invalid_params() {
        let outcome = decode_frame(r#"{"jsonrpc":"2.0","method":"add","params":"nope","id":1}"#, JsonRpcVersion::V2);
        assert_eq!(
            outcome,
            DecodeOutcome::Invalid {
                error: JsonRpcError::new(ErrorCode::InvalidParams),
                id: Some(Id::new(1)),
            }
        );
    }

    #[test]
    fn decodes_batch_recursively() {
        let outcome = decode_frame(
            r#"[{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1},{"jsonrpc":"2.0","method":"add","params":[3,4],"id":2}]"#,
            JsonRpcVersion::V2,
        );
        match outcome {
            DecodeOutcome::Batch(elements) => assert_eq!(elements.len(), 2),
            other => panic!("expected batch, got {other:?}"),
        }
    }

    #[test]
    fn decodes_success_response() {
        let outcome = decode_frame(r#"{"jsonrpc":"2.0","result":3,"id":1}"#, JsonRpcVersion::V2);
        assert_eq!(
            outcome,
            DecodeOutcome::Message(Message::Response(Response {
                result: json!(3),
                id: Id::new(1),
            }))
        );
    }

    #[test]
    fn decodes_error_response() {
        let outcome = decode_frame(
            r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":3}"#,
            JsonRpcVersion::V2,
        );
        assert_eq!(
            outcome,
            DecodeOutcome::Message(Message::ErrorResponse(ErrorResponse {
                error: JsonRpcError::new(ErrorCode::MethodNotFound),
                id: Some(Id::new(3)),
            }))
        );
    }

    #[test]
    fn round_trips_request() {
        let message = Message::request("add", Some(json!([1, 2])), Id::new(1));
        let encoded = encode_message(&message, JsonRpcVersion::V2);
        let text = serde_json::to_string(&encoded).unwrap();
        let decoded = decode_frame(&text, JsonRpcVersion::V2);
        assert_eq!(decoded, DecodeOutcome::Message(message));
    }

    #[test]
    fn round_trips_error_response() {
        let message = Message::error_response(JsonRpcError::new(ErrorCode::MethodNotFound), Some(Id::new(3)));
        let encoded = encode_message(&message, JsonRpcVersion::V2);
        let text = serde_json::to_string(&encoded).unwrap();
        let decoded = decode_frame(&text, JsonRpcVersion::V2);
        assert_eq!(decoded, DecodeOutcome::Message(message));
    }

    #[test]
    fn legacy_response_has_null_error_field() {
        let message = Message::response(json!(3), Id::new(1));
        let encoded = encode_message(&message, JsonRpcVersion::V1);
        assert_eq!(encoded["error"], Value::Null);
        assert_eq!(encoded["result"], json!(3));
        assert!(encoded.get("jsonrpc").is_none());
    }

    #[test]
    fn error_response_with_no_id_encodes_id_as_null() {
        let message = Message::error_response(JsonRpcError::new(ErrorCode::ParseError), None);
        let encoded = encode_message(&message, JsonRpcVersion::V2);
        assert_eq!(encoded["id"], Value::Null);
    }
}
