//! Crate-level tests exercising the framing buffer, codec, and message
//! model together, as a client or server would chain them.

use serde_json::json;

use crate::{
    decode_frame, encode_message, DecodeOutcome, ErrorCode, FramingBuffer, Id, JsonRpcError,
    JsonRpcVersion, Message,
};

#[test]
fn frame_then_decode_then_encode_round_trip() {
    let mut buf = FramingBuffer::new(b"\n".to_vec());
    buf.push(b"{\"jsonrpc\":\"2.0\",\"method\":\"sum\",\"params\":[1,2],\"id\":7}\n");
    let frames = buf.extract();
    assert_eq!(frames.len(), 1);

    let decoded = decode_frame(&frames[0], JsonRpcVersion::V2);
    let message = match decoded {
        DecodeOutcome::Message(message) => message,
        other => panic!("expected a message, got {other:?}"),
    };
    assert_eq!(message.id(), Some(Id::new(7)));

    let reply = Message::response(json!(3), Id::new(7));
    let encoded = encode_message(&reply, JsonRpcVersion::V2);
    assert_eq!(encoded["id"], json!(7));
    assert_eq!(encoded["result"], json!(3));
}

#[test]
fn batch_frame_decodes_to_mixed_outcomes() {
    let text = r#"[
        {"jsonrpc":"2.0","method":"sum","params":[1,2],"id":1},
        {"jsonrpc":"2.0","method":"sum","params":"bad","id":2},
        {"jsonrpc":"2.0","method":"notify_only","params":[]}
    ]"#;
    let outcome = decode_frame(text, JsonRpcVersion::V2);
    let elements = match outcome {
        DecodeOutcome::Batch(elements) => elements,
        other => panic!("expected a batch, got {other:?}"),
    };
    assert_eq!(elements.len(), 3);
    assert!(matches!(elements[0], DecodeOutcome::Message(Message::Request(_))));
    assert!(matches!(
        &elements[1],
        DecodeOutcome::Invalid { error, .. } if error.code == ErrorCode::InvalidParams.code()
    ));
    assert!(matches!(elements[2], DecodeOutcome::Message(Message::Notification(_))));
}

#[test]
fn error_code_round_trips_through_from_code() {
    for code in [
        ErrorCode::ParseError,
        ErrorCode::InvalidRequest,
        ErrorCode::MethodNotFound,
        ErrorCode::InvalidParams,
        ErrorCode::InternalError,
        ErrorCode::RequestTimeout,
    ] {
        assert_eq!(ErrorCode::from_code(code.code()), Some(code));
    }
    assert_eq!(ErrorCode::from_code(-1), None);
}

#[test]
fn error_display_and_wire_shape_agree() {
    let error = JsonRpcError::new(ErrorCode::MethodNotFound);
    assert_eq!(error.code, -32601);
    assert_eq!(error.message, "Method not found");
    assert!(error.data.is_none());

    let with_data = JsonRpcError::with_data(ErrorCode::InvalidParams, json!({"field": "id"}));
    let value = serde_json::to_value(&with_data).unwrap();
    assert_eq!(value["data"]["field"], "id");
}

#[test]
fn id_orders_and_displays_numerically() {
    let ids: Vec<Id> = vec![Id::new(3), Id::new(1), Id::new(2)];
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(sorted, vec![Id::new(1), Id::new(2), Id::new(3)]);
    assert_eq!(Id::new(42).to_string(), "42");
}
