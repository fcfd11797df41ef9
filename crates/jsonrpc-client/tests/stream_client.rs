//! Literal-I/O scenarios over an in-process duplex stream, standing in for
//! a socket peer the client wasn't told is fake.

use std::time::Duration;

use jsonrpc_client::{Client, ClientConfig, ClientError, ClientTransportConfig};
use jsonrpc_core::{decode_frame, DecodeOutcome, FramingBuffer, JsonRpcVersion, Message};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn test_client(timeout: Duration) -> Client {
    let config = ClientConfig::builder(ClientTransportConfig::Stream { addr: "unused:0".into() })
        .timeout(timeout)
        .build();
    Client::new(config)
}

/// Reads one frame off `peer` and returns its decoded request, leaving the
/// peer ready to write a reply frame back.
async fn read_one_request(peer: &mut tokio::io::DuplexStream) -> jsonrpc_core::Request {
    let mut framing = FramingBuffer::new(b"\n".to_vec());
    let mut buf = [0u8; 4096];
    loop {
        let n = peer.read(&mut buf).await.unwrap();
        framing.push(&buf[..n]);
        let frames = framing.extract();
        if let Some(frame) = frames.into_iter().next() {
            match decode_frame(&frame, JsonRpcVersion::V2) {
                DecodeOutcome::Message(Message::Request(request)) => return request,
                other => panic!("expected a request, got {other:?}"),
            }
        }
    }
}

async fn write_frame(peer: &mut tokio::io::DuplexStream, value: Value) {
    let mut text = serde_json::to_string(&value).unwrap();
    text.push('\n');
    peer.write_all(text.as_bytes()).await.unwrap();
}

#[tokio::test]
async fn s1_positional_add_over_stream() {
    let client = test_client(Duration::from_secs(5));
    let (client_side, mut peer) = tokio::io::duplex(4096);
    let (reader, writer) = tokio::io::split(client_side);
    client.connect_with_stream(reader, writer).await.unwrap();

    let send = tokio::spawn({
        let client = client.clone();
        async move { client.send("add", Some(json!([1, 2]))).await }
    });

    let request = read_one_request(&mut peer).await;
    assert_eq!(request.method, "add");
    assert_eq!(request.params, Some(json!([1, 2])));
    assert_eq!(request.id.get(), 1);

    write_frame(&mut peer, json!({"jsonrpc":"2.0","result":3,"id":1})).await;

    let result = send.await.unwrap().unwrap();
    assert_eq!(result, json!(3));
}

#[tokio::test]
async fn s2_method_not_found_is_third_call() {
    let client = test_client(Duration::from_secs(5));
    let (client_side, mut peer) = tokio::io::duplex(4096);
    let (reader, writer) = tokio::io::split(client_side);
    client.connect_with_stream(reader, writer).await.unwrap();

    for _ in 0..2 {
        let send = tokio::spawn({
            let client = client.clone();
            async move { client.send("add", Some(json!([1, 2]))).await }
        });
        let request = read_one_request(&mut peer).await;
        write_frame(&mut peer, json!({"jsonrpc":"2.0","result":3,"id":request.id.get()})).await;
        send.await.unwrap().unwrap();
    }

    let send = tokio::spawn({
        let client = client.clone();
        async move { client.send("nonexistent", Some(json!([]))).await }
    });
    let request = read_one_request(&mut peer).await;
    assert_eq!(request.id.get(), 3);
    write_frame(
        &mut peer,
        json!({"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":3}),
    )
    .await;

    let error = send.await.unwrap().unwrap_err();
    match error {
        ClientError::Rpc { code, message, .. } => {
            assert_eq!(code, -32601);
            assert_eq!(message, "Method not found");
        }
        other => panic!("expected an Rpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn s5_batch_resolves_with_both_results() {
    let client = test_client(Duration::from_secs(5));
    let (client_side, mut peer) = tokio::io::duplex(4096);
    let (reader, writer) = tokio::io::split(client_side);
    client.connect_with_stream(reader, writer).await.unwrap();

    let first = client.message("add", Some(json!([1, 2])), true);
    let second = client.message("add", Some(json!([3, 4])), true);
    assert!(first.contains("\"id\":1"));
    assert!(second.contains("\"id\":2"));

    let batch = tokio::spawn({
        let client = client.clone();
        async move { client.batch(vec![first, second]).await }
    });

    let mut framing = FramingBuffer::new(b"\n".to_vec());
    let mut buf = [0u8; 4096];
    let n = peer.read(&mut buf).await.unwrap();
    framing.push(&buf[..n]);
    let frame = framing.extract().into_iter().next().unwrap();
    let incoming: Value = serde_json::from_str(&frame).unwrap();
    assert!(incoming.is_array());

    write_frame(
        &mut peer,
        json!([
            {"jsonrpc":"2.0","result":3,"id":1},
            {"jsonrpc":"2.0","result":7,"id":2},
        ]),
    )
    .await;

    let result = batch.await.unwrap().unwrap();
    assert_eq!(result, vec![json!({"jsonrpc":"2.0","result":3,"id":1}), json!({"jsonrpc":"2.0","result":7,"id":2})]);
}

#[tokio::test(start_paused = true)]
async fn s6_timeout_produces_synthetic_error() {
    let client = test_client(Duration::from_millis(0));
    let (client_side, mut peer) = tokio::io::duplex(4096);
    let (reader, writer) = tokio::io::split(client_side);
    client.connect_with_stream(reader, writer).await.unwrap();

    let send = tokio::spawn({
        let client = client.clone();
        async move { client.send("timeout", None).await }
    });

    let _request = read_one_request(&mut peer).await;
    tokio::time::advance(Duration::from_millis(10)).await;

    let error = send.await.unwrap().unwrap_err();
    match error {
        ClientError::Timeout { error, .. } => assert_eq!(error.code, -32000),
        other => panic!("expected Timeout, got {other:?}"),
    }

    // The handler "resolves after 10ms" per the scenario; that late
    // response must settle nothing observable (S6).
    write_frame(&mut peer, json!({"jsonrpc":"2.0","result":"late","id":1})).await;
}

#[tokio::test]
async fn i1_ids_are_strictly_increasing_from_one() {
    let client = test_client(Duration::from_secs(5));
    let (client_side, mut peer) = tokio::io::duplex(4096);
    let (reader, writer) = tokio::io::split(client_side);
    client.connect_with_stream(reader, writer).await.unwrap();

    for expected_id in 1..=3u64 {
        let send = tokio::spawn({
            let client = client.clone();
            async move { client.send("ping", None).await }
        });
        let request = read_one_request(&mut peer).await;
        assert_eq!(request.id.get(), expected_id);
        write_frame(&mut peer, json!({"jsonrpc":"2.0","result":null,"id":expected_id})).await;
        send.await.unwrap().unwrap();
    }
}
