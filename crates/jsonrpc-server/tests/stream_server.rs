use std::time::Duration;

use jsonrpc_server::{sync_handler, HandlerFailure, Server, ServerConfig, ServerTransportConfig};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn connect(addr: &str) -> TcpStream {
    for _ in 0..50 {
        if let Ok(stream) = TcpStream::connect(addr).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("server never came up on {addr}");
}

async fn round_trip(addr: &str, frame: &[u8]) -> serde_json::Value {
    let mut stream = connect(addr).await;
    stream.write_all(frame).await.unwrap();

    let mut buf = vec![0u8; 8192];
    let n = stream.read(&mut buf).await.unwrap();
    serde_json::from_slice(&buf[..n]).unwrap()
}

fn add_server(addr: &str) -> Server {
    let server = Server::new(ServerConfig::builder(ServerTransportConfig::Stream { bind_addr: addr.to_string() }).build());
    server.method(
        "add",
        sync_handler(|params| {
            let values: Vec<i64> = serde_json::from_value(params)
                .map_err(|err| HandlerFailure::invalid_params(err.to_string()))?;
            Ok(json!(values.iter().sum::<i64>()))
        }),
    );
    server
}

#[tokio::test]
async fn s1_positional_add_over_stream() {
    let addr = "127.0.0.1:18181";
    let server = add_server(addr);
    server.listen().await.unwrap();

    let reply = round_trip(addr, br#"{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}
"#)
        .await;
    assert_eq!(reply, json!({"jsonrpc":"2.0","result":3,"id":1}));

    server.close().await.unwrap();
}

#[tokio::test]
async fn s3_parse_error_has_null_id() {
    let addr = "127.0.0.1:18182";
    let server = add_server(addr);
    server.listen().await.unwrap();

    let reply = round_trip(addr, b"not json\n").await;
    assert_eq!(
        reply,
        json!({"jsonrpc":"2.0","error":{"code":-32700,"message":"Parse Error"},"id":null})
    );

    server.close().await.unwrap();
}

#[tokio::test]
async fn s4_non_string_method_keeps_the_id() {
    let addr = "127.0.0.1:18183";
    let server = add_server(addr);
    server.listen().await.unwrap();

    let reply = round_trip(addr, br#"{"jsonrpc":"2.0","method":1,"params":[],"id":69}
"#)
        .await;
    assert_eq!(
        reply,
        json!({"jsonrpc":"2.0","error":{"code":-32600,"message":"Invalid Request"},"id":69})
    );

    server.close().await.unwrap();
}

#[tokio::test]
async fn notify_event_fires_for_incoming_notifications() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let addr = "127.0.0.1:18184";
    let server = add_server(addr);
    let seen = Arc::new(AtomicBool::new(false));
    let seen_write = seen.clone();
    server
        .on_notify(move |method, _params| {
            if method == "ping" {
                seen_write.store(true, Ordering::SeqCst);
            }
        })
        .await;
    server.listen().await.unwrap();

    let mut stream = connect(addr).await;
    stream
        .write_all(br#"{"jsonrpc":"2.0","method":"ping","params":[]}
"#)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(seen.load(Ordering::SeqCst));
    server.close().await.unwrap();
}
