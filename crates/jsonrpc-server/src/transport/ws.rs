use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use jsonrpc_core::{FramingBuffer, JsonRpcVersion};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::clients::ConnectedClients;
use crate::dispatch::dispatch;
use crate::events::ServerEvents;
use crate::registry::MethodRegistry;

/// Accept loop for the WebSocket transport, symmetric with the stream
/// transport's `spawn_listener` but splitting each accepted socket's sink
/// and stream the way `jsonrpc-client`'s WS transport does on the way out.
pub fn spawn_listener(
    listener: TcpListener,
    delimiter: Vec<u8>,
    version: JsonRpcVersion,
    registry: Arc<MethodRegistry>,
    events: Arc<ServerEvents>,
    clients: ConnectedClients,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(%err, "ws accept failed");
                    break;
                }
            };
            let delimiter = delimiter.clone();
            let version = version;
            let registry = registry.clone();
            let events = events.clone();
            let clients = clients.clone();

            tokio::spawn(async move {
                let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws_stream) => ws_stream,
                    Err(err) => {
                        tracing::debug!(%peer, %err, "ws handshake failed");
                        return;
                    }
                };
                handle_connection(ws_stream, delimiter, version, registry, events, clients).await;
            });
        }
    })
}

async fn handle_connection<S>(
    ws_stream: tokio_tungstenite::WebSocketStream<S>,
    delimiter: Vec<u8>,
    version: JsonRpcVersion,
    registry: Arc<MethodRegistry>,
    events: Arc<ServerEvents>,
    clients: ConnectedClients,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let client_id = clients.allocate_id();
    let (mut sink, mut stream) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

    clients.attach(client_id, tx.clone()).await;
    events.emit_client_connected(client_id).await;
    tracing::debug!(client_id, "ws client connected");

    let writer_handle = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = String::from_utf8_lossy(&frame).into_owned();
            if let Err(err) = sink.send(WsMessage::Text(text)).await {
                tracing::debug!(%err, "ws write failed, dropping connection");
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut framing = FramingBuffer::new(delimiter.clone());
    while let Some(message) = stream.next().await {
        match message {
            Ok(WsMessage::Text(text)) => {
                framing.push(text.as_bytes());
                for frame in framing.extract() {
                    handle_frame(&frame, &delimiter, version, &registry, &events, &tx).await;
                }
            }
            Ok(WsMessage::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    writer_handle.abort();
    clients.detach(client_id).await;
    events.emit_client_disconnected(client_id).await;
    tracing::debug!(client_id, "ws client disconnected");
}

async fn handle_frame(
    frame: &str,
    delimiter: &[u8],
    version: JsonRpcVersion,
    registry: &MethodRegistry,
    events: &ServerEvents,
    reply_to: &mpsc::UnboundedSender<Vec<u8>>,
) {
    let result = dispatch(frame, registry, version).await;
    for (method, params) in result.notifications {
        events.emit_notify(&method, params).await;
    }
    if let Some(reply) = result.reply {
        let mut bytes = serde_json::to_vec(&reply).unwrap_or_default();
        bytes.extend_from_slice(delimiter);
        let _ = reply_to.send(bytes);
    }
}
