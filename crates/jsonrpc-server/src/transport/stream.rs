use std::sync::Arc;

use jsonrpc_core::{FramingBuffer, JsonRpcVersion};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::clients::ConnectedClients;
use crate::dispatch::dispatch;
use crate::events::ServerEvents;
use crate::registry::MethodRegistry;

/// Accept loop for the stream transport: one reader/writer task pair per
/// connection, mirroring the client's split (grounded on the reader/writer
/// task pattern `jsonrpc-client`'s stream transport uses, run in reverse —
/// here the server answers requests instead of originating them).
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
                    tracing::warn!(%err, "stream accept failed");
                    break;
                }
            };
            tracing::debug!(%peer, "stream client accepted");
            let (read_half, write_half) = stream.into_split();
            spawn_connection(
                read_half,
                write_half,
                delimiter.clone(),
                version,
                registry.clone(),
                events.clone(),
                clients.clone(),
            );
        }
    })
}

pub fn spawn_connection<R, W>(
    reader: R,
    writer: W,
    delimiter: Vec<u8>,
    version: JsonRpcVersion,
    registry: Arc<MethodRegistry>,
    events: Arc<ServerEvents>,
    clients: ConnectedClients,
) where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let client_id = clients.allocate_id();
    let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();

    tokio::spawn(async move {
        clients.attach(client_id, tx.clone()).await;
        events.emit_client_connected(client_id).await;
        tracing::debug!(client_id, "client connected");

        let writer_handle = tokio::spawn(writer_task(writer, rx));
        reader_task(reader, delimiter, version, &registry, &events, &tx).await;
        writer_handle.abort();

        clients.detach(client_id).await;
        events.emit_client_disconnected(client_id).await;
        tracing::debug!(client_id, "client disconnected");
    });
}

async fn writer_task<W: AsyncWrite + Unpin>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(frame) = rx.recv().await {
        if let Err(err) = writer.write_all(&frame).await {
            tracing::debug!(%err, "stream write failed, dropping connection");
            break;
        }
        if writer.flush().await.is_err() {
            break;
        }
    }
    let _ = writer.shutdown().await;
}

async fn reader_task<R: AsyncRead + Unpin>(
    mut reader: R,
    delimiter: Vec<u8>,
    version: JsonRpcVersion,
    registry: &MethodRegistry,
    events: &ServerEvents,
    reply_to: &mpsc::UnboundedSender<Vec<u8>>,
) {
    let mut framing = FramingBuffer::new(delimiter.clone());
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                framing.push(&buf[..n]);
                for frame in framing.extract() {
                    handle_frame(&frame, &delimiter, version, registry, events, reply_to).await;
                }
            }
        }
    }
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
