use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use jsonrpc_core::{FramingBuffer, JsonRpcVersion};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::correlation::CorrelationTable;
use crate::route::route_incoming;
use crate::subscriptions::Subscriptions;

/// A live WebSocket connection. Each outgoing text message carries exactly
/// one delimiter-terminated frame (spec.md §6.1); the framing buffer on
/// the read side tolerates a peer that batches several frames into one WS
/// message anyway.
pub struct WebSocketConnection {
    writer: mpsc::UnboundedSender<Vec<u8>>,
    tasks: Vec<JoinHandle<()>>,
    closed: Arc<AtomicBool>,
}

impl WebSocketConnection {
    pub async fn connect(
        url: &str,
        delimiter: Vec<u8>,
        version: JsonRpcVersion,
        correlation: Arc<CorrelationTable>,
        subscriptions: Arc<Subscriptions>,
    ) -> Result<Self, tokio_tungstenite::tungstenite::Error> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (mut sink, mut stream) = ws_stream.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let closed = Arc::new(AtomicBool::new(false));

        let writer_handle = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let text = String::from_utf8_lossy(&frame).into_owned();
                if sink.send(WsMessage::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader_closed = closed.clone();
        let reader_handle = tokio::spawn(async move {
            let mut framing = FramingBuffer::new(delimiter);
            while let Some(message) = stream.next().await {
                match message {
                    Ok(WsMessage::Text(text)) => {
                        framing.push(text.as_bytes());
                        for frame in framing.extract() {
                            route_incoming(&frame, version, &correlation, &subscriptions).await;
                        }
                    }
                    Ok(WsMessage::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            reader_closed.store(true, Ordering::SeqCst);
            correlation.fail_all().await;
            subscriptions.dispatch_disconnected().await;
        });

        Ok(Self {
            writer: tx,
            tasks: vec![writer_handle, reader_handle],
            closed,
        })
    }

    pub fn send(&self, frame: Vec<u8>) -> Result<(), ()> {
        self.writer.send(frame).map_err(|_| ())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}
