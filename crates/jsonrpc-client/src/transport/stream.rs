use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jsonrpc_core::{FramingBuffer, JsonRpcVersion};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::correlation::CorrelationTable;
use crate::route::route_incoming;
use crate::subscriptions::Subscriptions;

/// A live stream-transport connection: a writer task owns the socket's
/// write half, a reader task owns the read half and feeds decoded frames
/// back through [`route_incoming`] (grounded on the split reader/writer
/// task pair a stdio JSON-RPC transport uses).
pub struct StreamConnection {
    writer: mpsc::UnboundedSender<Vec<u8>>,
    tasks: Vec<JoinHandle<()>>,
    closed: Arc<AtomicBool>,
}

impl StreamConnection {
    pub async fn connect(
        addr: &str,
        delimiter: Vec<u8>,
        version: JsonRpcVersion,
        correlation: Arc<CorrelationTable>,
        subscriptions: Arc<Subscriptions>,
    ) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self::spawn(read_half, write_half, delimiter, version, correlation, subscriptions))
    }

    pub fn spawn<R, W>(
        reader: R,
        writer: W,
        delimiter: Vec<u8>,
        version: JsonRpcVersion,
        correlation: Arc<CorrelationTable>,
        subscriptions: Arc<Subscriptions>,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let closed = Arc::new(AtomicBool::new(false));

        let writer_handle = tokio::spawn(writer_task(writer, rx));
        let reader_handle = tokio::spawn(reader_task(
            reader,
            delimiter,
            version,
            correlation,
            subscriptions,
            closed.clone(),
        ));

        Self {
            writer: tx,
            tasks: vec![writer_handle, reader_handle],
            closed,
        }
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

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn writer_task<W: AsyncWrite + Unpin>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(frame) = rx.recv().await {
        if writer.write_all(&frame).await.is_err() {
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
    correlation: Arc<CorrelationTable>,
    subscriptions: Arc<Subscriptions>,
    closed: Arc<AtomicBool>,
) {
    let mut framing = FramingBuffer::new(delimiter);
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                framing.push(&buf[..n]);
                for frame in framing.extract() {
                    route_incoming(&frame, version, &correlation, &subscriptions).await;
                }
            }
        }
    }
    closed.store(true, Ordering::SeqCst);
    correlation.fail_all().await;
    subscriptions.dispatch_disconnected().await;
}
