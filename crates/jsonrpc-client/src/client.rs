use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use jsonrpc_core::{encode_message, Id, Message};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::{ClientConfig, ClientTransportConfig};
use crate::correlation::{BatchFailure, CallFailure, CorrelationTable};
use crate::error::ClientError;
use crate::state::ConnectionState;
use crate::subscriptions::{SubscriptionId, Subscriptions};
use crate::transport::http;
use crate::transport::stream::StreamConnection;
use crate::transport::ws::WebSocketConnection;

enum Connection {
    Stream(StreamConnection),
    WebSocket(WebSocketConnection),
}

impl Connection {
    fn send(&self, frame: Vec<u8>) -> Result<(), ()> {
        match self {
            Connection::Stream(conn) => conn.send(frame),
            Connection::WebSocket(conn) => conn.send(frame),
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Connection::Stream(conn) => conn.is_closed(),
            Connection::WebSocket(conn) => conn.is_closed(),
        }
    }

    fn shutdown(&mut self) {
        match self {
            Connection::Stream(conn) => conn.shutdown(),
            Connection::WebSocket(conn) => conn.shutdown(),
        }
    }
}

struct ClientInner {
    config: ClientConfig,
    next_id: AtomicU64,
    correlation: Arc<CorrelationTable>,
    subscriptions: Arc<Subscriptions>,
    state: Mutex<ConnectionState>,
    connection: Mutex<Option<Connection>>,
    http: reqwest::Client,
}

/// A JSON-RPC 2.0 client speaking one of three transports (spec.md §4.5,
/// §6.3). Cloning shares the same underlying connection, correlation
/// table, and subscriptions — the same pattern an `Arc`-backed async
/// client handle uses throughout this corpus.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                next_id: AtomicU64::new(1),
                correlation: Arc::new(CorrelationTable::new()),
                subscriptions: Arc::new(Subscriptions::new()),
                state: Mutex::new(ConnectionState::Idle),
                connection: Mutex::new(None),
                http: reqwest::Client::new(),
            }),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        *self.inner.state.lock().await
    }

    fn allocate_id(&self) -> Id {
        Id::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Build a request (or notification, if `want_id` is false) frame
    /// without sending it (spec.md §4.5, §6.3: `message(method, params,
    /// wantId)`). The frame is what [`Client::batch`] expects as input.
    pub fn message(&self, method: &str, params: Option<Value>, want_id: bool) -> String {
        let message = if want_id {
            Message::request(method, params, self.allocate_id())
        } else {
            Message::notification(method, params)
        };
        self.encode_framed(&message)
    }

    fn encode_framed(&self, message: &Message) -> String {
        let encoded = encode_message(message, self.inner.config.version);
        let mut text = serde_json::to_string(&encoded).expect("message serializes");
        if !matches!(self.inner.config.transport, ClientTransportConfig::Http { .. }) {
            text.push_str(&String::from_utf8_lossy(&self.inner.config.delimiter));
        }
        text
    }

    /// Connect a stream/WebSocket transport. A no-op that immediately
    /// succeeds for HTTP, which has no persistent connection (spec.md
    /// §4.5).
    pub async fn connect(&self) -> Result<(), ClientError> {
        let mut state = self.inner.state.lock().await;
        match &self.inner.config.transport {
            ClientTransportConfig::Http { .. } => {
                *state = ConnectionState::Open;
                Ok(())
            }
            ClientTransportConfig::Stream { addr } => {
                *state = ConnectionState::Connecting;
                match StreamConnection::connect(
                    addr,
                    self.inner.config.delimiter.clone(),
                    self.inner.config.version,
                    self.inner.correlation.clone(),
                    self.inner.subscriptions.clone(),
                )
                .await
                {
                    Ok(conn) => {
                        tracing::info!(addr, "stream connected");
                        *self.inner.connection.lock().await = Some(Connection::Stream(conn));
                        *state = ConnectionState::Open;
                        drop(state);
                        tokio::spawn(monitor_connection(self.inner.clone()));
                        Ok(())
                    }
                    Err(err) => {
                        tracing::warn!(addr, %err, "stream connect failed");
                        *state = ConnectionState::Idle;
                        Err(ClientError::ConnectFailed(err.to_string()))
                    }
                }
            }
            ClientTransportConfig::WebSocket { url, .. } => {
                *state = ConnectionState::Connecting;
                match WebSocketConnection::connect(
                    url,
                    self.inner.config.delimiter.clone(),
                    self.inner.config.version,
                    self.inner.correlation.clone(),
                    self.inner.subscriptions.clone(),
                )
                .await
                {
                    Ok(conn) => {
                        tracing::info!(url, "ws connected");
                        *self.inner.connection.lock().await = Some(Connection::WebSocket(conn));
                        *state = ConnectionState::Open;
                        drop(state);
                        tokio::spawn(monitor_connection(self.inner.clone()));
                        Ok(())
                    }
                    Err(err) => {
                        tracing::warn!(url, %err, "ws connect failed");
                        *state = ConnectionState::Idle;
                        Err(ClientError::ConnectFailed(err.to_string()))
                    }
                }
            }
        }
    }

    /// Attach an already-open duplex byte stream as the stream transport
    /// (e.g. a Unix socket, a pipe, or an in-process `tokio::io::duplex`
    /// pair in tests) instead of dialing `addr` from the config.
    pub async fn connect_with_stream<R, W>(&self, reader: R, writer: W) -> Result<(), ClientError>
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
        W: tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let mut state = self.inner.state.lock().await;
        *state = ConnectionState::Connecting;
        let connection = StreamConnection::spawn(
            reader,
            writer,
            self.inner.config.delimiter.clone(),
            self.inner.config.version,
            self.inner.correlation.clone(),
            self.inner.subscriptions.clone(),
        );
        *self.inner.connection.lock().await = Some(Connection::Stream(connection));
        *state = ConnectionState::Open;
        drop(state);
        tokio::spawn(monitor_connection(self.inner.clone()));
        Ok(())
    }

    /// Local, deliberate close (spec.md §4.5: "Any --local close--> Closed").
    pub async fn end(&self) -> Result<(), ClientError> {
        *self.inner.state.lock().await = ConnectionState::Closed;
        if let Some(mut connection) = self.inner.connection.lock().await.take() {
            connection.shutdown();
        }
        self.inner.correlation.fail_all().await;
        Ok(())
    }

    async fn write_frame(&self, frame: Vec<u8>) -> Result<(), ()> {
        match self.inner.connection.lock().await.as_ref() {
            Some(connection) => connection.send(frame),
            None => Err(()),
        }
    }

    pub async fn send(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        if matches!(self.inner.config.transport, ClientTransportConfig::Http { .. }) {
            let id = self.allocate_id();
            return self.send_http(Message::request(method, params, id)).await;
        }

        let id = self.allocate_id();
        let message = Message::request(method, params, id);
        let text = self.encode_framed(&message);

        let rx = self
            .inner
            .correlation
            .register(id, self.inner.config.timeout)
            .await;

        if self.write_frame(text.into_bytes()).await.is_err() {
            self.inner.correlation.fail(id, CallFailure::TransportClosed).await;
        }

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(CallFailure::Rpc(error))) => Err(ClientError::from_wire(error)),
            Ok(Err(CallFailure::TimedOut)) => Err(ClientError::timeout(self.inner.config.timeout)),
            Ok(Err(CallFailure::TransportClosed)) | Err(_) => Err(ClientError::Closed),
        }
    }

    async fn send_http(&self, message: Message) -> Result<Value, ClientError> {
        let ClientTransportConfig::Http { url, method, path, headers } = &self.inner.config.transport else {
            unreachable!("send_http only called for the HTTP transport")
        };
        let body = self.encode_framed(&message);
        let outcome = http::post_frame(&self.inner.http, url, method, path, headers, body).await?;
        let value: Value = serde_json::from_str(&outcome.body)
            .map_err(|_| ClientError::Transport("invalid JSON in HTTP response".into()))?;

        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            let wire = serde_json::from_value(error.clone())?;
            return Err(ClientError::from_wire(wire));
        }
        Ok(value.get("result").cloned().unwrap_or(Value::Null))
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        let message = Message::notification(method, params);
        if matches!(self.inner.config.transport, ClientTransportConfig::Http { .. }) {
            return self.notify_http(message).await;
        }

        let text = self.encode_framed(&message);
        self.write_frame(text.into_bytes())
            .await
            .map_err(|_| ClientError::Closed)
    }

    async fn notify_http(&self, message: Message) -> Result<(), ClientError> {
        let ClientTransportConfig::Http { url, method, path, headers } = &self.inner.config.transport else {
            unreachable!("notify_http only called for the HTTP transport")
        };
        let body = self.encode_framed(&message);
        let outcome = http::post_frame(&self.inner.http, url, method, path, headers, body).await?;
        if outcome.status == 204 {
            Ok(())
        } else {
            Err(ClientError::Transport(format!(
                "expected 204 for a notification, got {}",
                outcome.status
            )))
        }
    }

    /// Send a pre-built array of frames as one batch (spec.md §4.5, §9).
    pub async fn batch(&self, frames: Vec<String>) -> Result<Vec<Value>, ClientError> {
        let mut values = Vec::with_capacity(frames.len());
        let mut ids = Vec::new();
        for frame in &frames {
            let value: Value = serde_json::from_str(frame.trim_end())?;
            if let Some(id) = value.get("id").and_then(Value::as_u64) {
                ids.push(Id::new(id));
            }
            values.push(value);
        }

        if matches!(self.inner.config.transport, ClientTransportConfig::Http { .. }) {
            return self.batch_http(Value::Array(values)).await;
        }

        let claimed = self.inner.correlation.claimed_ids().await;
        if ids.iter().any(|id| claimed.contains(id)) {
            return Err(ClientError::OverlappingBatch);
        }

        let mut text = serde_json::to_string(&Value::Array(values))?;
        text.push_str(&String::from_utf8_lossy(&self.inner.config.delimiter));

        let rx = self
            .inner
            .correlation
            .register_batch(ids.clone(), self.inner.config.timeout)
            .await;

        if self.write_frame(text.into_bytes()).await.is_err() {
            self.inner
                .correlation
                .fail_batch(ids, BatchFailure::TransportClosed)
                .await;
        }

        match rx.await {
            Ok(Ok(values)) => Ok(values),
            Ok(Err(BatchFailure::Rejected(values))) => Err(ClientError::BatchRejected(values)),
            Ok(Err(BatchFailure::TimedOut)) => Err(ClientError::timeout(self.inner.config.timeout)),
            Ok(Err(BatchFailure::TransportClosed)) | Err(_) => Err(ClientError::Closed),
        }
    }

    async fn batch_http(&self, array: Value) -> Result<Vec<Value>, ClientError> {
        let ClientTransportConfig::Http { url, method, path, headers } = &self.inner.config.transport else {
            unreachable!("batch_http only called for the HTTP transport")
        };
        let body = serde_json::to_string(&array)?;
        let outcome = http::post_frame(&self.inner.http, url, method, path, headers, body).await?;
        let value: Value = serde_json::from_str(&outcome.body)
            .map_err(|_| ClientError::Transport("invalid JSON in HTTP response".into()))?;
        let items = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        if items.iter().any(|item| item.get("error").is_some()) {
            Err(ClientError::BatchRejected(items))
        } else {
            Ok(items)
        }
    }

    pub async fn subscribe(
        &self,
        method: impl Into<String>,
        callback: impl Fn(Value) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, ClientError> {
        self.inner.subscriptions.subscribe(method, callback).await
    }

    pub async fn unsubscribe(&self, method: &str, subscription: SubscriptionId) {
        self.inner.subscriptions.unsubscribe(method, subscription).await;
    }

    pub async fn unsubscribe_all(&self, method: &str) {
        self.inner.subscriptions.unsubscribe_all(method).await;
    }

    pub async fn server_disconnected(&self, callback: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        self.inner.subscriptions.on_server_disconnected(callback).await
    }
}

/// Watches a stream/WS connection for unexpected closure and drives the
/// Retrying/Connecting cycle (spec.md §4.5). Runs until the client is
/// reconnected, exhausts its retries, or [`Client::end`] drops the
/// connection entirely.
fn monitor_connection(inner: Arc<ClientInner>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(monitor_connection_inner(inner))
}

async fn monitor_connection_inner(inner: Arc<ClientInner>) {
    loop {
        tokio::time::sleep(Duration::from_millis(25)).await;

        let is_closed = match inner.connection.lock().await.as_ref() {
            Some(connection) => connection.is_closed(),
            None => return,
        };
        if !is_closed {
            continue;
        }

        {
            let mut state = inner.state.lock().await;
            if *state != ConnectionState::Open {
                return;
            }
            *state = ConnectionState::Retrying;
        }
        tracing::info!(retries = inner.config.retries, "connection lost, retrying");
        inner.subscriptions.dispatch_disconnected().await;

        let mut remaining = inner.config.retries;
        loop {
            if remaining == 0 {
                tracing::info!("retries exhausted, closing");
                *inner.state.lock().await = ConnectionState::Closed;
                return;
            }
            remaining -= 1;
            tracing::debug!(remaining, "reconnect attempt");
            tokio::time::sleep(inner.config.reconnect_delay).await;

            let reconnected = match &inner.config.transport {
                ClientTransportConfig::Stream { addr } => StreamConnection::connect(
                    addr,
                    inner.config.delimiter.clone(),
                    inner.config.version,
                    inner.correlation.clone(),
                    inner.subscriptions.clone(),
                )
                .await
                .map(Connection::Stream)
                .ok(),
                ClientTransportConfig::WebSocket { url, .. } => WebSocketConnection::connect(
                    url,
                    inner.config.delimiter.clone(),
                    inner.config.version,
                    inner.correlation.clone(),
                    inner.subscriptions.clone(),
                )
                .await
                .map(Connection::WebSocket)
                .ok(),
                ClientTransportConfig::Http { .. } => {
                    unreachable!("HTTP has no persistent connection to monitor")
                }
            };

            if let Some(connection) = reconnected {
                tracing::info!("reconnected");
                *inner.connection.lock().await = Some(connection);
                *inner.state.lock().await = ConnectionState::Open;
                tokio::spawn(monitor_connection(inner.clone()));
                return;
            }
        }
    }
}
