use std::sync::{Arc, Mutex as StdMutex};

use jsonrpc_core::{JsonRpcError, Message, Params};
use serde_json::Value;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::clients::ConnectedClients;
use crate::config::{ServerConfig, ServerTransportConfig};
use crate::error::ServerError;
use crate::events::{ClientId, ServerEvents};
use crate::registry::{MethodHandler, MethodRegistry};
use crate::state::ServerState;
use crate::transport;

/// A JSON-RPC 2.0 endpoint bound to one transport (spec.md §4.6, §6.2).
///
/// `method` registrations are only meaningful before [`Server::listen`]:
/// the registry is snapshotted into an immutable handle at bind time, so
/// dispatch never contends on a lock (spec.md §5).
pub struct Server {
    config: ServerConfig,
    registry: StdMutex<MethodRegistry>,
    events: Arc<ServerEvents>,
    clients: ConnectedClients,
    state: Mutex<ServerState>,
    listener_task: Mutex<Option<JoinHandle<()>>>,
    http_shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            registry: StdMutex::new(MethodRegistry::new()),
            events: Arc::new(ServerEvents::new()),
            clients: ConnectedClients::new(),
            state: Mutex::new(ServerState::Stopped),
            listener_task: Mutex::new(None),
            http_shutdown: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> ServerState {
        *self.state.lock().await
    }

    /// Register a handler for `name` (spec.md §4.6). Call before [`listen`],
    /// since the registry is frozen the moment binding succeeds.
    pub fn method(&self, name: impl Into<String>, handler: Arc<dyn MethodHandler>) {
        self.registry.lock().unwrap().register(name, handler);
    }

    pub async fn on_notify(&self, callback: impl Fn(&str, Value) + Send + Sync + 'static) {
        self.events.on_notify(callback).await;
    }

    pub async fn client_connected(&self, callback: impl Fn(ClientId) + Send + Sync + 'static) {
        self.events.on_client_connected(callback).await;
    }

    pub async fn client_disconnected(&self, callback: impl Fn(ClientId) + Send + Sync + 'static) {
        self.events.on_client_disconnected(callback).await;
    }

    pub async fn on_error(&self, callback: impl Fn(ClientId, &JsonRpcError) + Send + Sync + 'static) {
        self.events.on_error(callback).await;
    }

    /// Bind and start accepting connections (spec.md §4.7). Not re-entrant:
    /// calling this while already `Listening` fails with
    /// [`ServerError::AlreadyListening`].
    pub async fn listen(&self) -> Result<(), ServerError> {
        let mut state = self.state.lock().await;
        if *state != ServerState::Stopped {
            return Err(ServerError::AlreadyListening);
        }
        *state = ServerState::Starting;

        let registry = Arc::new(self.registry.lock().unwrap().clone());
        let version = self.config.version;
        let delimiter = self.config.delimiter.clone();

        let bind_result = match &self.config.transport {
            ServerTransportConfig::Stream { bind_addr } => {
                self.bind(bind_addr).await.map(|listener| {
                    transport::stream::spawn_listener(
                        listener,
                        delimiter,
                        version,
                        registry,
                        self.events.clone(),
                        self.clients.clone(),
                    )
                })
            }
            ServerTransportConfig::WebSocket { bind_addr } => {
                self.bind(bind_addr).await.map(|listener| {
                    transport::ws::spawn_listener(
                        listener,
                        delimiter,
                        version,
                        registry,
                        self.events.clone(),
                        self.clients.clone(),
                    )
                })
            }
            ServerTransportConfig::Http { bind_addr } => match self.bind(bind_addr).await {
                Ok(listener) => {
                    let app = transport::http::router(registry, self.events.clone(), version, delimiter);
                    let (shutdown_tx, shutdown_rx) = oneshot::channel();
                    let handle = tokio::spawn(async move {
                        let _ = axum::serve(listener, app)
                            .with_graceful_shutdown(async {
                                let _ = shutdown_rx.await;
                            })
                            .await;
                    });
                    *self.http_shutdown.lock().await = Some(shutdown_tx);
                    Ok(handle)
                }
                Err(err) => Err(err),
            },
        };

        match bind_result {
            Ok(handle) => {
                tracing::info!(transport = ?self.config.transport, "listening");
                *self.listener_task.lock().await = Some(handle);
                *state = ServerState::Listening;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "bind failed");
                *state = ServerState::Stopped;
                Err(err)
            }
        }
    }

    async fn bind(&self, addr: &str) -> Result<TcpListener, ServerError> {
        bind_exclusive(addr, self.config.exclusive)
            .await
            .map_err(|source| ServerError::Bind { addr: addr.to_string(), source })
    }

    /// Stop accepting new connections and release the bound port (spec.md
    /// §4.7). Already-attached stream/WS connections are left to drain on
    /// their own; only the accept loop is torn down.
    pub async fn close(&self) -> Result<(), ServerError> {
        let mut state = self.state.lock().await;
        if *state != ServerState::Listening {
            return Err(ServerError::NotListening);
        }
        *state = ServerState::Stopping;

        if let Some(shutdown) = self.http_shutdown.lock().await.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.listener_task.lock().await.take() {
            handle.abort();
        }

        *state = ServerState::Stopped;
        tracing::info!("closed");
        Ok(())
    }

    /// Broadcast a notification to every attached stream/WS client
    /// (spec.md §4.6: "Server-push notify"). A no-op on the HTTP transport.
    pub async fn notify(&self, method: impl Into<String>, params: Option<Params>) {
        let frame = Message::notification(method, params);
        let mut bytes = serde_json::to_vec(&jsonrpc_core::encode_message(&frame, self.config.version)).unwrap_or_default();
        bytes.extend_from_slice(&self.config.delimiter);

        for client in self.clients.broadcast(bytes).await {
            self.events
                .emit_error(client, &JsonRpcError::internal("transport write failed"))
                .await;
        }
    }
}

async fn bind_exclusive(addr: &str, exclusive: bool) -> std::io::Result<TcpListener> {
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid bind address"))?;
    let socket = if socket_addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(!exclusive)?;
    socket.bind(socket_addr)?;
    socket.listen(1024)
}
