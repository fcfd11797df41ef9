#![forbid(unsafe_code)]
//! JSON-RPC 2.0 server: method registry, frame dispatch, server-side
//! lifecycle, and the stream/HTTP/WebSocket transport adapters.

mod clients;
mod config;
mod dispatch;
mod error;
mod events;
mod registry;
mod server;
mod state;
pub mod transport;

pub use clients::ConnectedClients;
pub use config::{ServerConfig, ServerConfigBuilder, ServerTransportConfig};
pub use dispatch::DispatchResult;
pub use error::ServerError;
pub use events::{ClientId, ServerEvents};
pub use registry::{async_handler, sync_handler, HandlerFailure, MethodHandler, MethodRegistry};
pub use server::Server;
pub use state::ServerState;
