#![forbid(unsafe_code)]
//! JSON-RPC 2.0 client: request/notification/batch issuance, response
//! correlation, subscriptions, and connection lifecycle across the
//! stream, HTTP, and WebSocket transports.

mod client;
mod config;
mod correlation;
mod error;
mod route;
mod state;
mod subscriptions;
pub mod transport;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder, ClientTransportConfig};
pub use correlation::{BatchFailure, CallFailure, CorrelationTable};
pub use error::ClientError;
pub use state::ConnectionState;
pub use subscriptions::{SubscriptionId, Subscriptions};
