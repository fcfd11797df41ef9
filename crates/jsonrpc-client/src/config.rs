use std::collections::HashMap;
use std::time::Duration;

use jsonrpc_core::JsonRpcVersion;

/// Which transport a [`crate::Client`] speaks, and its transport-specific
/// settings (spec.md §6.2).
#[derive(Debug, Clone)]
pub enum ClientTransportConfig {
    Stream { addr: String },
    Http {
        url: String,
        method: String,
        path: String,
        headers: HashMap<String, String>,
    },
    WebSocket {
        url: String,
        per_message_deflate: bool,
    },
}

/// Client-side configuration (spec.md §6.2).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub transport: ClientTransportConfig,
    pub version: JsonRpcVersion,
    pub delimiter: Vec<u8>,
    pub timeout: Duration,
    pub retries: u32,
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn builder(transport: ClientTransportConfig) -> ClientConfigBuilder {
        ClientConfigBuilder::new(transport)
    }
}

/// Builder for [`ClientConfig`], following the defaults in spec.md §6.2.
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    transport: ClientTransportConfig,
    version: JsonRpcVersion,
    delimiter: Vec<u8>,
    timeout: Duration,
    retries: u32,
    reconnect_delay: Duration,
}

impl ClientConfigBuilder {
    pub fn new(transport: ClientTransportConfig) -> Self {
        Self {
            transport,
            version: JsonRpcVersion::V2,
            delimiter: b"\n".to_vec(),
            timeout: Duration::from_secs(30),
            retries: 3,
            reconnect_delay: Duration::from_secs(1),
        }
    }

    pub fn version(mut self, version: JsonRpcVersion) -> Self {
        self.version = version;
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<Vec<u8>>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn build(self) -> ClientConfig {
        ClientConfig {
            transport: self.transport,
            version: self.version,
            delimiter: self.delimiter,
            timeout: self.timeout,
            retries: self.retries,
            reconnect_delay: self.reconnect_delay,
        }
    }
}
