use jsonrpc_core::JsonRpcVersion;

/// Which transport a [`crate::Server`] binds, and its transport-specific
/// settings (spec.md §6.2).
#[derive(Debug, Clone)]
pub enum ServerTransportConfig {
    Stream { bind_addr: String },
    Http { bind_addr: String },
    WebSocket { bind_addr: String },
}

/// Server-side configuration (spec.md §6.2).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub transport: ServerTransportConfig,
    pub exclusive: bool,
    pub version: JsonRpcVersion,
    pub delimiter: Vec<u8>,
}

impl ServerConfig {
    pub fn builder(transport: ServerTransportConfig) -> ServerConfigBuilder {
        ServerConfigBuilder::new(transport)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    transport: ServerTransportConfig,
    exclusive: bool,
    version: JsonRpcVersion,
    delimiter: Vec<u8>,
}

impl ServerConfigBuilder {
    pub fn new(transport: ServerTransportConfig) -> Self {
        Self {
            transport,
            exclusive: false,
            version: JsonRpcVersion::V2,
            delimiter: b"\n".to_vec(),
        }
    }

    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    pub fn version(mut self, version: JsonRpcVersion) -> Self {
        self.version = version;
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<Vec<u8>>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn build(self) -> ServerConfig {
        ServerConfig {
            transport: self.transport,
            exclusive: self.exclusive,
            version: self.version,
            delimiter: self.delimiter,
        }
    }
}
