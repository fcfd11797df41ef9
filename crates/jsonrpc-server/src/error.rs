use thiserror::Error;

/// Errors a [`crate::Server`] can surface to its owner (spec.md §4.7).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("listen() called while already listening")]
    AlreadyListening,
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server is not listening")]
    NotListening,
}
