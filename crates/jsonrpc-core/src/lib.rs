#![forbid(unsafe_code)]
//! Message model, wire codec, framing buffer, and error catalogue shared by
//! the JSON-RPC 2.0 client and server crates.
//!
//! This crate carries no transport or async runtime dependency: it only
//! knows how to turn bytes into [`Message`] values and back, classify a
//! decoded value per the JSON-RPC 2.0 shape rules, and split a byte stream
//! on a configurable delimiter. `jsonrpc-client` and `jsonrpc-server` build
//! the request/response correlation, method dispatch, and transport-specific
//! plumbing on top of these primitives.

mod codec;
mod error;
mod framing;
mod id;
mod message;
mod version;

pub use codec::{decode_frame, encode_message, DecodeOutcome};
pub use error::{ErrorCode, JsonRpcError};
pub use framing::FramingBuffer;
pub use id::Id;
pub use message::{ErrorResponse, Message, Notification, Params, Request, Response};
pub use version::JsonRpcVersion;

#[cfg(test)]
mod tests;
