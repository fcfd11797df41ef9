/// Client connection lifecycle (spec.md §4.5).
///
/// HTTP has no notion of this state machine (spec.md §4.5: "HTTP is
/// stateless: its client has no Connecting/Open distinction"); only the
/// stream and WebSocket transports drive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Retrying,
    Closed,
}
