/// Server listen lifecycle (spec.md §4.7):
///
/// ```text
/// Stopped --listen--> Starting --bound--> Listening
/// Listening --close--> Stopping --released--> Stopped
/// Any --bind error--> Stopped (with error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Listening,
    Stopping,
}
