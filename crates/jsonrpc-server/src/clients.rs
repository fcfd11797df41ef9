use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::events::ClientId;

/// Write handles for every currently attached stream/WS client, kept so
/// `Server::notify` can broadcast to all of them (spec.md §4.6:
/// "Server-push notify... broadcasts... to every currently attached
/// client. Write failures on individual clients... do not affect others").
#[derive(Clone)]
pub struct ConnectedClients {
    next_id: Arc<AtomicU64>,
    writers: Arc<Mutex<HashMap<ClientId, mpsc::UnboundedSender<Vec<u8>>>>>,
}

impl ConnectedClients {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
            writers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn allocate_id(&self) -> ClientId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub async fn attach(&self, id: ClientId, writer: mpsc::UnboundedSender<Vec<u8>>) {
        self.writers.lock().await.insert(id, writer);
    }

    pub async fn detach(&self, id: ClientId) {
        self.writers.lock().await.remove(&id);
    }

    /// Returns the ids whose write failed, for the caller to turn into
    /// `error` events.
    pub async fn broadcast(&self, frame: Vec<u8>) -> Vec<ClientId> {
        let writers = self.writers.lock().await;
        let mut failed = Vec::new();
        for (id, writer) in writers.iter() {
            if writer.send(frame.clone()).is_err() {
                failed.push(*id);
            }
        }
        failed
    }
}

impl Default for ConnectedClients {
    fn default() -> Self {
        Self::new()
    }
}
