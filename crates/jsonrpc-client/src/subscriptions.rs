use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::ClientError;

/// Internal event name for batch-response delivery; user code cannot
/// subscribe to it (spec.md §9: "the reserved name `batchResponse`... must
/// be namespace-isolated so user subscriptions cannot shadow it").
pub const RESERVED_BATCH_RESPONSE: &str = "batchResponse";

type Callback = Arc<dyn Fn(Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Registry of application-level event subscriptions (spec.md §4.5, §6.3).
///
/// Notifications the server pushes are dispatched by method name to every
/// callback registered for it, in registration order (spec.md §5). Each
/// callback runs behind `catch_unwind`, so a panicking callback is logged
/// and isolated rather than unwinding past the rest of the dispatch loop
/// (spec.md §7: "Subscription callback failures are isolated").
pub struct Subscriptions {
    by_method: Mutex<HashMap<String, Vec<(u64, Callback)>>>,
    on_disconnect: Mutex<Vec<(u64, Arc<dyn Fn() + Send + Sync>)>>,
    next_id: AtomicU64,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self {
            by_method: Mutex::new(HashMap::new()),
            on_disconnect: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn subscribe(
        &self,
        method: impl Into<String>,
        callback: impl Fn(Value) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, ClientError> {
        let method = method.into();
        if method == RESERVED_BATCH_RESPONSE {
            return Err(ClientError::ReservedEventName(method));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.by_method
            .lock()
            .await
            .entry(method)
            .or_default()
            .push((id, Arc::new(callback)));
        Ok(SubscriptionId(id))
    }

    pub async fn unsubscribe(&self, method: &str, subscription: SubscriptionId) {
        if let Some(callbacks) = self.by_method.lock().await.get_mut(method) {
            callbacks.retain(|(id, _)| *id != subscription.0);
        }
    }

    pub async fn unsubscribe_all(&self, method: &str) {
        self.by_method.lock().await.remove(method);
    }

    pub async fn on_server_disconnected(&self, callback: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.on_disconnect.lock().await.push((id, Arc::new(callback)));
        SubscriptionId(id)
    }

    pub async fn dispatch(&self, method: &str, params: Value) {
        let callbacks = {
            let guard = self.by_method.lock().await;
            guard.get(method).cloned().unwrap_or_default()
        };
        for (_, callback) in callbacks {
            let params = params.clone();
            if panic::catch_unwind(AssertUnwindSafe(|| callback(params))).is_err() {
                tracing::warn!(method, "subscription callback panicked");
            }
        }
    }

    pub async fn dispatch_disconnected(&self) {
        let callbacks = self.on_disconnect.lock().await.clone();
        for (_, callback) in callbacks {
            if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                tracing::warn!("server-disconnected callback panicked");
            }
        }
    }
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self::new()
    }
}
