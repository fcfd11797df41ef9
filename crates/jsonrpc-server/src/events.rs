use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use jsonrpc_core::JsonRpcError;
use serde_json::Value;
use tokio::sync::Mutex;

/// Client identifier handed to `clientConnected`/`clientDisconnected`
/// callbacks (stream/WS transports only, spec.md §4.6).
pub type ClientId = u64;

type NotifyCallback = Arc<dyn Fn(&str, Value) + Send + Sync>;
type ClientCallback = Arc<dyn Fn(ClientId) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(ClientId, &JsonRpcError) + Send + Sync>;

/// Server-side event registries (spec.md §4.6: "clientConnected,
/// clientDisconnected, notify, error").
///
/// Unlike client [`crate::registry::MethodRegistry`] method lookups, these
/// are fan-out only: every registered callback for an event runs, in
/// registration order, on every occurrence. Each call runs behind
/// `catch_unwind`, so a panicking callback is logged and isolated rather
/// than unwinding past the rest of the fan-out loop.
#[derive(Default)]
pub struct ServerEvents {
    on_notify: Mutex<Vec<NotifyCallback>>,
    on_client_connected: Mutex<Vec<ClientCallback>>,
    on_client_disconnected: Mutex<Vec<ClientCallback>>,
    on_error: Mutex<Vec<ErrorCallback>>,
}

impl ServerEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn on_notify(&self, callback: impl Fn(&str, Value) + Send + Sync + 'static) {
        self.on_notify.lock().await.push(Arc::new(callback));
    }

    pub async fn on_client_connected(&self, callback: impl Fn(ClientId) + Send + Sync + 'static) {
        self.on_client_connected.lock().await.push(Arc::new(callback));
    }

    pub async fn on_client_disconnected(&self, callback: impl Fn(ClientId) + Send + Sync + 'static) {
        self.on_client_disconnected.lock().await.push(Arc::new(callback));
    }

    pub async fn on_error(&self, callback: impl Fn(ClientId, &JsonRpcError) + Send + Sync + 'static) {
        self.on_error.lock().await.push(Arc::new(callback));
    }

    pub async fn emit_notify(&self, method: &str, params: Value) {
        for callback in self.on_notify.lock().await.iter() {
            let params = params.clone();
            if panic::catch_unwind(AssertUnwindSafe(|| callback(method, params))).is_err() {
                tracing::warn!(method, "notify callback panicked");
            }
        }
    }

    pub async fn emit_client_connected(&self, client: ClientId) {
        for callback in self.on_client_connected.lock().await.iter() {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(client))).is_err() {
                tracing::warn!(client, "clientConnected callback panicked");
            }
        }
    }

    pub async fn emit_client_disconnected(&self, client: ClientId) {
        for callback in self.on_client_disconnected.lock().await.iter() {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(client))).is_err() {
                tracing::warn!(client, "clientDisconnected callback panicked");
            }
        }
    }

    pub async fn emit_error(&self, client: ClientId, error: &JsonRpcError) {
        for callback in self.on_error.lock().await.iter() {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(client, error))).is_err() {
                tracing::warn!(client, "error callback panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use serde_json::json;

    #[tokio::test]
    async fn notify_callback_receives_method_and_params() {
        let events = ServerEvents::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_write = seen.clone();
        events
            .on_notify(move |method, params| {
                let seen_write = seen_write.clone();
                let method = method.to_string();
                tokio::spawn(async move {
                    *seen_write.lock().await = Some((method, params));
                });
            })
            .await;
        events.emit_notify("ping", json!({"n": 1})).await;
        tokio::task::yield_now().await;
        assert_eq!(seen.lock().await.as_ref().unwrap().0, "ping");
    }

    #[tokio::test]
    async fn client_connected_runs_every_callback() {
        let events = ServerEvents::new();
        let count = Arc::new(AtomicUsize::new(0));
        let a = count.clone();
        events.on_client_connected(move |_| { a.fetch_add(1, Ordering::SeqCst); }).await;
        let b = count.clone();
        events.on_client_connected(move |_| { b.fetch_add(1, Ordering::SeqCst); }).await;

        events.emit_client_connected(1).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn a_panicking_callback_does_not_stop_the_rest_of_the_fanout() {
        let previous_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));

        let events = ServerEvents::new();
        let ran_after = Arc::new(AtomicUsize::new(0));

        events.on_client_connected(|_| panic!("boom")).await;
        let after = ran_after.clone();
        events.on_client_connected(move |_| { after.fetch_add(1, Ordering::SeqCst); }).await;

        events.emit_client_connected(1).await;

        panic::set_hook(previous_hook);
        assert_eq!(ran_after.load(Ordering::SeqCst), 1);
    }
}
