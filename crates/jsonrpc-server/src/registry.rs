use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

/// Why a handler failed to produce a result (spec.md §4.6, §7).
///
/// `InvalidParams` maps to the -32602 wire error; any other failure a
/// handler reports becomes -32603 with the failure's text as `message`.
#[derive(Debug, Clone)]
pub enum HandlerFailure {
    InvalidParams(String),
    Internal(String),
}

impl HandlerFailure {
    pub fn internal(message: impl Into<String>) -> Self {
        HandlerFailure::Internal(message.into())
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        HandlerFailure::InvalidParams(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            HandlerFailure::InvalidParams(message) => message,
            HandlerFailure::Internal(message) => message,
        }
    }
}

/// Type-erased method handler (spec.md §9: "handlers... settle via a
/// single future abstraction").
///
/// Every registered method is stored behind this trait object regardless
/// of whether the underlying closure is synchronous or async, so dispatch
/// has exactly one code path (grounded on the `HandlerFn`/`HandlerWrapper`
/// type-erasure split a hand-rolled JSON-RPC server registry uses to store
/// handlers of different concrete parameter/return types in one map).
pub trait MethodHandler: Send + Sync {
    fn call(&self, params: Value) -> BoxFuture<'static, Result<Value, HandlerFailure>>;
}

struct HandlerWrapper<F, Fut> {
    f: F,
    _marker: std::marker::PhantomData<fn() -> Fut>,
}

impl<F, Fut> MethodHandler for HandlerWrapper<F, Fut>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerFailure>> + Send + 'static,
{
    fn call(&self, params: Value) -> BoxFuture<'static, Result<Value, HandlerFailure>> {
        Box::pin((self.f)(params))
    }
}

/// Lift a synchronous handler into the uniform future shape by wrapping
/// its already-computed result in `std::future::ready` (spec.md §9).
pub fn sync_handler<F>(f: F) -> Arc<dyn MethodHandler>
where
    F: Fn(Value) -> Result<Value, HandlerFailure> + Send + Sync + 'static,
{
    async_handler(move |params| std::future::ready(f(params)))
}

/// Wrap an async handler closure (one that itself returns a future) as a
/// [`MethodHandler`].
pub fn async_handler<F, Fut>(f: F) -> Arc<dyn MethodHandler>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerFailure>> + Send + 'static,
{
    Arc::new(HandlerWrapper {
        f,
        _marker: std::marker::PhantomData,
    })
}

/// `name -> handler` table (spec.md §3). Written only during setup, before
/// `listen()`; read-only (and lock-free) during dispatch (spec.md §5).
#[derive(Default, Clone)]
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn MethodHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn MethodHandler>> {
        self.handlers.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sync_handler_lifts_into_a_completed_future() {
        let handler = sync_handler(|params| {
            let values: Vec<i64> = serde_json::from_value(params).unwrap();
            Ok(json!(values.iter().sum::<i64>()))
        });
        let result = handler.call(json!([1, 2, 3])).await;
        assert_eq!(result.unwrap(), json!(6));
    }

    #[tokio::test]
    async fn async_handler_and_sync_handler_produce_identical_results() {
        let sync = sync_handler(|_| Ok(json!("v")));
        let deferred = async_handler(|_| async move {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            Ok(json!("v"))
        });
        assert_eq!(sync.call(Value::Null).await.unwrap(), deferred.call(Value::Null).await.unwrap());
    }

    #[tokio::test]
    async fn registry_returns_none_for_unregistered_method() {
        let registry = MethodRegistry::new();
        assert!(registry.get("missing").is_none());
    }
}
