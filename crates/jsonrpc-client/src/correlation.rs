use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jsonrpc_core::{Id, JsonRpcError};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tokio::time;

/// Why a single pending call settled without a value (spec.md §4.4, §7).
#[derive(Debug)]
pub enum CallFailure {
    Rpc(JsonRpcError),
    TimedOut,
    TransportClosed,
}

/// Why a pending batch settled without a clean resolution.
#[derive(Debug)]
pub enum BatchFailure {
    /// At least one element of the response batch carried an `error`; the
    /// whole response array is forwarded so the caller can inspect which.
    Rejected(Vec<Value>),
    TimedOut,
    TransportClosed,
}

type CallSender = oneshot::Sender<Result<Value, CallFailure>>;
type BatchSender = oneshot::Sender<Result<Vec<Value>, BatchFailure>>;

/// Maps pending call/batch identifiers to completion handles (spec.md §4.4).
///
/// `pending_calls` and `pending_batches` are each guarded by their own
/// mutex: a single-call send and a batch send never contend on the same
/// lock, matching the "register then write" ordering the client core needs
/// to keep atomic (spec.md §5).
#[derive(Clone)]
pub struct CorrelationTable {
    pending_calls: Arc<Mutex<HashMap<Id, CallSender>>>,
    pending_batches: Arc<Mutex<HashMap<Vec<Id>, BatchSender>>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self {
            pending_calls: Arc::new(Mutex::new(HashMap::new())),
            pending_batches: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `idSet` currently claimed by a live pending batch (spec.md §9: new
    /// batches must use disjoint ids).
    pub async fn claimed_ids(&self) -> Vec<Id> {
        let mut all = Vec::new();
        for set in self.pending_batches.lock().await.keys() {
            all.extend(set.iter().copied());
        }
        all
    }

    pub async fn register(&self, id: Id, timeout: Duration) -> oneshot::Receiver<Result<Value, CallFailure>> {
        let (tx, rx) = oneshot::channel();
        self.pending_calls.lock().await.insert(id, tx);

        let pending = self.pending_calls.clone();
        tokio::spawn(async move {
            time::sleep(timeout).await;
            if let Some(tx) = pending.lock().await.remove(&id) {
                let _ = tx.send(Err(CallFailure::TimedOut));
            }
        });

        rx
    }

    pub async fn register_batch(
        &self,
        mut id_set: Vec<Id>,
        timeout: Duration,
    ) -> oneshot::Receiver<Result<Vec<Value>, BatchFailure>> {
        id_set.sort_unstable();
        id_set.dedup();
        let (tx, rx) = oneshot::channel();
        self.pending_batches.lock().await.insert(id_set.clone(), tx);

        let pending = self.pending_batches.clone();
        tokio::spawn(async move {
            time::sleep(timeout).await;
            if let Some(tx) = pending.lock().await.remove(&id_set) {
                let _ = tx.send(Err(BatchFailure::TimedOut));
            }
        });

        rx
    }

    /// Settle a pending call with a successful result. A no-op if the call
    /// already settled (by timeout or a prior settlement).
    pub async fn resolve(&self, id: Id, value: Value) {
        if let Some(tx) = self.pending_calls.lock().await.remove(&id) {
            let _ = tx.send(Ok(value));
        }
    }

    pub async fn reject(&self, id: Id, error: JsonRpcError) {
        if let Some(tx) = self.pending_calls.lock().await.remove(&id) {
            let _ = tx.send(Err(CallFailure::Rpc(error)));
        }
    }

    /// Settle a pending call immediately with a non-rpc failure, e.g. a
    /// transport write that failed synchronously (spec.md §4.5: "On
    /// transport write failure, reject immediately").
    pub async fn fail(&self, id: Id, failure: CallFailure) {
        if let Some(tx) = self.pending_calls.lock().await.remove(&id) {
            let _ = tx.send(Err(failure));
        }
    }

    pub async fn fail_batch(&self, mut id_set: Vec<Id>, failure: BatchFailure) {
        id_set.sort_unstable();
        id_set.dedup();
        if let Some(tx) = self.pending_batches.lock().await.remove(&id_set) {
            let _ = tx.send(Err(failure));
        }
    }

    /// Match a decoded response batch against the pending batch whose id
    /// set equals it exactly (spec.md §4.4). Returns `false` if nothing
    /// matched (already timed out, or a peer echoing an unknown id set).
    pub async fn match_batch(&self, items: Vec<Value>) -> bool {
        let mut ids: Vec<Id> = items
            .iter()
            .filter_map(|item| item.get("id").and_then(Value::as_u64).map(Id::new))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let sender = self.pending_batches.lock().await.remove(&ids);
        let Some(tx) = sender else {
            return false;
        };

        let has_error = items.iter().any(|item| item.get("error").is_some());
        let _ = if has_error {
            tx.send(Err(BatchFailure::Rejected(items)))
        } else {
            tx.send(Ok(items))
        };
        true
    }

    /// Drain every pending call/batch, settling each as transport-closed
    /// (spec.md §7: "transport-level connection errors abort in-flight
    /// calls on that connection").
    pub async fn fail_all(&self) {
        let mut calls = self.pending_calls.lock().await;
        for (_, tx) in calls.drain() {
            let _ = tx.send(Err(CallFailure::TransportClosed));
        }
        drop(calls);

        let mut batches = self.pending_batches.lock().await;
        for (_, tx) in batches.drain() {
            let _ = tx.send(Err(BatchFailure::TransportClosed));
        }
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}
