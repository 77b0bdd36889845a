//! Per-order lock registry.
//!
//! Every state-mutating orchestrator operation holds its order's lock for
//! the full read-modify-write cycle, making each order a single-writer
//! resource: a cancellation racing a payment-status update for the same
//! order serializes instead of releasing inventory or compensating payment
//! twice. Operations on different orders proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use common::OrderId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-order async mutexes.
#[derive(Clone, Default)]
pub struct OrderLocks {
    locks: Arc<Mutex<HashMap<OrderId, Arc<Mutex<()>>>>>,
}

impl OrderLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for the given order, waiting if it is held.
    ///
    /// The guard is owned so it can be held across await points for the
    /// duration of the operation.
    pub async fn acquire(&self, id: OrderId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
