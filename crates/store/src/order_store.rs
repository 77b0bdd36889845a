//! The order storage contract.

use async_trait::async_trait;
use common::OrderId;
use domain::Order;

use crate::Result;

/// Storage contract for the order aggregate.
///
/// Implementations persist the aggregate as a whole; callers serialize
/// access per order (the orchestrator holds an order-scoped lock around
/// every read-modify-write cycle), so stores do not need to detect
/// write-write conflicts themselves.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a newly created order. Fails if the ID is already taken.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Loads an order by ID, or `None` if it was never persisted.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Replaces the persisted state of an existing order.
    async fn update(&self, order: &Order) -> Result<()>;
}
