//! Inventory ledger contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{DomainError, ProductId};

use crate::error::SagaError;

/// Per-product stock ledger with atomic reserve/release.
///
/// `reserve` is a check-and-decrement performed in one critical section, so
/// concurrent reservations for the same product cannot lose updates or
/// drive stock negative. `release` is an unconditional increment used only
/// as a compensation step; the orchestrator guarantees a released quantity
/// was reserved earlier for the same order.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Atomically checks `stock >= quantity` and decrements.
    ///
    /// Returns the remaining stock on success; fails with
    /// `InsufficientStock` otherwise.
    async fn reserve(&self, product_id: &ProductId, quantity: u32) -> Result<u32, SagaError>;

    /// Increments stock and returns the new level. Never fails on business
    /// grounds; an error here is a retryable infrastructure failure.
    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<u32, SagaError>;
}

/// In-memory inventory ledger.
///
/// The single write lock serializes all reservations, which trivially
/// satisfies the per-product ordering requirement.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryLedger {
    stock: Arc<RwLock<HashMap<ProductId, u32>>>,
}

impl InMemoryInventoryLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stock level for a product.
    pub fn set_stock(&self, product_id: impl Into<ProductId>, quantity: u32) {
        self.stock
            .write()
            .unwrap()
            .insert(product_id.into(), quantity);
    }

    /// Returns the current stock level for a product (0 if unknown).
    pub fn stock_of(&self, product_id: &ProductId) -> u32 {
        self.stock
            .read()
            .unwrap()
            .get(product_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn reserve(&self, product_id: &ProductId, quantity: u32) -> Result<u32, SagaError> {
        let mut stock = self.stock.write().unwrap();
        let available = stock.get(product_id).copied().unwrap_or(0);

        if available < quantity {
            return Err(SagaError::Domain(DomainError::InsufficientStock {
                product: product_id.to_string(),
            }));
        }

        let remaining = available - quantity;
        stock.insert(product_id.clone(), remaining);
        Ok(remaining)
    }

    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<u32, SagaError> {
        let mut stock = self.stock.write().unwrap();
        let level = stock.entry(product_id.clone()).or_insert(0);
        *level += quantity;
        Ok(*level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reserve_decrements_stock() {
        let ledger = InMemoryInventoryLedger::new();
        let id = ProductId::new("SKU-001");
        ledger.set_stock(id.clone(), 5);

        let remaining = ledger.reserve(&id, 3).await.unwrap();
        assert_eq!(remaining, 2);
        assert_eq!(ledger.stock_of(&id), 2);
    }

    #[tokio::test]
    async fn test_reserve_insufficient_stock() {
        let ledger = InMemoryInventoryLedger::new();
        let id = ProductId::new("SKU-001");
        ledger.set_stock(id.clone(), 2);

        let result = ledger.reserve(&id, 3).await;
        assert!(matches!(
            result,
            Err(SagaError::Domain(DomainError::InsufficientStock { .. }))
        ));
        // A failed reservation leaves stock untouched.
        assert_eq!(ledger.stock_of(&id), 2);
    }

    #[tokio::test]
    async fn test_reserve_unknown_product_is_insufficient() {
        let ledger = InMemoryInventoryLedger::new();
        let result = ledger.reserve(&ProductId::new("SKU-404"), 1).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_release_restores_stock() {
        let ledger = InMemoryInventoryLedger::new();
        let id = ProductId::new("SKU-001");
        ledger.set_stock(id.clone(), 5);

        ledger.reserve(&id, 5).await.unwrap();
        let level = ledger.release(&id, 5).await.unwrap();
        assert_eq!(level, 5);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_never_oversell() {
        let ledger = InMemoryInventoryLedger::new();
        let id = ProductId::new("SKU-001");
        ledger.set_stock(id.clone(), 10);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move { ledger.reserve(&id, 1).await }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 10);
        assert_eq!(ledger.stock_of(&id), 0);
    }
}
