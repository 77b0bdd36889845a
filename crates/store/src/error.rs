//! Store error types.

use common::OrderId;
use thiserror::Error;

/// Errors that can occur during order persistence.
///
/// Any of these aborts the enclosing operation: no partial write of the
/// order aggregate is acceptable.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order with this ID already exists.
    #[error("Order {0} already exists")]
    DuplicateOrder(OrderId),

    /// An update targeted an order that is not persisted.
    #[error("Order {0} is not persisted")]
    Missing(OrderId),

    /// The underlying database failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The aggregate payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
