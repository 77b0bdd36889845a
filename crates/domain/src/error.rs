//! Domain error types.

use common::OrderId;
use thiserror::Error;

use crate::order::{OrderStatus, PaymentStatus, ProductId};

/// Errors that can occur during domain operations.
///
/// These are business-rule violations surfaced directly to the caller;
/// none of them is retryable.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Product does not exist in the catalog.
    #[error("Product with ID {0} not found")]
    ProductNotFound(ProductId),

    /// Order does not exist.
    #[error("Order with ID {0} not found")]
    OrderNotFound(OrderId),

    /// Requested quantity exceeds available stock.
    #[error("Insufficient stock for product: {product}")]
    InsufficientStock { product: String },

    /// The order cannot be cancelled from its current status.
    #[error("Cannot cancel order with status: {status}")]
    CannotCancel { status: OrderStatus },

    /// The payment status change is not allowed from the current state.
    #[error("Invalid payment status transition: {from} -> {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// A line item carries a non-positive quantity.
    #[error("Invalid quantity for product {product}: quantity must be positive")]
    InvalidQuantity { product: ProductId },

    /// Checkout was requested with no line items.
    #[error("Order must contain at least one item")]
    EmptyOrder,
}
