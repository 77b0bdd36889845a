//! Domain layer for the storefront order backend.
//!
//! This crate provides the core domain model:
//! - The `Order` aggregate with its two status axes (fulfillment and payment)
//! - Checkout pricing rules (tax and shipping derivation)
//! - Value objects for line items, addresses, and catalog snapshots

pub mod error;
pub mod order;
pub mod product;

pub use error::DomainError;
pub use order::{
    Address, CheckoutItem, Order, OrderItem, OrderStatus, PaymentStatus, ProductId, Totals,
};
pub use product::Product;
