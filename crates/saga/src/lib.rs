//! Checkout saga orchestration for the storefront backend.
//!
//! This crate drives an order through its lifecycle as a multi-step saga
//! with explicit compensations:
//! 1. Reserve inventory per line item (released in reverse on failure)
//! 2. Persist the order aggregate
//! 3. Open a payment transaction with the gateway
//! 4. Publish best-effort domain events
//!
//! Later transitions (explicit status updates, cancellation and payment
//! webhooks) all flow through the same [`Orchestrator`] entry points, so the
//! order has a single authoritative state machine regardless of what
//! triggered the change.

pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod reconciler;
pub mod services;

pub use error::SagaError;
pub use lock::OrderLocks;
pub use orchestrator::{CheckoutRequest, Orchestrator};
pub use reconciler::{WebhookPayload, WebhookReconciler, map_transaction_status};
pub use services::{
    CatalogService, ChargeItem, ChargeRequest, CustomerDetails, EventPublisher, GatewayError,
    InMemoryCatalog, InMemoryEventPublisher, InMemoryInventoryLedger, InMemoryPaymentGateway,
    InventoryLedger, Notifier, PaymentGateway, PublishError, SignatureVerifier, topics,
};
