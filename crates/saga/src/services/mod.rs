//! Contracts for the external collaborators the saga depends on, with
//! in-memory implementations for tests and local runs.

pub mod catalog;
pub mod events;
pub mod gateway;
pub mod inventory;

pub use catalog::{CatalogService, InMemoryCatalog};
pub use events::{EventPublisher, InMemoryEventPublisher, Notifier, PublishError, topics};
pub use gateway::{
    ChargeItem, ChargeRequest, CustomerDetails, GatewayError, InMemoryPaymentGateway,
    PaymentGateway, SignatureVerifier,
};
pub use inventory::{InMemoryInventoryLedger, InventoryLedger};
