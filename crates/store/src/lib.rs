//! Order persistence for the storefront backend.
//!
//! The [`OrderStore`] trait is the narrow storage contract the orchestrator
//! depends on: create, read, and update a single order aggregate by id.
//! Two implementations are provided: an in-memory store for tests and local
//! runs, and a PostgreSQL store for durable deployments.

pub mod error;
pub mod memory;
pub mod order_store;
pub mod postgres;

pub use error::StoreError;
pub use memory::InMemoryOrderStore;
pub use order_store::OrderStore;
pub use postgres::PostgresOrderStore;

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
