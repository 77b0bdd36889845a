//! Saga error types.

use domain::DomainError;
use store::StoreError;
use thiserror::Error;

use crate::services::gateway::GatewayError;

/// Errors that can occur while orchestrating an order.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A business rule was violated; surfaced to the caller, never retried.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The order store failed; the enclosing operation is aborted.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The payment processor was unreachable or returned an error.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// An inbound webhook failed signature verification.
    #[error("Webhook signature verification failed")]
    InvalidSignature,

    /// An inbound webhook payload could not be interpreted.
    #[error("Malformed webhook payload: {0}")]
    MalformedWebhook(String),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
