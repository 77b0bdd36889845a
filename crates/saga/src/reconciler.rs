//! Webhook reconciliation.
//!
//! The payment processor reports transaction outcomes asynchronously via
//! signed webhook notifications. The reconciler authenticates each payload,
//! translates the processor's status vocabulary into a [`PaymentStatus`],
//! and hands the result to the orchestrator, which applies the same state
//! machine it applies to every other transition.

use std::str::FromStr;
use std::sync::Arc;

use common::OrderId;
use domain::PaymentStatus;
use serde::Deserialize;
use store::OrderStore;

use crate::error::{Result, SagaError};
use crate::orchestrator::Orchestrator;
use crate::services::catalog::CatalogService;
use crate::services::gateway::{PaymentGateway, SignatureVerifier};
use crate::services::inventory::InventoryLedger;

/// A webhook notification body as delivered by the payment processor.
///
/// The signature travels separately in the `x-signature` request header.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub order_id: String,
    pub transaction_status: String,
    pub status_code: String,
    pub gross_amount: String,
}

/// Translates the processor's transaction status vocabulary.
///
/// `capture` and `settlement` mean the money is in; `deny`, `cancel` and
/// `expire` mean it never will be; `refund` means it went back. Anything
/// else (`pending`, `authorize`, unknown future values) maps to `Pending`
/// so an unrecognized status can never settle or unsettle an order.
pub fn map_transaction_status(transaction_status: &str) -> PaymentStatus {
    match transaction_status {
        "capture" | "settlement" => PaymentStatus::Paid,
        "deny" | "cancel" | "expire" => PaymentStatus::Failed,
        "refund" => PaymentStatus::Refunded,
        _ => PaymentStatus::Pending,
    }
}

/// Authenticates and applies payment webhook notifications.
pub struct WebhookReconciler<S, C, L, G>
where
    S: OrderStore,
    C: CatalogService,
    L: InventoryLedger,
    G: PaymentGateway,
{
    orchestrator: Arc<Orchestrator<S, C, L, G>>,
    verifier: SignatureVerifier,
}

impl<S, C, L, G> WebhookReconciler<S, C, L, G>
where
    S: OrderStore,
    C: CatalogService,
    L: InventoryLedger,
    G: PaymentGateway,
{
    /// Creates a reconciler that feeds verified notifications into the
    /// given orchestrator.
    pub fn new(
        orchestrator: Arc<Orchestrator<S, C, L, G>>,
        verifier: SignatureVerifier,
    ) -> Self {
        Self {
            orchestrator,
            verifier,
        }
    }

    /// Processes one webhook notification.
    ///
    /// The signature is checked before anything else; a payload that fails
    /// verification is rejected without touching any order. Returns the
    /// payment status that was applied.
    #[tracing::instrument(skip(self, payload, signature), fields(order_id = %payload.order_id))]
    pub async fn reconcile(
        &self,
        payload: &WebhookPayload,
        signature: &str,
    ) -> Result<PaymentStatus> {
        if !self.verifier.verify(
            &payload.order_id,
            &payload.status_code,
            &payload.gross_amount,
            signature,
        ) {
            metrics::counter!("webhook_auth_failures_total").increment(1);
            tracing::warn!("webhook rejected: signature mismatch");
            return Err(SagaError::InvalidSignature);
        }

        let order_id = OrderId::from_str(&payload.order_id)
            .map_err(|_| SagaError::MalformedWebhook(format!("bad order id: {}", payload.order_id)))?;

        let status = map_transaction_status(&payload.transaction_status);
        tracing::info!(
            transaction_status = %payload.transaction_status,
            status = %status,
            "webhook verified"
        );

        self.orchestrator
            .update_payment_status(order_id, status)
            .await?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_statuses_map_to_paid() {
        assert_eq!(map_transaction_status("capture"), PaymentStatus::Paid);
        assert_eq!(map_transaction_status("settlement"), PaymentStatus::Paid);
    }

    #[test]
    fn test_terminal_failures_map_to_failed() {
        assert_eq!(map_transaction_status("deny"), PaymentStatus::Failed);
        assert_eq!(map_transaction_status("cancel"), PaymentStatus::Failed);
        assert_eq!(map_transaction_status("expire"), PaymentStatus::Failed);
    }

    #[test]
    fn test_refund_maps_to_refunded() {
        assert_eq!(map_transaction_status("refund"), PaymentStatus::Refunded);
    }

    #[test]
    fn test_unknown_statuses_map_to_pending() {
        assert_eq!(map_transaction_status("pending"), PaymentStatus::Pending);
        assert_eq!(map_transaction_status("authorize"), PaymentStatus::Pending);
        assert_eq!(map_transaction_status("gibberish"), PaymentStatus::Pending);
    }
}
