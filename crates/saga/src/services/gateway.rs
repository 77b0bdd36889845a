//! Payment gateway contract, webhook signature verification, and the
//! in-memory gateway used by tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId};
use serde::Serialize;
use sha2::{Digest, Sha512};
use thiserror::Error;

/// Failure of an outbound call to the payment processor.
///
/// All transport and HTTP-level failures collapse into this one kind,
/// carrying the upstream status code (when one was received) and message.
#[derive(Debug, Clone, Error)]
#[error("Payment gateway error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
pub struct GatewayError {
    /// Upstream HTTP status, if the processor responded at all.
    pub status: Option<u16>,
    /// Upstream or transport error message.
    pub message: String,
}

impl GatewayError {
    /// Creates a gateway error with an upstream status code.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a gateway error for a transport-level failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

/// Customer record sent with a charge, derived from the shipping address.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Per-item breakdown sent with a charge.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeItem {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub quantity: u32,
}

/// A request to open a payment transaction.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub order_id: OrderId,
    pub amount: Money,
    pub customer: CustomerDetails,
    pub items: Vec<ChargeItem>,
}

/// Outbound operations against the external payment processor.
///
/// Idempotency of `open_transaction` is the caller's responsibility: the
/// orchestrator opens at most one transaction per order.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment transaction and returns the processor's reference.
    async fn open_transaction(&self, request: &ChargeRequest) -> Result<String, GatewayError>;

    /// Queries the processor's status vocabulary for a transaction.
    async fn query_status(&self, transaction_ref: &str) -> Result<String, GatewayError>;

    /// Voids a not-yet-settled transaction.
    async fn cancel(&self, transaction_ref: &str) -> Result<(), GatewayError>;

    /// Refunds a settled transaction, optionally partially.
    async fn refund(&self, transaction_ref: &str, amount: Option<Money>)
    -> Result<(), GatewayError>;
}

/// Verifies inbound webhook authenticity.
///
/// The processor signs each notification with
/// `sha512(order_id || status_code || gross_amount || server_key)`, hex
/// encoded. Payloads failing verification must be discarded before any
/// state is touched.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    server_key: String,
}

impl SignatureVerifier {
    /// Creates a verifier around the shared server key.
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            server_key: server_key.into(),
        }
    }

    /// Computes the expected signature for the given payload fields.
    pub fn expected(&self, order_id: &str, status_code: &str, gross_amount: &str) -> String {
        let mut hasher = Sha512::new();
        hasher.update(order_id.as_bytes());
        hasher.update(status_code.as_bytes());
        hasher.update(gross_amount.as_bytes());
        hasher.update(self.server_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns true if the received signature matches the expected one.
    pub fn verify(
        &self,
        order_id: &str,
        status_code: &str,
        gross_amount: &str,
        received: &str,
    ) -> bool {
        self.expected(order_id, status_code, gross_amount) == received
    }
}

#[derive(Debug, Clone)]
struct GatewayTransaction {
    order_id: String,
    amount: Money,
    status: String,
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    transactions: HashMap<String, GatewayTransaction>,
    next_id: u32,
    fail_on_charge: bool,
    fail_on_cancel: bool,
    fail_on_refund: bool,
}

/// In-memory payment gateway for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail charge calls.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    /// Configures the gateway to fail cancel calls.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    /// Configures the gateway to fail refund calls.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state.write().unwrap().fail_on_refund = fail;
    }

    /// Returns the number of transactions ever opened.
    pub fn transaction_count(&self) -> usize {
        self.state.read().unwrap().transactions.len()
    }

    /// Returns the recorded status of a transaction, by transaction ref or
    /// by the order id it was opened for.
    pub fn status_of(&self, reference: &str) -> Option<String> {
        let state = self.state.read().unwrap();
        Self::lookup(&state, reference).map(|t| t.status.clone())
    }

    fn lookup<'a>(
        state: &'a InMemoryGatewayState,
        reference: &str,
    ) -> Option<&'a GatewayTransaction> {
        state.transactions.get(reference).or_else(|| {
            state
                .transactions
                .values()
                .find(|t| t.order_id == reference)
        })
    }

    fn lookup_key(state: &InMemoryGatewayState, reference: &str) -> Option<String> {
        if state.transactions.contains_key(reference) {
            return Some(reference.to_string());
        }
        state
            .transactions
            .iter()
            .find(|(_, t)| t.order_id == reference)
            .map(|(k, _)| k.clone())
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn open_transaction(&self, request: &ChargeRequest) -> Result<String, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_charge {
            return Err(GatewayError::upstream(503, "processor unavailable"));
        }

        state.next_id += 1;
        let transaction_ref = format!("TXN-{:04}", state.next_id);
        state.transactions.insert(
            transaction_ref.clone(),
            GatewayTransaction {
                order_id: request.order_id.to_string(),
                amount: request.amount,
                status: "pending".to_string(),
            },
        );

        Ok(transaction_ref)
    }

    async fn query_status(&self, transaction_ref: &str) -> Result<String, GatewayError> {
        let state = self.state.read().unwrap();
        Self::lookup(&state, transaction_ref)
            .map(|t| t.status.clone())
            .ok_or_else(|| GatewayError::upstream(404, "transaction not found"))
    }

    async fn cancel(&self, transaction_ref: &str) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_cancel {
            return Err(GatewayError::upstream(503, "processor unavailable"));
        }

        let key = Self::lookup_key(&state, transaction_ref)
            .ok_or_else(|| GatewayError::upstream(404, "transaction not found"))?;
        if let Some(txn) = state.transactions.get_mut(&key) {
            txn.status = "cancel".to_string();
        }
        Ok(())
    }

    async fn refund(
        &self,
        transaction_ref: &str,
        _amount: Option<Money>,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_refund {
            return Err(GatewayError::upstream(503, "processor unavailable"));
        }

        let key = Self::lookup_key(&state, transaction_ref)
            .ok_or_else(|| GatewayError::upstream(404, "transaction not found"))?;
        if let Some(txn) = state.transactions.get_mut(&key) {
            txn.status = "refund".to_string();
        }
        Ok(())
    }
}
