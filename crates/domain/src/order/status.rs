//! Fulfillment and payment status machines.
//!
//! An order tracks two orthogonal axes: `OrderStatus` is the fulfillment
//! state owned by this system, `PaymentStatus` mirrors the gateway's view of
//! the payment transaction. Collapsing them into one enum would lose
//! representable states such as a mid-fulfillment order whose payment is
//! still pending.

use serde::{Deserialize, Serialize};

/// Fulfillment state of an order.
///
/// ```text
/// Pending ──► Processing ──┬──► Refunded
///    │            │        │
///    └────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, payment not yet confirmed.
    #[default]
    Pending,

    /// Payment confirmed, order is being fulfilled.
    Processing,

    /// Order was cancelled (terminal).
    Cancelled,

    /// Payment was returned to the buyer (terminal).
    Refunded,
}

impl OrderStatus {
    /// Returns true if cancellation is permitted from this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The gateway's view of the payment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Transaction opened, awaiting settlement.
    #[default]
    Pending,

    /// Funds captured or settled.
    Paid,

    /// Transaction denied, expired, or cancelled.
    Failed,

    /// Funds returned to the buyer (terminal).
    Refunded,
}

impl PaymentStatus {
    /// Returns true if the payment may move from this status to `to`.
    ///
    /// Webhooks can arrive out of order; the table keeps a late `Failed`
    /// notification from regressing a payment that already settled or was
    /// refunded.
    pub fn can_transition_to(&self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, to),
            (Pending, Paid | Failed | Refunded) | (Paid, Refunded) | (Failed, Paid)
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
