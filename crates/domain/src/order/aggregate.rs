//! The `Order` aggregate.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::order::status::{OrderStatus, PaymentStatus};
use crate::order::value_objects::{Address, OrderItem};

/// Monetary breakdown of an order, derived once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl Totals {
    /// Shipping fee charged below the free-shipping threshold.
    const SHIPPING_FEE: i64 = 1000;
    /// Orders whose subtotal strictly exceeds this amount ship for free.
    const FREE_SHIPPING_THRESHOLD: i64 = 10_000;

    /// Computes subtotal, tax, shipping, and total for a set of line items.
    ///
    /// Tax is 10% of the subtotal, rounded half-up to the cent. Shipping is
    /// $10.00 unless the subtotal strictly exceeds $100.00 (so a subtotal of
    /// exactly $100.00 is still charged shipping).
    pub fn compute(items: &[OrderItem]) -> Self {
        let subtotal = items
            .iter()
            .fold(Money::zero(), |acc, item| acc + item.total);

        let tax = subtotal.percentage(10);
        let shipping = if subtotal > Money::from_cents(Self::FREE_SHIPPING_THRESHOLD) {
            Money::zero()
        } else {
            Money::from_cents(Self::SHIPPING_FEE)
        };

        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }
}

/// Aggregate root of the checkout saga.
///
/// Orders are created only through [`Order::place`] after inventory has been
/// reserved, are mutated only by the orchestrator, and are never deleted:
/// `Cancelled` and `Refunded` are permanent markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    payment_status: PaymentStatus,
    items: Vec<OrderItem>,
    subtotal: Money,
    tax: Money,
    shipping: Money,
    total: Money,
    payment_intent_id: Option<String>,
    tracking_number: Option<String>,
    shipping_address: Address,
    billing_address: Address,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order in `Pending`/`Pending` with totals derived from
    /// the given item snapshots.
    ///
    /// The billing address defaults to the shipping address when absent.
    pub fn place(
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: Address,
        billing_address: Option<Address>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::EmptyOrder);
        }
        if let Some(item) = items.iter().find(|i| i.quantity == 0) {
            return Err(DomainError::InvalidQuantity {
                product: item.product_id.clone(),
            });
        }

        let totals = Totals::compute(&items);
        let now = Utc::now();
        let billing_address = billing_address.unwrap_or_else(|| shipping_address.clone());

        Ok(Self {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            items,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            total: totals.total,
            payment_intent_id: None,
            tracking_number: None,
            shipping_address,
            billing_address,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax(&self) -> Money {
        self.tax
    }

    pub fn shipping(&self) -> Money {
        self.shipping
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent_id.as_deref()
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn billing_address(&self) -> &Address {
        &self.billing_address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records the gateway transaction reference once the charge is accepted.
    pub fn set_payment_intent(&mut self, transaction_id: impl Into<String>) {
        self.payment_intent_id = Some(transaction_id.into());
        self.touch();
    }

    /// Applies a fulfillment status unconditionally.
    ///
    /// The status-update path trusts its callers; no transition table
    /// restricts the target here.
    pub fn set_status(&mut self, status: OrderStatus, tracking_number: Option<String>) {
        self.status = status;
        if tracking_number.is_some() {
            self.tracking_number = tracking_number;
        }
        self.touch();
    }

    /// Applies a payment status update from the gateway, coupling the
    /// fulfillment status where required.
    ///
    /// Returns `Ok(false)` when the status is already current (idempotent
    /// replay, nothing to persist). A change on an order whose fulfillment
    /// status is terminal, or one the payment transition table forbids, is
    /// rejected.
    pub fn apply_payment_status(&mut self, new: PaymentStatus) -> Result<bool, DomainError> {
        if self.payment_status == new {
            return Ok(false);
        }

        if self.status.is_terminal() || !self.payment_status.can_transition_to(new) {
            return Err(DomainError::InvalidPaymentTransition {
                from: self.payment_status,
                to: new,
            });
        }

        self.payment_status = new;
        match new {
            PaymentStatus::Paid => self.status = OrderStatus::Processing,
            PaymentStatus::Refunded => self.status = OrderStatus::Refunded,
            PaymentStatus::Pending | PaymentStatus::Failed => {}
        }
        self.touch();
        Ok(true)
    }

    /// Moves the order to `Cancelled` if its status permits cancellation.
    pub fn begin_cancel(&mut self) -> Result<(), DomainError> {
        if !self.status.can_cancel() {
            return Err(DomainError::CannotCancel {
                status: self.status,
            });
        }
        self.status = OrderStatus::Cancelled;
        self.touch();
        Ok(())
    }

    /// Records the payment outcome of a cancellation compensation.
    ///
    /// This bypasses the fulfillment coupling: the order stays `Cancelled`
    /// while the payment axis moves to `Failed` (transaction voided) or
    /// `Refunded` (funds returned).
    pub fn record_payment_compensation(&mut self, status: PaymentStatus) {
        self.payment_status = status;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
