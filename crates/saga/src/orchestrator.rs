//! The order saga orchestrator.
//!
//! Drives an order through its lifecycle: checkout reserves inventory,
//! persists the aggregate, opens the payment transaction, and publishes
//! events; cancellation unwinds exactly the side effects that were
//! committed. Explicit API calls and asynchronous webhooks both land on the
//! same entry points here, so every transition runs through one state
//! machine under the order's lock.

use std::time::Instant;

use common::{OrderId, UserId};
use domain::{
    Address, CheckoutItem, DomainError, Order, OrderItem, OrderStatus, PaymentStatus, Product,
    ProductId,
};
use store::OrderStore;

use crate::error::{Result, SagaError};
use crate::lock::OrderLocks;
use crate::services::catalog::CatalogService;
use crate::services::events::Notifier;
use crate::services::gateway::{ChargeItem, ChargeRequest, CustomerDetails, PaymentGateway};
use crate::services::inventory::InventoryLedger;

/// A checkout request as submitted by the buyer.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub items: Vec<CheckoutItem>,
    pub shipping_address: Address,
    /// Defaults to the shipping address when absent.
    pub billing_address: Option<Address>,
}

/// Orchestrates the order checkout saga and all later lifecycle
/// transitions.
///
/// The four collaborators are injected at construction; the orchestrator
/// owns the per-order lock registry that serializes mutations.
pub struct Orchestrator<S, C, L, G>
where
    S: OrderStore,
    C: CatalogService,
    L: InventoryLedger,
    G: PaymentGateway,
{
    store: S,
    catalog: C,
    inventory: L,
    gateway: G,
    events: Notifier,
    locks: OrderLocks,
}

impl<S, C, L, G> Orchestrator<S, C, L, G>
where
    S: OrderStore,
    C: CatalogService,
    L: InventoryLedger,
    G: PaymentGateway,
{
    /// Creates a new orchestrator over the given collaborators.
    pub fn new(store: S, catalog: C, inventory: L, gateway: G, events: Notifier) -> Self {
        Self {
            store,
            catalog,
            inventory,
            gateway,
            events,
            locks: OrderLocks::new(),
        }
    }

    /// Executes the checkout saga.
    ///
    /// Reserves inventory line by line (releasing everything already taken,
    /// in reverse order, if any reservation fails), persists the order in
    /// `Pending`, opens the payment transaction, and publishes creation
    /// events. A gateway failure at the payment step deliberately leaves
    /// the order `Pending` with no transaction reference: inventory is
    /// already committed and silently releasing it would be worse than
    /// waiting for retry or reconciliation.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<Order> {
        metrics::counter!("checkouts_total").increment(1);
        let started = Instant::now();

        if request.items.is_empty() {
            return Err(DomainError::EmptyOrder.into());
        }
        if let Some(line) = request.items.iter().find(|l| l.quantity == 0) {
            return Err(DomainError::InvalidQuantity {
                product: line.product_id.clone(),
            }
            .into());
        }

        // Advisory stock check against catalog snapshots. The authoritative
        // check is the ledger reservation below.
        let mut products: Vec<Product> = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = self
                .catalog
                .get_product(&line.product_id)
                .await?
                .ok_or_else(|| DomainError::ProductNotFound(line.product_id.clone()))?;
            if product.stock < line.quantity {
                return Err(DomainError::InsufficientStock {
                    product: product.name,
                }
                .into());
            }
            products.push(product);
        }

        // Reserve in submission order. First compensation boundary: no
        // partial reservation may survive a failed checkout.
        let mut reserved: Vec<(ProductId, u32)> = Vec::new();
        let mut stock_levels: Vec<(ProductId, u32)> = Vec::new();
        for line in &request.items {
            match self.inventory.reserve(&line.product_id, line.quantity).await {
                Ok(remaining) => {
                    reserved.push((line.product_id.clone(), line.quantity));
                    stock_levels.push((line.product_id.clone(), remaining));
                }
                Err(e) => {
                    self.release_reserved(&reserved).await;
                    metrics::counter!("checkouts_failed_total").increment(1);
                    return Err(e);
                }
            }
        }

        // Price snapshots are captured here and never re-read afterwards.
        let items: Vec<OrderItem> = request
            .items
            .iter()
            .zip(&products)
            .map(|(line, product)| {
                OrderItem::new(
                    product.id.clone(),
                    product.name.clone(),
                    line.quantity,
                    product.price,
                )
            })
            .collect();

        let mut order = match Order::place(
            request.user_id,
            items,
            request.shipping_address,
            request.billing_address,
        ) {
            Ok(order) => order,
            Err(e) => {
                self.release_reserved(&reserved).await;
                return Err(e.into());
            }
        };

        // An order that was never persisted can never be cancelled, so its
        // reservations must not outlive a failed insert.
        if let Err(e) = self.store.insert(&order).await {
            self.release_reserved(&reserved).await;
            return Err(e.into());
        }

        match self.gateway.open_transaction(&build_charge(&order)).await {
            Ok(transaction_ref) => {
                order.set_payment_intent(transaction_ref);
                self.store.update(&order).await?;
            }
            Err(e) => {
                metrics::counter!("checkout_payment_failures_total").increment(1);
                tracing::error!(
                    order_id = %order.id(),
                    error = %e,
                    "payment transaction could not be opened; order left pending for reconciliation"
                );
            }
        }

        self.events.order_created(&order).await;
        for (product_id, stock) in &stock_levels {
            self.events.stock_changed(product_id, *stock).await;
        }
        self.events
            .notification(
                order.user_id(),
                format!("Your order #{} has been placed successfully.", order.id()),
                "order_created",
            )
            .await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id(), total = %order.total(), "order placed");
        Ok(order)
    }

    /// Loads an order by ID.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.load(order_id).await
    }

    /// Applies a fulfillment status unconditionally and records an optional
    /// tracking number. This path trusts its callers.
    #[tracing::instrument(skip(self, tracking_number))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<Order> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        order.set_status(status, tracking_number);
        self.store.update(&order).await?;

        self.events.order_status_changed(order_id, status).await;
        self.events
            .notification(
                order.user_id(),
                format!("Your order #{order_id} status has been updated to {status}."),
                "order_status_changed",
            )
            .await;
        Ok(order)
    }

    /// Applies a payment status reported by the gateway, coupling the
    /// fulfillment status (`Paid` forces `Processing`, `Refunded` forces
    /// `Refunded`).
    ///
    /// Idempotent: re-delivery of the current status persists nothing and
    /// emits nothing. Terminal orders and forbidden payment transitions are
    /// rejected, so out-of-order webhooks cannot regress settled state.
    #[tracing::instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        order_id: OrderId,
        payment_status: PaymentStatus,
    ) -> Result<Order> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        if !order.apply_payment_status(payment_status)? {
            tracing::debug!(%order_id, status = %payment_status, "payment status replay ignored");
            return Ok(order);
        }

        self.store.update(&order).await?;
        metrics::counter!("payment_status_updates_total").increment(1);

        self.events
            .order_status_changed(order_id, order.status())
            .await;
        self.events
            .notification(
                order.user_id(),
                format!("Payment for your order #{order_id} has been {payment_status}."),
                "payment_status_changed",
            )
            .await;
        Ok(order)
    }

    /// Queries the processor's current status vocabulary for an order's
    /// payment transaction.
    pub async fn query_payment_status(&self, order_id: OrderId) -> Result<String> {
        let order = self.load(order_id).await?;
        let reference = order
            .payment_intent_id()
            .map(str::to_string)
            .unwrap_or_else(|| order_id.to_string());
        Ok(self.gateway.query_status(&reference).await?)
    }

    /// Cancels an order, compensating the committed side effects.
    ///
    /// Inventory is released and the `Cancelled` status persisted before
    /// any gateway call, so a payment compensation failure (or timeout)
    /// never strands released stock: the order durably remains `Cancelled`
    /// with its pre-compensation payment status visible, and the error
    /// propagates for the caller to retry the payment side.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        order.begin_cancel()?;

        let mut released: Vec<(ProductId, u32)> = Vec::new();
        for item in order.items() {
            let level = self.inventory.release(&item.product_id, item.quantity).await?;
            released.push((item.product_id.clone(), level));
        }
        self.store.update(&order).await?;

        for (product_id, level) in &released {
            self.events.stock_changed(product_id, *level).await;
        }

        // Payment compensation. The transaction reference falls back to the
        // order id, which is how the processor keys transactions it opened.
        let reference = order
            .payment_intent_id()
            .map(str::to_string)
            .unwrap_or_else(|| order_id.to_string());
        match order.payment_status() {
            PaymentStatus::Pending => {
                self.gateway.cancel(&reference).await?;
                order.record_payment_compensation(PaymentStatus::Failed);
                self.store.update(&order).await?;
            }
            PaymentStatus::Paid => {
                self.gateway.refund(&reference, None).await?;
                order.record_payment_compensation(PaymentStatus::Refunded);
                self.store.update(&order).await?;
            }
            PaymentStatus::Failed | PaymentStatus::Refunded => {}
        }

        metrics::counter!("orders_cancelled_total").increment(1);
        self.events
            .order_status_changed(order_id, OrderStatus::Cancelled)
            .await;
        self.events
            .notification(
                order.user_id(),
                format!("Your order #{order_id} has been cancelled."),
                "order_cancelled",
            )
            .await;

        tracing::info!(%order_id, "order cancelled");
        Ok(order)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get(order_id)
            .await?
            .ok_or_else(|| SagaError::Domain(DomainError::OrderNotFound(order_id)))
    }

    /// Releases reservations taken earlier in this checkout attempt, in
    /// reverse order. Release failures are infrastructure errors; they are
    /// logged and the remaining releases still run.
    async fn release_reserved(&self, reserved: &[(ProductId, u32)]) {
        for (product_id, quantity) in reserved.iter().rev() {
            if let Err(e) = self.inventory.release(product_id, *quantity).await {
                tracing::error!(
                    %product_id,
                    quantity,
                    error = %e,
                    "failed to release reservation during checkout rollback"
                );
            }
        }
    }
}

fn build_charge(order: &Order) -> ChargeRequest {
    let shipping = order.shipping_address();
    ChargeRequest {
        order_id: order.id(),
        amount: order.total(),
        customer: CustomerDetails {
            first_name: shipping.first_name.clone(),
            last_name: shipping.last_name.clone(),
            email: shipping.email.clone(),
            phone: shipping.phone.clone(),
        },
        items: order
            .items()
            .iter()
            .map(|item| ChargeItem {
                id: item.product_id.to_string(),
                name: item.product_name.clone(),
                price_cents: item.unit_price.cents(),
                quantity: item.quantity,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use common::{Money, UserId};
    use store::InMemoryOrderStore;

    use crate::services::catalog::InMemoryCatalog;
    use crate::services::events::InMemoryEventPublisher;
    use crate::services::gateway::InMemoryPaymentGateway;
    use crate::services::inventory::InMemoryInventoryLedger;

    type TestOrchestrator = Orchestrator<
        InMemoryOrderStore,
        InMemoryCatalog,
        InMemoryInventoryLedger,
        InMemoryPaymentGateway,
    >;

    fn address() -> Address {
        Address {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+1-555-0100".to_string(),
            street: "1 Analytical Way".to_string(),
            city: "London".to_string(),
            postal_code: "SW1A 1AA".to_string(),
            country: "GB".to_string(),
        }
    }

    fn setup() -> (
        TestOrchestrator,
        InMemoryCatalog,
        InMemoryInventoryLedger,
        InMemoryPaymentGateway,
        InMemoryEventPublisher,
    ) {
        let store = InMemoryOrderStore::new();
        let catalog = InMemoryCatalog::new();
        let inventory = InMemoryInventoryLedger::new();
        let gateway = InMemoryPaymentGateway::new();
        let publisher = InMemoryEventPublisher::new();

        let orchestrator = Orchestrator::new(
            store,
            catalog.clone(),
            inventory.clone(),
            gateway.clone(),
            Notifier::new(Arc::new(publisher.clone())),
        );

        (orchestrator, catalog, inventory, gateway, publisher)
    }

    fn seed(catalog: &InMemoryCatalog, inventory: &InMemoryInventoryLedger) {
        catalog.add_product(Product::new("SKU-A", "Widget", Money::from_dollars(60), 10));
        catalog.add_product(Product::new("SKU-B", "Gadget", Money::from_dollars(50), 10));
        inventory.set_stock("SKU-A", 10);
        inventory.set_stock("SKU-B", 10);
    }

    fn request(items: Vec<CheckoutItem>) -> CheckoutRequest {
        CheckoutRequest {
            user_id: UserId::new(),
            items,
            shipping_address: address(),
            billing_address: None,
        }
    }

    #[tokio::test]
    async fn test_checkout_happy_path() {
        let (orchestrator, catalog, inventory, gateway, _) = setup();
        seed(&catalog, &inventory);

        let order = orchestrator
            .checkout(request(vec![
                CheckoutItem::new("SKU-A", 1),
                CheckoutItem::new("SKU-B", 1),
            ]))
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(order.total(), Money::from_dollars(121));
        assert!(order.payment_intent_id().is_some());
        assert_eq!(inventory.stock_of(&ProductId::new("SKU-A")), 9);
        assert_eq!(gateway.transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_checkout_unknown_product() {
        let (orchestrator, catalog, inventory, _, _) = setup();
        seed(&catalog, &inventory);

        let result = orchestrator
            .checkout(request(vec![CheckoutItem::new("SKU-404", 1)]))
            .await;
        assert!(matches!(
            result,
            Err(SagaError::Domain(DomainError::ProductNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_checkout_empty_cart() {
        let (orchestrator, _, _, _, _) = setup();
        let result = orchestrator.checkout(request(vec![])).await;
        assert!(matches!(
            result,
            Err(SagaError::Domain(DomainError::EmptyOrder))
        ));
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_order_pending() {
        let (orchestrator, catalog, inventory, gateway, _) = setup();
        seed(&catalog, &inventory);
        gateway.set_fail_on_charge(true);

        let order = orchestrator
            .checkout(request(vec![CheckoutItem::new("SKU-A", 1)]))
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.payment_intent_id().is_none());
        // Inventory stays committed: the order waits for reconciliation.
        assert_eq!(inventory.stock_of(&ProductId::new("SKU-A")), 9);

        let loaded = orchestrator.get_order(order.id()).await.unwrap();
        assert!(loaded.payment_intent_id().is_none());
    }

    #[tokio::test]
    async fn test_get_order_not_found() {
        let (orchestrator, _, _, _, _) = setup();
        let result = orchestrator.get_order(OrderId::new()).await;
        assert!(matches!(
            result,
            Err(SagaError::Domain(DomainError::OrderNotFound(_)))
        ));
    }
}
