//! Domain event publishing.
//!
//! Notifications are best-effort: a publish failure is logged and swallowed,
//! never surfaced as an operation failure and never retried synchronously.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus, ProductId};
use thiserror::Error;

/// Topics published to the message exchange.
pub mod topics {
    pub const ORDER_CREATED: &str = "orders.created";
    pub const ORDER_STATUS_CHANGED: &str = "orders.status_changed";
    pub const STOCK_CHANGED: &str = "products.stock_changed";
    pub const NOTIFICATION: &str = "notifications.send";
}

/// Failure to hand a payload to the message exchange.
#[derive(Debug, Clone, Error)]
#[error("Event publish error: {0}")]
pub struct PublishError(pub String);

/// Sink for outbound domain notifications.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one payload to a topic.
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), PublishError>;
}

/// Typed, best-effort wrapper over the raw publisher.
///
/// Every status or payment-status change the orchestrator persists is paired
/// with exactly one call here; the pairing is the notification invariant.
#[derive(Clone)]
pub struct Notifier {
    publisher: Arc<dyn EventPublisher>,
}

impl Notifier {
    /// Creates a notifier over the given publisher.
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    /// Announces a newly created order.
    pub async fn order_created(&self, order: &Order) {
        match serde_json::to_value(order) {
            Ok(payload) => self.fire(topics::ORDER_CREATED, payload).await,
            Err(e) => tracing::warn!(order_id = %order.id(), error = %e, "could not encode order event"),
        }
    }

    /// Announces a fulfillment status change.
    pub async fn order_status_changed(&self, order_id: OrderId, status: OrderStatus) {
        let payload = serde_json::json!({
            "order_id": order_id,
            "status": status,
        });
        self.fire(topics::ORDER_STATUS_CHANGED, payload).await;
    }

    /// Announces a stock level change for one product.
    pub async fn stock_changed(&self, product_id: &ProductId, stock: u32) {
        let payload = serde_json::json!({
            "product_id": product_id,
            "stock": stock,
            "timestamp": Utc::now(),
        });
        self.fire(topics::STOCK_CHANGED, payload).await;
    }

    /// Sends a user-facing notification.
    pub async fn notification(&self, user_id: UserId, message: String, kind: &str) {
        let payload = serde_json::json!({
            "user_id": user_id,
            "message": message,
            "type": kind,
            "timestamp": Utc::now(),
        });
        self.fire(topics::NOTIFICATION, payload).await;
    }

    async fn fire(&self, topic: &str, payload: serde_json::Value) {
        if let Err(e) = self.publisher.publish(topic, payload).await {
            metrics::counter!("event_publish_failures_total").increment(1);
            tracing::warn!(topic, error = %e, "event publish failed");
        }
    }
}

/// In-memory publisher that records everything it is handed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    state: Arc<RwLock<InMemoryPublisherState>>,
}

#[derive(Debug, Default)]
struct InMemoryPublisherState {
    events: Vec<(String, serde_json::Value)>,
    fail: bool,
}

impl InMemoryEventPublisher {
    /// Creates a new in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the publisher to fail every publish call.
    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap().fail = fail;
    }

    /// Returns the number of recorded events.
    pub fn published_count(&self) -> usize {
        self.state.read().unwrap().events.len()
    }

    /// Returns the payloads recorded for a topic, in publish order.
    pub fn events_for(&self, topic: &str) -> Vec<serde_json::Value> {
        self.state
            .read()
            .unwrap()
            .events
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), PublishError> {
        let mut state = self.state.write().unwrap();
        if state.fail {
            return Err(PublishError("exchange unreachable".to_string()));
        }
        state.events.push((topic.to_string(), payload));
        Ok(())
    }
}
