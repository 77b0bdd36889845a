//! Order checkout and lifecycle endpoints.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{OrderId, UserId};
use domain::{Address, CheckoutItem, Order, OrderStatus};
use saga::{
    CheckoutRequest, InMemoryCatalog, InMemoryInventoryLedger, InMemoryPaymentGateway,
    Orchestrator, WebhookReconciler,
};
use serde::{Deserialize, Serialize};
use store::OrderStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub orchestrator:
        Arc<Orchestrator<S, InMemoryCatalog, InMemoryInventoryLedger, InMemoryPaymentGateway>>,
    pub reconciler:
        WebhookReconciler<S, InMemoryCatalog, InMemoryInventoryLedger, InMemoryPaymentGateway>,
    pub catalog: InMemoryCatalog,
    pub inventory: InMemoryInventoryLedger,
    pub gateway: InMemoryPaymentGateway,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub user_id: Option<String>,
    pub items: Vec<CheckoutLine>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
}

#[derive(Deserialize)]
pub struct CheckoutLine {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateStatusBody {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub payment_status: String,
    pub items: Vec<OrderItemResponse>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub payment_intent_id: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl OrderResponse {
    fn from_order(order: &Order) -> Self {
        let items = order
            .items()
            .iter()
            .map(|item| OrderItemResponse {
                product_id: item.product_id.to_string(),
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price.cents(),
                total_cents: item.total.cents(),
            })
            .collect();

        Self {
            id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            status: order.status().to_string(),
            payment_status: order.payment_status().to_string(),
            items,
            subtotal_cents: order.subtotal().cents(),
            tax_cents: order.tax().cents(),
            shipping_cents: order.shipping().cents(),
            total_cents: order.total().cents(),
            payment_intent_id: order.payment_intent_id().map(String::from),
            tracking_number: order.tracking_number().map(String::from),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — run the checkout saga for a cart.
#[tracing::instrument(skip(state, body))]
pub async fn checkout<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CheckoutBody>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let user_id = if let Some(ref id_str) = body.user_id {
        let uuid = uuid::Uuid::parse_str(id_str)
            .map_err(|e| ApiError::BadRequest(format!("Invalid user_id: {e}")))?;
        UserId::from_uuid(uuid)
    } else {
        UserId::new()
    };

    let items = body
        .items
        .iter()
        .map(|line| CheckoutItem::new(line.product_id.as_str(), line.quantity))
        .collect();

    let order = state
        .orchestrator
        .checkout(CheckoutRequest {
            user_id,
            items,
            shipping_address: body.shipping_address,
            billing_address: body.billing_address,
        })
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(OrderResponse::from_order(&order)),
    ))
}

/// GET /orders/:id — load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.orchestrator.get_order(order_id).await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// POST /orders/:id/status — update the fulfillment status.
#[tracing::instrument(skip(state, body))]
pub async fn update_status<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .orchestrator
        .update_status(order_id, body.status, body.tracking_number)
        .await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// POST /orders/:id/cancel — cancel an order and compensate.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.orchestrator.cancel(order_id).await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    OrderId::from_str(id).map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))
}
