//! Payment webhook and status endpoints.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::OrderId;
use saga::WebhookPayload;
use serde::Serialize;
use store::OrderStore;

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct WebhookResponse {
    pub order_id: String,
    pub payment_status: String,
}

#[derive(Serialize)]
pub struct PaymentStatusResponse {
    pub order_id: String,
    pub transaction_status: String,
}

/// POST /payment/webhook — receive a notification from the payment
/// processor, authenticated by the `x-signature` header, and reconcile the
/// order it refers to.
#[tracing::instrument(skip(state, headers, payload), fields(order_id = %payload.order_id))]
pub async fn webhook<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<WebhookResponse>, ApiError> {
    // A missing or unreadable header fails verification like any bad
    // signature would.
    let signature = headers
        .get("x-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let applied = state.reconciler.reconcile(&payload, signature).await?;

    Ok(Json(WebhookResponse {
        order_id: payload.order_id,
        payment_status: applied.to_string(),
    }))
}

/// GET /payment/status/:order_id — query the processor's view of the
/// order's payment transaction.
#[tracing::instrument(skip(state))]
pub async fn status<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let id = OrderId::from_str(&order_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;

    let transaction_status = state.orchestrator.query_payment_status(id).await?;

    Ok(Json(PaymentStatusResponse {
        order_id,
        transaction_status,
    }))
}
