//! HTTP API server with observability for the storefront order backend.
//!
//! Provides REST endpoints for checkout, order lifecycle, and payment
//! webhook reconciliation, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    InMemoryCatalog, InMemoryEventPublisher, InMemoryInventoryLedger, InMemoryPaymentGateway,
    Notifier, Orchestrator, SignatureVerifier, WebhookReconciler,
};
use store::{InMemoryOrderStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::checkout::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", post(routes::orders::update_status::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/payment/webhook", post(routes::payment::webhook::<S>))
        .route("/payment/status/{order_id}", get(routes::payment::status::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over the given order store, wiring the
/// in-memory catalog, inventory ledger, payment gateway, and event
/// publisher around the orchestrator.
pub fn create_state<S: OrderStore + Clone + 'static>(
    store: S,
    server_key: &str,
) -> Arc<AppState<S>> {
    let catalog = InMemoryCatalog::new();
    let inventory = InMemoryInventoryLedger::new();
    let gateway = InMemoryPaymentGateway::new();
    let publisher = InMemoryEventPublisher::new();

    let orchestrator = Arc::new(Orchestrator::new(
        store,
        catalog.clone(),
        inventory.clone(),
        gateway.clone(),
        Notifier::new(Arc::new(publisher)),
    ));
    let reconciler =
        WebhookReconciler::new(orchestrator.clone(), SignatureVerifier::new(server_key));

    Arc::new(AppState {
        orchestrator,
        reconciler,
        catalog,
        inventory,
        gateway,
    })
}

/// Creates the default application state over the in-memory order store.
pub fn create_default_state(server_key: &str) -> Arc<AppState<InMemoryOrderStore>> {
    create_state(InMemoryOrderStore::new(), server_key)
}
