//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::Money;
use domain::Product;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::SignatureVerifier;
use store::InMemoryOrderStore;
use tower::ServiceExt;

const SERVER_KEY: &str = "test-server-key";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (
    axum::Router,
    Arc<api::routes::orders::AppState<InMemoryOrderStore>>,
) {
    let state = api::create_default_state(SERVER_KEY);
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

fn seed_product(
    state: &api::routes::orders::AppState<InMemoryOrderStore>,
    id: &str,
    name: &str,
    price: Money,
    stock: u32,
) {
    state.catalog.add_product(Product::new(id, name, price, stock));
    state.inventory.set_stock(id, stock);
}

fn address_json() -> serde_json::Value {
    serde_json::json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": "ada@example.com",
        "phone": "+1-555-0100",
        "street": "1 Analytical Way",
        "city": "London",
        "postal_code": "SW1A 1AA",
        "country": "GB"
    })
}

fn checkout_body(items: serde_json::Value) -> String {
    serde_json::to_string(&serde_json::json!({
        "items": items,
        "shipping_address": address_json()
    }))
    .unwrap()
}

async fn post_json(app: axum::Router, uri: &str, body: String) -> (StatusCode, serde_json::Value) {
    post_signed(app, uri, body, None).await
}

async fn post_signed(
    app: axum::Router,
    uri: &str,
    body: String,
    signature: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-signature", signature);
    }

    let response = app
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();
    let (status, json) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_checkout_returns_created_order() {
    let (app, state) = setup();
    seed_product(&state, "SKU-A", "Alpha Widget", Money::from_dollars(60), 10);
    seed_product(&state, "SKU-B", "Beta Widget", Money::from_dollars(50), 10);

    let (status, order) = post_json(
        app,
        "/orders",
        checkout_body(serde_json::json!([
            { "product_id": "SKU-A", "quantity": 1 },
            { "product_id": "SKU-B", "quantity": 1 }
        ])),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(order["subtotal_cents"], 11_000);
    assert_eq!(order["tax_cents"], 1_100);
    assert_eq!(order["shipping_cents"], 0);
    assert_eq!(order["total_cents"], 12_100);
    assert!(order["payment_intent_id"].as_str().is_some());
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_checkout_insufficient_stock() {
    let (app, state) = setup();
    seed_product(&state, "SKU-A", "Alpha Widget", Money::from_dollars(20), 2);

    let (status, json) = post_json(
        app,
        "/orders",
        checkout_body(serde_json::json!([{ "product_id": "SKU-A", "quantity": 3 }])),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Alpha Widget"));
}

#[tokio::test]
async fn test_checkout_unknown_product() {
    let (app, _) = setup();

    let (status, _) = post_json(
        app,
        "/orders",
        checkout_body(serde_json::json!([{ "product_id": "SKU-404", "quantity": 1 }])),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_and_get_order() {
    let (app, state) = setup();
    seed_product(&state, "SKU-A", "Alpha Widget", Money::from_dollars(20), 10);

    let (_, created) = post_json(
        app.clone(),
        "/orders",
        checkout_body(serde_json::json!([{ "product_id": "SKU-A", "quantity": 2 }])),
    )
    .await;
    let order_id = created["id"].as_str().unwrap();

    let (status, order) = get_json(app, &format!("/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["id"], order_id);
    assert_eq!(order["total_cents"], 5_400);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let (app, _) = setup();
    let fake_id = uuid::Uuid::new_v4();
    let (status, _) = get_json(app, &format!("/orders/{fake_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_order_id_format() {
    let (app, _) = setup();
    let (status, _) = get_json(app, "/orders/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_order() {
    let (app, state) = setup();
    seed_product(&state, "SKU-A", "Alpha Widget", Money::from_dollars(20), 10);

    let (_, created) = post_json(
        app.clone(),
        "/orders",
        checkout_body(serde_json::json!([{ "product_id": "SKU-A", "quantity": 3 }])),
    )
    .await;
    let order_id = created["id"].as_str().unwrap();

    let (status, cancelled) = post_json(
        app.clone(),
        &format!("/orders/{order_id}/cancel"),
        String::new(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["payment_status"], "failed");

    // A second cancel conflicts with the terminal status.
    let (status, _) = post_json(app, &format!("/orders/{order_id}/cancel"), String::new()).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_status_with_tracking() {
    let (app, state) = setup();
    seed_product(&state, "SKU-A", "Alpha Widget", Money::from_dollars(20), 10);

    let (_, created) = post_json(
        app.clone(),
        "/orders",
        checkout_body(serde_json::json!([{ "product_id": "SKU-A", "quantity": 1 }])),
    )
    .await;
    let order_id = created["id"].as_str().unwrap();

    let (status, updated) = post_json(
        app,
        &format!("/orders/{order_id}/status"),
        serde_json::to_string(&serde_json::json!({
            "status": "processing",
            "tracking_number": "TRACK-42"
        }))
        .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "processing");
    assert_eq!(updated["tracking_number"], "TRACK-42");
}

#[tokio::test]
async fn test_webhook_settlement_marks_order_paid() {
    let (app, state) = setup();
    seed_product(&state, "SKU-A", "Alpha Widget", Money::from_dollars(20), 10);

    let (_, created) = post_json(
        app.clone(),
        "/orders",
        checkout_body(serde_json::json!([{ "product_id": "SKU-A", "quantity": 1 }])),
    )
    .await;
    let order_id = created["id"].as_str().unwrap().to_string();

    let verifier = SignatureVerifier::new(SERVER_KEY);
    let signature = verifier.expected(&order_id, "200", "32.00");
    let (status, json) = post_signed(
        app.clone(),
        "/payment/webhook",
        serde_json::to_string(&serde_json::json!({
            "order_id": order_id,
            "transaction_status": "settlement",
            "status_code": "200",
            "gross_amount": "32.00"
        }))
        .unwrap(),
        Some(&signature),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["payment_status"], "paid");

    let (_, order) = get_json(app, &format!("/orders/{order_id}")).await;
    assert_eq!(order["status"], "processing");
    assert_eq!(order["payment_status"], "paid");
}

#[tokio::test]
async fn test_webhook_rejects_forged_signature() {
    let (app, state) = setup();
    seed_product(&state, "SKU-A", "Alpha Widget", Money::from_dollars(20), 10);

    let (_, created) = post_json(
        app.clone(),
        "/orders",
        checkout_body(serde_json::json!([{ "product_id": "SKU-A", "quantity": 1 }])),
    )
    .await;
    let order_id = created["id"].as_str().unwrap().to_string();

    let (status, _) = post_signed(
        app.clone(),
        "/payment/webhook",
        serde_json::to_string(&serde_json::json!({
            "order_id": order_id,
            "transaction_status": "settlement",
            "status_code": "200",
            "gross_amount": "32.00"
        }))
        .unwrap(),
        Some("forged"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The rejected notification changed nothing.
    let (_, order) = get_json(app, &format!("/orders/{order_id}")).await;
    assert_eq!(order["payment_status"], "pending");
}

#[tokio::test]
async fn test_webhook_missing_signature_rejected() {
    let (app, state) = setup();
    seed_product(&state, "SKU-A", "Alpha Widget", Money::from_dollars(20), 10);

    let (_, created) = post_json(
        app.clone(),
        "/orders",
        checkout_body(serde_json::json!([{ "product_id": "SKU-A", "quantity": 1 }])),
    )
    .await;
    let order_id = created["id"].as_str().unwrap().to_string();

    let (status, _) = post_json(
        app,
        "/payment/webhook",
        serde_json::to_string(&serde_json::json!({
            "order_id": order_id,
            "transaction_status": "settlement",
            "status_code": "200",
            "gross_amount": "32.00"
        }))
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_payment_status_passthrough() {
    let (app, state) = setup();
    seed_product(&state, "SKU-A", "Alpha Widget", Money::from_dollars(20), 10);

    let (_, created) = post_json(
        app.clone(),
        "/orders",
        checkout_body(serde_json::json!([{ "product_id": "SKU-A", "quantity": 1 }])),
    )
    .await;
    let order_id = created["id"].as_str().unwrap();

    let (status, json) = get_json(app, &format!("/payment/status/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order_id"], order_id);
    assert_eq!(json["transaction_status"], "pending");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
