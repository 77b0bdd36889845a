//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Saga or domain error, mapped by variant.
    Saga(SagaError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    match &err {
        SagaError::Domain(domain_err) => match domain_err {
            DomainError::ProductNotFound(_) | DomainError::OrderNotFound(_) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            DomainError::InsufficientStock { .. }
            | DomainError::InvalidQuantity { .. }
            | DomainError::EmptyOrder => (StatusCode::BAD_REQUEST, err.to_string()),
            DomainError::CannotCancel { .. } | DomainError::InvalidPaymentTransition { .. } => {
                (StatusCode::CONFLICT, err.to_string())
            }
        },
        SagaError::Gateway(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        SagaError::InvalidSignature => (StatusCode::UNAUTHORIZED, err.to_string()),
        SagaError::MalformedWebhook(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        SagaError::Store(_) => {
            tracing::error!(error = %err, "storage failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use domain::{OrderStatus, PaymentStatus};

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_not_found_mapping() {
        let err = ApiError::Saga(SagaError::Domain(DomainError::OrderNotFound(OrderId::new())));
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_insufficient_stock_is_bad_request() {
        let err = ApiError::Saga(SagaError::Domain(DomainError::InsufficientStock {
            product: "Widget".to_string(),
        }));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_lifecycle_conflicts_map_to_409() {
        let cancel = ApiError::Saga(SagaError::Domain(DomainError::CannotCancel {
            status: OrderStatus::Cancelled,
        }));
        assert_eq!(status_of(cancel), StatusCode::CONFLICT);

        let transition = ApiError::Saga(SagaError::Domain(DomainError::InvalidPaymentTransition {
            from: PaymentStatus::Paid,
            to: PaymentStatus::Failed,
        }));
        assert_eq!(status_of(transition), StatusCode::CONFLICT);
    }

    #[test]
    fn test_gateway_failure_is_bad_gateway() {
        let err = ApiError::Saga(SagaError::Gateway(saga::GatewayError::upstream(
            503,
            "processor unavailable",
        )));
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_signature_is_unauthorized() {
        let err = ApiError::Saga(SagaError::InvalidSignature);
        assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
    }
}
