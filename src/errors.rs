use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error envelope returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "success": false,
    "error": "Bad Request",
    "message": "Toppings do not belong to this store",
    "invalidToppings": ["550e8400-e29b-41d4-a716-446655440000"],
    "requestId": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// HTTP status category (e.g., "Not Found", "Conflict")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Topping ids rejected by a cart upsert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_toppings: Option<Vec<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error was produced
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    InvalidReference(String),

    #[error("Toppings do not belong to this store")]
    InvalidToppingSelection { invalid_toppings: Vec<Uuid> },

    #[error("{0}")]
    InvalidCheckout(String),

    #[error("{0}")]
    EmptyOperation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BlockedStore(String),

    #[error("{0}")]
    OutOfStock(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::InvalidRequest(err.to_string())
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        ServiceError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::InvalidRequest(rejection.body_text())
    }
}

impl ServiceError {
    /// Maps a unique-index violation to `Conflict`, leaving every other
    /// database error untouched.
    pub fn from_insert(err: DbErr, conflict_message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                ServiceError::Conflict(conflict_message.to_string())
            }
            _ => ServiceError::DatabaseError(err),
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_)
            | Self::InvalidReference(_)
            | Self::InvalidToppingSelection { .. }
            | Self::InvalidCheckout(_)
            | Self::EmptyOperation(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) | Self::BlockedStore(_) | Self::OutOfStock(_) => {
                StatusCode::FORBIDDEN
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message surfaced to the client. Unexpected failures pass their
    /// message through as-is.
    pub fn response_message(&self) -> String {
        self.to_string()
    }

    pub fn invalid_toppings(&self) -> Option<&[Uuid]> {
        match self {
            Self::InvalidToppingSelection { invalid_toppings } => Some(invalid_toppings),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            success: false,
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            invalid_toppings: self.invalid_toppings().map(<[Uuid]>::to_vec),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("Cart not found".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!payload.success);
        assert_eq!(payload.message, "Cart not found");
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
    }

    #[tokio::test]
    async fn topping_errors_list_offending_ids() {
        let bad = Uuid::new_v4();
        let response = ServiceError::InvalidToppingSelection {
            invalid_toppings: vec![bad],
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["invalidToppings"][0], bad.to_string());
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::InvalidCheckout("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::EmptyOperation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::BlockedStore("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::OutOfStock("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::InvalidTransition {
                from: "taken".into(),
                to: "taken".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InternalError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unexpected_failures_pass_message_through() {
        let err = ServiceError::DatabaseError(DbErr::Custom("connection reset".into()));
        assert!(err.response_message().contains("connection reset"));
        assert_eq!(
            ServiceError::InvalidTransition {
                from: "delivered".into(),
                to: "taken".into()
            }
            .response_message(),
            "Cannot change status from delivered to taken"
        );
    }

    #[test]
    fn non_unique_insert_errors_stay_database_errors() {
        let err = ServiceError::from_insert(DbErr::Custom("boom".into()), "duplicate cart");
        assert!(matches!(err, ServiceError::DatabaseError(_)));
    }
}
