//! Delivery API Library
//!
//! Backend of a food-delivery marketplace: per-store carts, atomic checkout
//! into priced orders, and the order delivery lifecycle.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::FromRef,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::AuthService;
use crate::config::AppConfig;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }

    /// Successful response carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn message_response_has_no_data() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-msg"), async {
                ApiResponse::<()>::message("Cart cleared")
            })
            .await;

        assert!(response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("Cart cleared"));
        assert_eq!(
            response.meta.and_then(|m| m.request_id).as_deref(),
            Some("meta-msg")
        );
    }

    #[test]
    fn envelope_serializes_camel_case_meta() {
        let value = serde_json::to_value(ApiResponse::success_with_message(1, "done")).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "done");
        assert_eq!(value["data"], 1);
        assert!(value["meta"]["timestamp"].is_string());
        assert!(value["meta"].get("request_id").is_none());
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Cart, order and store routes, mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    let carts = Router::new()
        .route(
            "/carts",
            get(handlers::carts::list_carts)
                .put(handlers::carts::upsert_cart_item)
                .delete(handlers::carts::clear_all_carts),
        )
        .route("/carts/checkout", post(handlers::carts::checkout))
        // GET takes a cart id, DELETE a store id
        .route(
            "/carts/:id",
            get(handlers::carts::get_cart).delete(handlers::carts::clear_store_cart),
        );

    let orders = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route(
            "/orders/:id",
            get(handlers::orders::get_order)
                .put(handlers::orders::update_order)
                .delete(handlers::orders::cancel_order),
        )
        .route(
            "/orders/:id/status",
            put(handlers::orders::update_order_status),
        )
        .route(
            "/orders/:id/intake",
            post(handlers::orders::advance_order_intake),
        )
        .route("/orders/:id/reorder", post(handlers::orders::reorder))
        .route(
            "/stores/:id/orders",
            get(handlers::orders::list_store_orders),
        );

    Router::new().merge(carts).merge(orders)
}

/// Full application router: health, versioned API and Swagger UI, with
/// request-id propagation and HTTP tracing applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
