use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{ApiJson, ApiPath, ApiQuery},
    services::{
        carts::CartView,
        orders::{
            CancelledOrder, OrderView, StoreOrderPage, StoreOrderQuery, UpdateOrderInput,
            UpdateStatusInput,
        },
    },
    ApiResponse, ApiResult, AppState,
};

/// List the caller's orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Orders of the current user at approved stores, most recently updated first",
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<Vec<OrderView>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "No orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<OrderView>> {
    let orders = state
        .services
        .orders
        .list_user_orders(auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Get an order with its items, toppings and ship info
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(order_id): ApiPath<Uuid>,
) -> ApiResult<OrderView> {
    let order = state.services.orders.get_order(&auth_user, order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Staff edit of payment status and internal note
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    summary = "Update order metadata",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderInput,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderView>),
        (status = 400, description = "Unknown payment status", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not staff of the store", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(order_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateOrderInput>,
) -> ApiResult<OrderView> {
    let order = state
        .services
        .orders
        .update_metadata(&auth_user, order_id, input)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Apply a delivery status transition
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    summary = "Update order status",
    description = "Allowed: taken -> delivering | finished, delivering -> delivered, delivered -> done",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateStatusInput,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<OrderView>),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not staff of the store", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(order_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateStatusInput>,
) -> ApiResult<OrderView> {
    let order = state
        .services
        .orders
        .update_status(&auth_user, order_id, &input.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Advance an order along the intake chain
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/intake",
    summary = "Advance order intake",
    description = "preorder -> pending -> confirmed -> taken",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Status advanced", body = ApiResponse<OrderView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not staff of the store", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order already past intake", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn advance_order_intake(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(order_id): ApiPath<Uuid>,
) -> ApiResult<OrderView> {
    let order = state
        .services
        .orders
        .advance_intake(&auth_user, order_id)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Cancel a pre-transit order
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    summary = "Cancel order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<CancelledOrder>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the order's owner", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is past pending", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(order_id): ApiPath<Uuid>,
) -> ApiResult<CancelledOrder> {
    let cancelled = state
        .services
        .orders
        .cancel(auth_user.user_id, order_id)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        cancelled,
        "Order cancelled",
    )))
}

/// Rebuild a cart from a past order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/reorder",
    summary = "Reorder",
    description = "Replaces the caller's cart for the order's store with the order's items at their original prices",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 201, description = "Cart rebuilt", body = ApiResponse<CartView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Blocked store, unavailable dish or foreign order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn reorder(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(order_id): ApiPath<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<CartView>>), ServiceError> {
    let cart = state
        .services
        .carts
        .reconstruct_from_order(auth_user.user_id, order_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(cart))))
}

/// Order board of one store
#[utoipa::path(
    get,
    path = "/api/v1/stores/{id}/orders",
    summary = "List store orders",
    params(
        ("id" = Uuid, Path, description = "Store id"),
        StoreOrderQuery
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<StoreOrderPage>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not staff of the store", body = crate::errors::ErrorResponse),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_store_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(store_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<StoreOrderQuery>,
) -> ApiResult<StoreOrderPage> {
    let page = state
        .services
        .orders
        .list_store_orders(&auth_user, store_id, query)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}
