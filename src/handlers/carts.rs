use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{ApiJson, ApiPath},
    services::{
        carts::{CartListEntry, CartMutation, CartView, UpsertCartItemInput},
        orders::{CheckoutInput, OrderView},
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearedCarts {
    pub carts_removed: u64,
}

/// List the caller's carts
#[utoipa::path(
    get,
    path = "/api/v1/carts",
    summary = "List carts",
    description = "Carts of the current user at approved stores, each with the store's rating aggregate",
    responses(
        (status = 200, description = "Carts retrieved", body = ApiResponse<Vec<CartListEntry>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "No carts", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Carts"
)]
pub async fn list_carts(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<CartListEntry>> {
    let carts = state.services.carts.list_carts(auth_user.user_id).await?;
    Ok(Json(ApiResponse::success(carts)))
}

/// Get one of the caller's carts
#[utoipa::path(
    get,
    path = "/api/v1/carts/{id}",
    summary = "Get cart",
    params(("id" = Uuid, Path, description = "Cart id")),
    responses(
        (status = 200, description = "Cart retrieved", body = ApiResponse<CartView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Carts"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(cart_id): ApiPath<Uuid>,
) -> ApiResult<CartView> {
    let cart = state
        .services
        .carts
        .get_cart(auth_user.user_id, cart_id)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

/// Add, overwrite or remove a cart line
#[utoipa::path(
    put,
    path = "/api/v1/carts",
    summary = "Upsert cart item",
    description = "Quantity 0 removes the line; removing the last line deletes the cart and returns no data",
    request_body = UpsertCartItemInput,
    responses(
        (status = 200, description = "Cart updated or removed", body = ApiResponse<CartView>),
        (status = 400, description = "Invalid dish, toppings or empty operation", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent cart creation", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Carts"
)]
pub async fn upsert_cart_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiJson(input): ApiJson<UpsertCartItemInput>,
) -> ApiResult<CartView> {
    match state
        .services
        .carts
        .upsert_item(auth_user.user_id, input)
        .await?
    {
        CartMutation::Updated(cart) => Ok(Json(ApiResponse::success_with_message(
            cart,
            "Cart updated",
        ))),
        CartMutation::Removed { .. } => Ok(Json(ApiResponse::message(
            "Cart deleted because it's empty",
        ))),
    }
}

/// Clear the caller's cart for one store
#[utoipa::path(
    delete,
    path = "/api/v1/carts/{id}",
    summary = "Clear store cart",
    params(("id" = Uuid, Path, description = "Store id")),
    responses(
        (status = 200, description = "Cart cleared", body = ApiResponse<serde_json::Value>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "No cart for this store", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Carts"
)]
pub async fn clear_store_cart(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiPath(store_id): ApiPath<Uuid>,
) -> ApiResult<()> {
    state
        .services
        .carts
        .clear_store_cart(auth_user.user_id, store_id)
        .await?;
    Ok(Json(ApiResponse::message("Cart cleared")))
}

/// Clear every cart of the caller
#[utoipa::path(
    delete,
    path = "/api/v1/carts",
    summary = "Clear all carts",
    responses(
        (status = 200, description = "Carts cleared", body = ApiResponse<ClearedCarts>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Carts"
)]
pub async fn clear_all_carts(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<ClearedCarts> {
    let carts_removed = state.services.carts.clear_all(auth_user.user_id).await?;
    Ok(Json(ApiResponse::success(ClearedCarts { carts_removed })))
}

/// Convert the caller's cart for a store into an order
#[utoipa::path(
    post,
    path = "/api/v1/carts/checkout",
    summary = "Checkout",
    request_body = CheckoutInput,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderView>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Missing cart, address or location", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 409, description = "Cart already checked out", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Carts"
)]
pub async fn checkout(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiJson(input): ApiJson<CheckoutInput>,
) -> Result<(StatusCode, Json<ApiResponse<OrderView>>), ServiceError> {
    let order = state
        .services
        .orders
        .checkout(auth_user.user_id, input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(order, "Order placed")),
    ))
}
