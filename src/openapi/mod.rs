use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Delivery API",
        version = "0.1.0",
        description = r#"
# Delivery API

Backend of a food-delivery marketplace: per-store carts, checkout into
immutable priced orders, and the order delivery lifecycle.

## Authentication

Every cart and order endpoint requires a bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Failures share one envelope, with the HTTP status carrying the error class:

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Toppings do not belong to this store",
  "invalidToppings": ["550e8400-e29b-41d4-a716-446655440000"],
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Carts", description = "Per-store carts and checkout"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Carts
        crate::handlers::carts::list_carts,
        crate::handlers::carts::get_cart,
        crate::handlers::carts::upsert_cart_item,
        crate::handlers::carts::clear_store_cart,
        crate::handlers::carts::clear_all_carts,
        crate::handlers::carts::checkout,
        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::advance_order_intake,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::reorder,
        crate::handlers::orders::list_store_orders,
        // Health
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::ResponseMeta,
            crate::errors::ErrorResponse,
            crate::services::carts::UpsertCartItemInput,
            crate::services::orders::CheckoutInput,
            crate::services::orders::UpdateStatusInput,
            crate::services::orders::UpdateOrderInput,
            crate::entities::order::OrderStatus,
            crate::entities::order::PaymentMethod,
            crate::entities::order::PaymentStatus,
            crate::entities::store::StoreStatus,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_cart_and_order_paths() {
        let json = ApiDocV1::openapi().to_json().unwrap();
        assert!(json.contains("Delivery API"));
        assert!(json.contains("/api/v1/carts/checkout"));
        assert!(json.contains("/api/v1/orders/{id}/status"));
        assert!(json.contains("Bearer"));
    }
}
