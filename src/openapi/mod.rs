use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pizzeria API",
        version = "0.1.0",
        description = r#"
# Pizzeria ordering API

Catalog browsing, order placement and online payment for a pizzeria storefront.

## Pricing

Order totals are always computed on the server from the catalog. Any price a
client sends is ignored.

## Order lifecycle

Every order tracks two independent statuses:
- `order_status`: `placed` → `preparing` → `dispatched` → `delivered`, moved by administrators
- `payment_status`: `pending` → `paid` | `failed`, moved only by payment verification and failure reports

## Authentication

Protected endpoints expect a bearer token obtained from `/api/auth/login` or `/api/auth/signup`:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Errors share one body shape:

```json
{
  "error": "Bad Request",
  "message": "Invalid size selected",
  "request_id": "req-abc123xyz",
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
        (url = "http://localhost:5000", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Sign up, log in and identify the caller"),
        (name = "menu", description = "Catalog browsing and administration"),
        (name = "orders", description = "Order placement and fulfillment"),
        (name = "payments", description = "Payment intents, verification and failure reports"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Health
        crate::handlers::health::health_check,

        // Auth
        crate::handlers::auth::signup,
        crate::handlers::auth::login,
        crate::handlers::auth::me,

        // Menu
        crate::handlers::menu::list_menu,
        crate::handlers::menu::list_by_category,
        crate::handlers::menu::create_menu_item,
        crate::handlers::menu::update_menu_item,
        crate::handlers::menu::toggle_menu_item,
        crate::handlers::menu::delete_menu_item,

        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_my_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::list_all_orders,
        crate::handlers::orders::update_order_status,

        // Payments
        crate::handlers::payments::create_payment,
        crate::handlers::payments::verify_payment,
        crate::handlers::payments::payment_failure,
    ),
    components(
        schemas(
            // Common types
            crate::ResponseMeta,
            crate::handlers::health::HealthStatus,

            // Auth types
            crate::auth::SignupRequest,
            crate::auth::LoginRequest,
            crate::auth::UserResponse,
            crate::auth::AuthResponse,
            crate::auth::user::UserRole,

            // Menu types
            crate::services::catalog::CreateMenuItemRequest,
            crate::services::catalog::UpdateMenuItemRequest,
            crate::services::catalog::MenuItemResponse,
            crate::entities::menu_item::MenuCategory,
            crate::entities::menu_item::SizeOption,
            crate::entities::menu_item::ToppingOption,

            // Order types
            crate::services::pricing::CartLine,
            crate::services::pricing::SelectedOption,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::UpdateOrderStatusRequest,
            crate::services::orders::OrderResponse,
            crate::entities::order::OrderLineItem,
            crate::entities::order::OrderStatus,
            crate::entities::order::PaymentStatus,
            crate::entities::order::PaymentMethod,

            // Payment types
            crate::services::payments::CreatePaymentIntentRequest,
            crate::services::payments::PaymentIntentResponse,
            crate::services::payments::VerifyPaymentRequest,
            crate::services::payments::VerifyPaymentResponse,
            crate::services::payments::PaymentFailureRequest,
            crate::services::payments::PaymentFailureResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerSecurity)
)]
pub struct ApiDoc;

/// Registers the `Bearer` JWT scheme referenced by protected paths.
struct BearerSecurity;

impl Modify for BearerSecurity {
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
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_every_route_group() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Pizzeria API"));
        assert!(json.contains("/api/orders/admin/{id}"));
        assert!(json.contains("/api/payments/verify"));
        assert!(json.contains("/api/menu/category/{category}"));
        assert!(json.contains("\"Bearer\""));
    }
}
