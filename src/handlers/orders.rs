use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::{
        common::{created_response, parse_id, success_response},
        AppState,
    },
    services::orders::{CreateOrderRequest, OrderResponse, UpdateOrderStatusRequest},
    ApiResponse, ApiResult,
};

/// Place an order; totals are computed from the catalog
#[utoipa::path(
    post,
    path = "/api/orders",
    summary = "Create order",
    description = "Prices every line from the catalog. Client-supplied prices are ignored.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = ApiResponse<OrderResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid cart, size, topping or quantity", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Menu item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let order = state.orders.create_order(&user, payload).await?;
    Ok(created_response(order))
}

/// The caller's orders, newest first
#[utoipa::path(
    get,
    path = "/api/orders",
    summary = "My orders",
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<Vec<OrderResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<OrderResponse>> {
    Ok(success_response(state.orders.list_mine(&user).await?))
}

/// Fetch one order (owner or admin)
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    summary = "Get order",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<OrderResponse> {
    let order = state.orders.get(&user, parse_id(&id, "Order")?).await?;
    Ok(success_response(order))
}

/// Every order, newest first (admin)
#[utoipa::path(
    get,
    path = "/api/orders/admin/all",
    summary = "All orders",
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<Vec<OrderResponse>>),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<OrderResponse>> {
    Ok(success_response(state.orders.list_all(&user).await?))
}

/// Move an order along the fulfillment track (admin)
#[utoipa::path(
    put,
    path = "/api/orders/admin/{id}",
    summary = "Update order status",
    params(("id" = String, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid status or disallowed transition", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .orders
        .update_fulfillment(&user, parse_id(&id, "Order")?, payload)
        .await?;
    Ok(success_response(order))
}
