use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::str::FromStr;

use crate::{
    auth::{ensure_admin, AuthUser},
    entities::menu_item::MenuCategory,
    errors::ServiceError,
    handlers::{
        common::{created_response, message_response, parse_id, success_response},
        AppState,
    },
    services::catalog::{
        CatalogOracle, CreateMenuItemRequest, MenuItemResponse, UpdateMenuItemRequest,
    },
    ApiResponse, ApiResult,
};

fn to_responses(
    items: Vec<crate::entities::menu_item::Model>,
) -> Result<Vec<MenuItemResponse>, ServiceError> {
    items.into_iter().map(MenuItemResponse::try_from).collect()
}

/// List available menu items
#[utoipa::path(
    get,
    path = "/api/menu",
    summary = "Available menu",
    responses(
        (status = 200, description = "Available items", body = ApiResponse<Vec<MenuItemResponse>>),
    ),
    tag = "menu"
)]
pub async fn list_menu(State(state): State<AppState>) -> ApiResult<Vec<MenuItemResponse>> {
    let items = state.menu.find_available(None).await?;
    Ok(success_response(to_responses(items)?))
}

/// List available items in one category
#[utoipa::path(
    get,
    path = "/api/menu/category/{category}",
    summary = "Menu by category",
    params(("category" = String, Path, description = "pizza, drinks or sides")),
    responses(
        (status = 200, description = "Available items in category", body = ApiResponse<Vec<MenuItemResponse>>),
        (status = 400, description = "Invalid category", body = crate::errors::ErrorResponse),
    ),
    tag = "menu"
)]
pub async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Vec<MenuItemResponse>> {
    let category = MenuCategory::from_str(category.trim())
        .map_err(|_| ServiceError::ValidationError("Invalid category".to_string()))?;
    let items = state.menu.find_available(Some(category)).await?;
    Ok(success_response(to_responses(items)?))
}

/// Create a menu item
#[utoipa::path(
    post,
    path = "/api/menu",
    summary = "Create menu item",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Menu item created", body = ApiResponse<MenuItemResponse>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu"
)]
pub async fn create_menu_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MenuItemResponse>>), ServiceError> {
    ensure_admin(&user)?;
    let item = state.menu.create(payload).await?;
    Ok(created_response(MenuItemResponse::try_from(item)?))
}

/// Partially update a menu item
#[utoipa::path(
    put,
    path = "/api/menu/{id}",
    summary = "Update menu item",
    params(("id" = String, Path, description = "Menu item id")),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item updated", body = ApiResponse<MenuItemResponse>),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Menu item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu"
)]
pub async fn update_menu_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMenuItemRequest>,
) -> ApiResult<MenuItemResponse> {
    ensure_admin(&user)?;
    let item = state
        .menu
        .update(parse_id(&id, "Menu item")?, payload)
        .await?;
    Ok(success_response(MenuItemResponse::try_from(item)?))
}

/// Flip a menu item's availability
#[utoipa::path(
    put,
    path = "/api/menu/{id}/toggle",
    summary = "Toggle availability",
    params(("id" = String, Path, description = "Menu item id")),
    responses(
        (status = 200, description = "Availability toggled", body = ApiResponse<MenuItemResponse>),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Menu item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu"
)]
pub async fn toggle_menu_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<MenuItemResponse> {
    ensure_admin(&user)?;
    let item = state
        .menu
        .toggle_availability(parse_id(&id, "Menu item")?)
        .await?;
    Ok(success_response(MenuItemResponse::try_from(item)?))
}

/// Delete a menu item
#[utoipa::path(
    delete,
    path = "/api/menu/{id}",
    summary = "Delete menu item",
    params(("id" = String, Path, description = "Menu item id")),
    responses(
        (status = 200, description = "Menu item deleted"),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Menu item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu"
)]
pub async fn delete_menu_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    ensure_admin(&user)?;
    state.menu.delete(parse_id(&id, "Menu item")?).await?;
    Ok(message_response((), "Menu item deleted"))
}
