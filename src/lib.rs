//! Pizzeria API Library
//!
//! Catalog, server-side pricing, order lifecycle and payment reconciliation
//! for a food-ordering storefront.
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
pub mod notifications;
pub mod openapi;
pub mod payments;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{
    extract::FromRef,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use http::HeaderValue;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::ToSchema;

use crate::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    events::EventSender,
    payments::PaymentProvider,
    repositories::OrderRepository,
    services::{
        catalog::{CatalogOracle, MenuService},
        orders::OrderService,
        payments::PaymentService,
    },
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub event_sender: EventSender,
    pub auth: Arc<AuthService>,
    pub menu: Arc<MenuService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
}

impl AppState {
    /// Wires the services over one connection. A `None` provider leaves the
    /// payment endpoints answering `503`.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: AppConfig,
        event_sender: EventSender,
        provider: Option<PaymentProvider>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&config),
            db.clone(),
        ));
        let menu = Arc::new(MenuService::new(db.clone()));
        let catalog: Arc<dyn CatalogOracle> = menu.clone();
        let orders = Arc::new(OrderService::new(
            db.clone(),
            catalog,
            event_sender.clone(),
            config.fulfillment_policy,
        ));
        let payments = Arc::new(PaymentService::new(
            OrderRepository::new(db.clone()),
            provider,
            event_sender.clone(),
            config.payment.currency.clone(),
        ));

        Self {
            db,
            config,
            event_sender,
            auth,
            menu,
            orders,
            payments,
        }
    }
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
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
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
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every `/api` route. Authentication is enforced per handler through the
/// `AuthUser` extractor.
pub fn api_routes() -> Router<AppState> {
    let auth_routes = Router::new()
        .route("/signup", post(handlers::auth::signup))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me));

    let menu_routes = Router::new()
        .route(
            "/",
            get(handlers::menu::list_menu).post(handlers::menu::create_menu_item),
        )
        .route("/category/:category", get(handlers::menu::list_by_category))
        .route(
            "/:id",
            put(handlers::menu::update_menu_item).delete(handlers::menu::delete_menu_item),
        )
        .route("/:id/toggle", put(handlers::menu::toggle_menu_item));

    let order_routes = Router::new()
        .route(
            "/",
            get(handlers::orders::list_my_orders).post(handlers::orders::create_order),
        )
        .route("/admin/all", get(handlers::orders::list_all_orders))
        .route("/admin/:id", put(handlers::orders::update_order_status))
        .route("/:id", get(handlers::orders::get_order));

    let payment_routes = Router::new()
        .route("/create", post(handlers::payments::create_payment))
        .route("/verify", post(handlers::payments::verify_payment))
        .route("/failure", post(handlers::payments::payment_failure));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/auth", auth_routes)
        .nest("/menu", menu_routes)
        .nest("/orders", order_routes)
        .nest("/payments", payment_routes)
}

/// CORS from the configured origin list. Without one, development is
/// permissive and every other environment refuses cross-origin requests.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                ::tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.is_development() {
        ::tracing::info!("Using permissive CORS; no origins configured in development");
        CorsLayer::permissive()
    } else {
        ::tracing::warn!("No CORS origins configured; cross-origin requests will be rejected");
        CorsLayer::new()
    }
}

/// Full application router: API, docs and the shared middleware stack.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(|| async { "pizzeria-api up" }))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
