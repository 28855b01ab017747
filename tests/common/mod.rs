#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use pizzeria_api::{
    auth::user::{Model as UserModel, UserRole},
    build_router,
    config::AppConfig,
    db,
    entities::menu_item::{MenuCategory, Model as MenuItemModel, SizeOption, ToppingOption},
    events::{Event, EventSender},
    payments::{
        CreateIntentRequest, GatewayError, PaymentGateway, PaymentIntent, PaymentProvider,
        PaymentSignatureVerifier,
    },
    services::catalog::CreateMenuItemRequest,
    AppState,
};

pub const GATEWAY_SECRET: &str = "integration_gateway_secret";
pub const GATEWAY_KEY_ID: &str = "rzp_test_integration";

/// In-process gateway that issues sequential intent ids and records requests.
#[derive(Default)]
pub struct StubGateway {
    pub requests: Mutex<Vec<CreateIntentRequest>>,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_intent(
        &self,
        request: &CreateIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(PaymentIntent {
            id: format!("order_stub_{}", requests.len()),
            amount: request.amount,
            currency: request.currency.clone(),
        })
    }

    fn key_id(&self) -> String {
        GATEWAY_KEY_ID.to_string()
    }
}

/// A registered account and its bearer token.
pub struct TestUser {
    pub user: UserModel,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

/// Router over an in-memory SQLite database with a stub payment gateway.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<StubGateway>,
    pub verifier: PaymentSignatureVerifier,
    events: tokio::sync::Mutex<mpsc::Receiver<Event>>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(true).await
    }

    /// Same wiring, but without gateway credentials.
    pub async fn without_gateway() -> Self {
        Self::build(false).await
    }

    async fn build(with_gateway: bool) -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let pool = db::establish_connection(&cfg.database_url)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, events) = EventSender::channel(256);
        let gateway = Arc::new(StubGateway::default());
        let verifier = PaymentSignatureVerifier::new(GATEWAY_SECRET).expect("verifier");
        let provider = with_gateway.then(|| PaymentProvider::new(gateway.clone(), verifier.clone()));

        let state = AppState::new(Arc::new(pool), cfg, event_sender, provider);
        let router = build_router(state.clone());

        Self {
            router,
            state,
            gateway,
            verifier,
            events: tokio::sync::Mutex::new(events),
        }
    }

    async fn create_user(&self, email: &str, role: UserRole) -> TestUser {
        let user = self
            .state
            .auth
            .create_user("Test User", email, "secret-password", role)
            .await
            .expect("create test user");
        let token = self
            .state
            .auth
            .generate_token(&user)
            .expect("issue test token");
        TestUser { user, token }
    }

    pub async fn customer(&self, email: &str) -> TestUser {
        self.create_user(email, UserRole::User).await
    }

    pub async fn admin(&self) -> TestUser {
        self.create_user("admin@pizzeria.test", UserRole::Admin).await
    }

    pub async fn seed_menu_item(
        &self,
        name: &str,
        category: MenuCategory,
        base_price: Decimal,
        sizes: Vec<(&str, Decimal)>,
        toppings: Vec<(&str, Decimal)>,
    ) -> MenuItemModel {
        self.state
            .menu
            .create(CreateMenuItemRequest {
                name: name.to_string(),
                category,
                base_price,
                image: None,
                sizes: sizes
                    .into_iter()
                    .map(|(name, price_multiplier)| SizeOption {
                        name: name.to_string(),
                        price_multiplier,
                    })
                    .collect(),
                toppings: toppings
                    .into_iter()
                    .map(|(name, price)| ToppingOption {
                        name: name.to_string(),
                        price,
                    })
                    .collect(),
                is_available: true,
            })
            .await
            .expect("seed menu item")
    }

    /// Drains every event emitted so far.
    pub async fn drain_events(&self) -> Vec<Event> {
        let mut rx = self.events.lock().await;
        let mut drained = Vec::new();
        while let Ok(event) = rx.try_recv() {
            drained.push(event);
        }
        drained
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn request_as(
        &self,
        user: &TestUser,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(&user.token)).await
    }

    /// Signature the gateway would attach to a successful checkout.
    pub fn gateway_signature(&self, gateway_order_id: &str, payment_id: &str) -> String {
        self.verifier.expected_signature(gateway_order_id, payment_id)
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
