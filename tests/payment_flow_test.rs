//! Payment intents, confirmation and failure reports through the HTTP router.
//!
//! Tests cover:
//! - Intent creation in minor units against the stub gateway
//! - Signature verification, replay idempotency and tamper rejection
//! - Binding a confirmation to the intent issued for the same order
//! - Independence of the payment and fulfillment tracks
//! - Owner gating and a gateway that is not configured

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, TestUser, GATEWAY_KEY_ID};
use pizzeria_api::{entities::menu_item::MenuCategory, events::Event};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

/// Places a single-line order worth 80 and returns its id.
async fn place_order(app: &TestApp, customer: &TestUser) -> String {
    let item = app
        .seed_menu_item(
            "Veggie Pizza",
            MenuCategory::Pizza,
            dec!(20),
            vec![("Pan", dec!(1)), ("Cheese Burst", dec!(1.5))],
            vec![("Onion", dec!(5)), ("Corn", dec!(5))],
        )
        .await;
    let response = app
        .request_as(
            customer,
            Method::POST,
            "/api/orders",
            Some(json!({
                "items": [{
                    "menuItemId": item.id.to_string(),
                    "selectedSize": { "name": "Cheese Burst" },
                    "selectedToppings": [{ "name": "Onion" }, { "name": "Corn" }],
                    "quantity": 2
                }],
                "deliveryLocation": "Room 12, Hostel B"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn create_intent(app: &TestApp, customer: &TestUser, order_id: &str) -> Value {
    let response = app
        .request_as(
            customer,
            Method::POST,
            "/api/payments/create",
            Some(json!({ "orderId": order_id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await["data"].clone()
}

async fn order_state(app: &TestApp, user: &TestUser, order_id: &str) -> Value {
    let response = app
        .request_as(user, Method::GET, &format!("/api/orders/{}", order_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await["data"].clone()
}

fn verification(order_id: &str, gateway_order_id: &str, payment_id: &str, signature: &str) -> Value {
    json!({
        "razorpayOrderId": gateway_order_id,
        "razorpayPaymentId": payment_id,
        "razorpaySignature": signature,
        "orderId": order_id
    })
}

// ==================== Intents ====================

#[tokio::test]
async fn intent_is_created_in_minor_units() {
    let app = TestApp::new().await;
    let customer = app.customer("payer@example.com").await;
    let order_id = place_order(&app, &customer).await;

    let intent = create_intent(&app, &customer, &order_id).await;
    assert_eq!(intent["amount"], 8000);
    assert_eq!(intent["currency"], "INR");
    assert_eq!(intent["gateway_order_id"], "order_stub_1");
    assert_eq!(intent["order_id"], order_id.as_str());
    assert_eq!(intent["key_id"], GATEWAY_KEY_ID);

    let requests = app.gateway.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, 8000);
    assert_eq!(requests[0].receipt, order_id);
    assert_eq!(requests[0].notes.user_id, customer.id().to_string());

    let order = order_state(&app, &customer, &order_id).await;
    assert_eq!(order["gateway_order_id"], "order_stub_1");
    assert_eq!(order["payment_status"], "pending");
}

#[tokio::test]
async fn intent_requires_an_order_id_and_ownership() {
    let app = TestApp::new().await;
    let customer = app.customer("owner@example.com").await;
    let stranger = app.customer("stranger@example.com").await;
    let order_id = place_order(&app, &customer).await;

    let response = app
        .request_as(&customer, Method::POST, "/api/payments/create", Some(json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Order ID is required"));

    let response = app
        .request_as(
            &stranger,
            Method::POST,
            "/api/payments/create",
            Some(json!({ "orderId": order_id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_as(
            &customer,
            Method::POST,
            "/api/payments/create",
            Some(json!({ "orderId": uuid::Uuid::new_v4().to_string() })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(app.gateway.requests.lock().unwrap().is_empty());
}

// ==================== Verification ====================

#[tokio::test]
async fn valid_signature_marks_order_paid_once() {
    let app = TestApp::new().await;
    let customer = app.customer("verify@example.com").await;
    let order_id = place_order(&app, &customer).await;
    let intent = create_intent(&app, &customer, &order_id).await;
    let gateway_order_id = intent["gateway_order_id"].as_str().unwrap();
    app.drain_events().await;

    let signature = app.gateway_signature(gateway_order_id, "pay_001");
    let payload = verification(&order_id, gateway_order_id, "pay_001", &signature);

    let response = app
        .request_as(&customer, Method::POST, "/api/payments/verify", Some(payload.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Payment verified successfully");
    assert_eq!(body["data"]["payment_status"], "paid");
    assert_eq!(body["data"]["order_status"], "placed");

    let events = app.drain_events().await;
    assert!(matches!(events.as_slice(), [Event::PaymentConfirmed { .. }]));

    // Replaying the same confirmation changes nothing.
    let response = app
        .request_as(&customer, Method::POST, "/api/payments/verify", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.drain_events().await.is_empty());

    // A paid order cannot be charged again.
    let response = app
        .request_as(
            &customer,
            Method::POST,
            "/api/payments/create",
            Some(json!({ "orderId": order_id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("already paid"));
}

#[tokio::test]
async fn tampered_signature_marks_order_failed() {
    let app = TestApp::new().await;
    let customer = app.customer("tamper@example.com").await;
    let order_id = place_order(&app, &customer).await;
    let intent = create_intent(&app, &customer, &order_id).await;
    let gateway_order_id = intent["gateway_order_id"].as_str().unwrap();
    app.drain_events().await;

    let signature = app.gateway_signature(gateway_order_id, "pay_other");
    let response = app
        .request_as(
            &customer,
            Method::POST,
            "/api/payments/verify",
            Some(verification(&order_id, gateway_order_id, "pay_001", &signature)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(
        body["message"],
        "Payment verification failed - Invalid signature"
    );

    let order = order_state(&app, &customer, &order_id).await;
    assert_eq!(order["payment_status"], "failed");
    let events = app.drain_events().await;
    assert!(matches!(
        events.as_slice(),
        [Event::PaymentFailed { reason: Some(reason), .. }] if reason == "Invalid signature"
    ));

    // A fresh intent may be issued after a failure and paid normally.
    let retry = create_intent(&app, &customer, &order_id).await;
    let retry_gateway_id = retry["gateway_order_id"].as_str().unwrap();
    let signature = app.gateway_signature(retry_gateway_id, "pay_002");
    let response = app
        .request_as(
            &customer,
            Method::POST,
            "/api/payments/verify",
            Some(verification(&order_id, retry_gateway_id, "pay_002", &signature)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(order_state(&app, &customer, &order_id).await["payment_status"], "paid");
}

#[tokio::test]
async fn confirmation_for_another_orders_intent_is_rejected() {
    let app = TestApp::new().await;
    let customer = app.customer("replay@example.com").await;
    let expensive = place_order(&app, &customer).await;
    let cheap = place_order(&app, &customer).await;

    create_intent(&app, &customer, &expensive).await;
    let cheap_intent = create_intent(&app, &customer, &cheap).await;
    let cheap_gateway_id = cheap_intent["gateway_order_id"].as_str().unwrap();
    let signature = app.gateway_signature(cheap_gateway_id, "pay_cheap");

    let response = app
        .request_as(
            &customer,
            Method::POST,
            "/api/payments/verify",
            Some(verification(&expensive, cheap_gateway_id, "pay_cheap", &signature)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Gateway order does not belong to this order"));
    assert_eq!(order_state(&app, &customer, &expensive).await["payment_status"], "failed");
    assert_eq!(order_state(&app, &customer, &cheap).await["payment_status"], "pending");
}

#[tokio::test]
async fn verification_without_an_intent_is_rejected() {
    let app = TestApp::new().await;
    let customer = app.customer("nointent@example.com").await;
    let order_id = place_order(&app, &customer).await;
    let signature = app.gateway_signature("order_forged", "pay_001");

    let response = app
        .request_as(
            &customer,
            Method::POST,
            "/api/payments/verify",
            Some(verification(&order_id, "order_forged", "pay_001", &signature)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("No payment intent was issued for this order"));
}

#[tokio::test]
async fn missing_verification_parameters_are_rejected() {
    let app = TestApp::new().await;
    let customer = app.customer("missing@example.com").await;
    let order_id = place_order(&app, &customer).await;

    let response = app
        .request_as(
            &customer,
            Method::POST,
            "/api/payments/verify",
            Some(json!({ "orderId": order_id, "razorpayOrderId": "order_stub_1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Missing payment verification parameters"));
    assert_eq!(order_state(&app, &customer, &order_id).await["payment_status"], "pending");
}

#[tokio::test]
async fn payment_and_fulfillment_tracks_are_independent() {
    let app = TestApp::new().await;
    let customer = app.customer("tracks@example.com").await;
    let admin = app.admin().await;
    let order_id = place_order(&app, &customer).await;
    let intent = create_intent(&app, &customer, &order_id).await;

    let response = app
        .request_as(
            &admin,
            Method::PUT,
            &format!("/api/orders/admin/{}", order_id),
            Some(json!({ "orderStatus": "dispatched" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let gateway_order_id = intent["gateway_order_id"].as_str().unwrap();
    let signature = app.gateway_signature(gateway_order_id, "pay_late");
    let response = app
        .request_as(
            &customer,
            Method::POST,
            "/api/payments/verify",
            Some(verification(&order_id, gateway_order_id, "pay_late", &signature)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let order = order_state(&app, &customer, &order_id).await;
    assert_eq!(order["payment_status"], "paid");
    assert_eq!(order["order_status"], "dispatched");
}

// ==================== Failure Reports ====================

#[tokio::test]
async fn failure_report_marks_order_failed() {
    let app = TestApp::new().await;
    let customer = app.customer("failure@example.com").await;
    let stranger = app.customer("nosy@example.com").await;
    let order_id = place_order(&app, &customer).await;
    app.drain_events().await;

    let payload = json!({
        "orderId": order_id,
        "error": { "code": "BAD_REQUEST_ERROR", "description": "Card declined" }
    });

    let response = app
        .request_as(&stranger, Method::POST, "/api/payments/failure", Some(payload.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_as(&customer, Method::POST, "/api/payments/failure", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Payment failure recorded");
    assert_eq!(body["data"]["payment_status"], "failed");

    let events = app.drain_events().await;
    assert!(matches!(
        events.as_slice(),
        [Event::PaymentFailed { reason: Some(reason), .. }] if reason == "Card declined"
    ));
}

#[tokio::test]
async fn admin_may_report_failure_for_any_order() {
    let app = TestApp::new().await;
    let customer = app.customer("adminreport@example.com").await;
    let admin = app.admin().await;
    let order_id = place_order(&app, &customer).await;

    let response = app
        .request_as(
            &admin,
            Method::POST,
            "/api/payments/failure",
            Some(json!({ "orderId": order_id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(order_state(&app, &customer, &order_id).await["payment_status"], "failed");
}

// ==================== Configuration ====================

#[tokio::test]
async fn payments_are_unavailable_without_gateway_credentials() {
    let app = TestApp::without_gateway().await;
    let customer = app.customer("offline@example.com").await;
    let order_id = place_order(&app, &customer).await;

    let response = app
        .request_as(
            &customer,
            Method::POST,
            "/api/payments/create",
            Some(json!({ "orderId": order_id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
