//! Order placement and fulfillment through the HTTP router.
//!
//! Tests cover:
//! - Server-side pricing that ignores client-supplied prices
//! - All-or-nothing cart rejection
//! - Read gating between customers and administrators
//! - Administrative fulfillment updates

mod common;

use std::str::FromStr;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use pizzeria_api::{
    entities::menu_item::{MenuCategory, Model as MenuItemModel},
    events::Event,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn veggie_pizza(app: &TestApp) -> MenuItemModel {
    app.seed_menu_item(
        "Veggie Pizza",
        MenuCategory::Pizza,
        dec!(20),
        vec![("Pan", dec!(1)), ("Cheese Burst", dec!(1.5))],
        vec![
            ("Capsicum", dec!(5)),
            ("Onion", dec!(5)),
            ("Corn", dec!(5)),
            ("Tomato", dec!(5)),
        ],
    )
    .await
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal serialized as string")).expect("decimal")
}

fn veggie_order(item: &MenuItemModel) -> Value {
    json!({
        "items": [{
            "menuItemId": item.id.to_string(),
            "selectedSize": { "name": "Cheese Burst" },
            "selectedToppings": [{ "name": "Onion" }, { "name": "Corn" }],
            "quantity": 2,
            "unitPrice": 1,
            "totalPrice": 2
        }],
        "deliveryLocation": "Room 12, Hostel B",
        "totalAmount": 2
    })
}

// ==================== Order Placement ====================

#[tokio::test]
async fn order_total_is_computed_from_catalog() {
    let app = TestApp::new().await;
    let item = veggie_pizza(&app).await;
    let customer = app.customer("priya@example.com").await;

    let response = app
        .request_as(&customer, Method::POST, "/api/orders", Some(veggie_order(&item)))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    let order = &body["data"];
    assert_eq!(decimal(&order["total_amount"]), dec!(80));
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(order["order_status"], "placed");
    assert_eq!(order["payment_method"], "ONLINE");
    assert_eq!(order["user_id"], customer.id().to_string());

    let line = &order["items"][0];
    assert_eq!(line["name"], "Veggie Pizza");
    assert_eq!(line["quantity"], 2);
    assert_eq!(decimal(&line["unit_price"]), dec!(40));
    assert_eq!(decimal(&line["total_price"]), dec!(80));
    assert_eq!(line["selected_size"]["name"], "Cheese Burst");
    assert_eq!(line["selected_toppings"].as_array().unwrap().len(), 2);

    let events = app.drain_events().await;
    assert!(matches!(events.as_slice(), [Event::OrderCreated { .. }]));
}

#[tokio::test]
async fn string_quantity_and_cod_are_accepted() {
    let app = TestApp::new().await;
    let coffee = app
        .seed_menu_item("Cold Coffee", MenuCategory::Drinks, dec!(20), vec![], vec![])
        .await;
    let customer = app.customer("cod@example.com").await;

    let response = app
        .request_as(
            &customer,
            Method::POST,
            "/api/orders",
            Some(json!({
                "items": [{ "menuItemId": coffee.id.to_string(), "quantity": "3" }],
                "deliveryLocation": "Library",
                "paymentMethod": "COD"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(decimal(&body["data"]["total_amount"]), dec!(60));
    assert_eq!(body["data"]["payment_method"], "COD");
}

#[tokio::test]
async fn one_invalid_line_rejects_the_whole_cart() {
    let app = TestApp::new().await;
    let item = veggie_pizza(&app).await;
    let customer = app.customer("atomic@example.com").await;

    let response = app
        .request_as(
            &customer,
            Method::POST,
            "/api/orders",
            Some(json!({
                "items": [
                    { "menuItemId": item.id.to_string(), "quantity": 1 },
                    {
                        "menuItemId": item.id.to_string(),
                        "selectedToppings": [{ "name": "Pineapple" }],
                        "quantity": 1
                    }
                ],
                "deliveryLocation": "Gate 2"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid topping: Pineapple"));

    let listed = response_json(
        app.request_as(&customer, Method::GET, "/api/orders", None)
            .await,
    )
    .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 0);
    assert!(app.drain_events().await.is_empty());
}

#[tokio::test]
async fn cart_rejections_map_to_expected_statuses() {
    let app = TestApp::new().await;
    let item = veggie_pizza(&app).await;
    let customer = app.customer("reject@example.com").await;

    let cases = [
        (
            json!({ "items": [], "deliveryLocation": "Gate 2" }),
            StatusCode::BAD_REQUEST,
            "No order items provided",
        ),
        (
            json!({ "items": [{ "menuItemId": item.id.to_string(), "quantity": 1 }], "deliveryLocation": "   " }),
            StatusCode::BAD_REQUEST,
            "Delivery location is required",
        ),
        (
            json!({ "items": [{ "menuItemId": item.id.to_string(), "quantity": 0 }], "deliveryLocation": "Gate 2" }),
            StatusCode::BAD_REQUEST,
            "Invalid quantity",
        ),
        (
            json!({ "items": [{ "menuItemId": item.id.to_string(), "selectedSize": { "name": "Family" }, "quantity": 1 }], "deliveryLocation": "Gate 2" }),
            StatusCode::BAD_REQUEST,
            "Invalid size: Family",
        ),
        (
            json!({ "items": [{ "menuItemId": "not-a-uuid", "quantity": 1 }], "deliveryLocation": "Gate 2" }),
            StatusCode::NOT_FOUND,
            "Menu item not found",
        ),
        (
            json!({ "items": [{ "menuItemId": item.id.to_string(), "quantity": 1 }], "deliveryLocation": "Gate 2", "paymentMethod": "CARD" }),
            StatusCode::BAD_REQUEST,
            "Invalid payment method",
        ),
    ];

    for (payload, status, message) in cases {
        let response = app
            .request_as(&customer, Method::POST, "/api/orders", Some(payload))
            .await;
        assert_eq!(response.status(), status, "expected {status} for {message}");
        let body = response_json(response).await;
        assert!(
            body["message"].as_str().unwrap().contains(message),
            "unexpected message: {}",
            body["message"]
        );
    }
}

#[tokio::test]
async fn unavailable_items_cannot_be_ordered() {
    let app = TestApp::new().await;
    let item = veggie_pizza(&app).await;
    app.state.menu.toggle_availability(item.id).await.unwrap();
    let customer = app.customer("closed@example.com").await;

    let response = app
        .request_as(&customer, Method::POST, "/api/orders", Some(veggie_order(&item)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Menu item is not available"));
}

#[tokio::test]
async fn ordering_requires_authentication() {
    let app = TestApp::new().await;
    let item = veggie_pizza(&app).await;

    let response = app
        .request(Method::POST, "/api/orders", Some(veggie_order(&item)), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/orders", None, Some("not-a-token"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ==================== Reads ====================

#[tokio::test]
async fn customers_see_only_their_own_orders() {
    let app = TestApp::new().await;
    let item = veggie_pizza(&app).await;
    let alice = app.customer("alice@example.com").await;
    let bob = app.customer("bob@example.com").await;
    let admin = app.admin().await;

    let created = response_json(
        app.request_as(&alice, Method::POST, "/api/orders", Some(veggie_order(&item)))
            .await,
    )
    .await;
    let order_id = created["data"]["id"].as_str().unwrap().to_string();

    let mine = response_json(app.request_as(&bob, Method::GET, "/api/orders", None).await).await;
    assert!(mine["data"].as_array().unwrap().is_empty());

    let uri = format!("/api/orders/{}", order_id);
    let response = app.request_as(&bob, Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.request_as(&alice, Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request_as(&admin, Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_as(&alice, Method::GET, "/api/orders/not-a-uuid", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_lists_every_order_newest_first() {
    let app = TestApp::new().await;
    let item = veggie_pizza(&app).await;
    let alice = app.customer("first@example.com").await;
    let bob = app.customer("second@example.com").await;
    let admin = app.admin().await;

    for user in [&alice, &bob] {
        let response = app
            .request_as(user, Method::POST, "/api/orders", Some(veggie_order(&item)))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let response = app
        .request_as(&alice, Method::GET, "/api/orders/admin/all", None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let all = response_json(
        app.request_as(&admin, Method::GET, "/api/orders/admin/all", None)
            .await,
    )
    .await;
    let orders = all["data"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["user_id"], bob.id().to_string());
    assert_eq!(orders[1]["user_id"], alice.id().to_string());
}

// ==================== Fulfillment ====================

#[tokio::test]
async fn admin_moves_fulfillment_status() {
    let app = TestApp::new().await;
    let item = veggie_pizza(&app).await;
    let customer = app.customer("hungry@example.com").await;
    let admin = app.admin().await;

    let created = response_json(
        app.request_as(&customer, Method::POST, "/api/orders", Some(veggie_order(&item)))
            .await,
    )
    .await;
    let uri = format!("/api/orders/admin/{}", created["data"]["id"].as_str().unwrap());
    app.drain_events().await;

    let response = app
        .request_as(
            &customer,
            Method::PUT,
            &uri,
            Some(json!({ "orderStatus": "delivered" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_as(&admin, Method::PUT, &uri, Some(json!({ "orderStatus": "cooking" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_as(
            &admin,
            Method::PUT,
            &uri,
            Some(json!({ "orderStatus": "dispatched" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["order_status"], "dispatched");
    assert_eq!(body["data"]["payment_status"], "pending");

    let events = app.drain_events().await;
    assert!(matches!(
        events.as_slice(),
        [Event::FulfillmentStatusChanged { .. }]
    ));
    if let Event::FulfillmentStatusChanged {
        old_status,
        new_status,
        ..
    } = &events[0]
    {
        assert_eq!(old_status.to_string(), "placed");
        assert_eq!(new_status.to_string(), "dispatched");
    }
}

#[tokio::test]
async fn updating_a_missing_order_is_not_found() {
    let app = TestApp::new().await;
    let admin = app.admin().await;

    let uri = format!("/api/orders/admin/{}", uuid::Uuid::new_v4());
    let response = app
        .request_as(&admin, Method::PUT, &uri, Some(json!({ "orderStatus": "preparing" })))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
