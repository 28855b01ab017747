//! Order placement, reads and administrative fulfillment updates.
//!
//! Totals always come from the pricing engine; client-supplied prices are
//! never read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{ensure_admin, ensure_owner_or_admin, AuthUser},
    entities::order::{
        ActiveModel as OrderActiveModel, Model as OrderModel, OrderLineItem, OrderStatus,
        PaymentMethod, PaymentStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    repositories::OrderRepository,
    services::{
        catalog::CatalogOracle,
        order_lifecycle::{check_fulfillment_transition, FulfillmentPolicy},
        pricing::{resolve_cart, validate_envelope, CartLine},
    },
};

/// Order placement as submitted by the client. Prices are never read from here.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default, alias = "deliveryLocation")]
    pub delivery_location: Option<String>,
    /// `ONLINE` (default) or `COD`
    #[serde(default, alias = "paymentMethod")]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of `placed`, `preparing`, `dispatched`, `delivered`
    #[serde(alias = "orderStatus")]
    pub order_status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderLineItem>,
    pub delivery_location: String,
    #[schema(value_type = String, example = "80")]
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub gateway_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderModel> for OrderResponse {
    type Error = ServiceError;

    fn try_from(order: OrderModel) -> Result<Self, Self::Error> {
        let items = order.line_items()?;
        Ok(Self {
            id: order.id,
            user_id: order.user_id,
            items,
            delivery_location: order.delivery_location,
            total_amount: order.total_amount,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            order_status: order.order_status,
            gateway_order_id: order.gateway_order_id,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}

fn to_responses(orders: Vec<OrderModel>) -> Result<Vec<OrderResponse>, ServiceError> {
    orders.into_iter().map(OrderResponse::try_from).collect()
}

/// Order placement, retrieval and administrative fulfillment.
#[derive(Clone)]
pub struct OrderService {
    repo: OrderRepository,
    catalog: Arc<dyn CatalogOracle>,
    event_sender: EventSender,
    policy: FulfillmentPolicy,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        catalog: Arc<dyn CatalogOracle>,
        event_sender: EventSender,
        policy: FulfillmentPolicy,
    ) -> Self {
        Self {
            repo: OrderRepository::new(db),
            catalog,
            event_sender,
            policy,
        }
    }

    /// Prices the cart from the catalog and persists the order. Nothing is
    /// written unless every line resolves.
    #[instrument(skip(self, owner, request), fields(user_id = %owner.user_id, lines = request.items.len()))]
    pub async fn create_order(
        &self,
        owner: &AuthUser,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let envelope = validate_envelope(
            &request.items,
            request.delivery_location.as_deref(),
            request.payment_method.as_deref(),
        )?;
        let priced = resolve_cart(self.catalog.as_ref(), &request.items).await?;

        let now = Utc::now();
        let order = OrderActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(owner.user_id),
            items: Set(serde_json::to_value(&priced.items)?),
            delivery_location: Set(envelope.delivery_location),
            total_amount: Set(priced.total_amount),
            payment_method: Set(envelope.payment_method),
            payment_status: Set(PaymentStatus::Pending),
            order_status: Set(OrderStatus::Placed),
            gateway_order_id: Set(None),
            gateway_payment_id: Set(None),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let saved = self.repo.insert(order).await?;
        info!(
            order_id = %saved.id,
            total_amount = %saved.total_amount,
            payment_method = %saved.payment_method,
            "Order created"
        );

        self.event_sender.emit(Event::OrderCreated {
            order: saved.clone(),
        });
        OrderResponse::try_from(saved)
    }

    /// The caller's own orders, newest first.
    pub async fn list_mine(&self, user: &AuthUser) -> Result<Vec<OrderResponse>, ServiceError> {
        to_responses(self.repo.find_by_user(user.user_id).await?)
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<OrderResponse, ServiceError> {
        let order = self.load(id).await?;
        ensure_owner_or_admin(user, order.user_id)?;
        OrderResponse::try_from(order)
    }

    pub async fn list_all(&self, user: &AuthUser) -> Result<Vec<OrderResponse>, ServiceError> {
        ensure_admin(user)?;
        to_responses(self.repo.find_all().await?)
    }

    /// Administrative move of the fulfillment track. Payment state is untouched.
    #[instrument(skip(self, user, request), fields(order_id = %id, target = %request.order_status))]
    pub async fn update_fulfillment(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: UpdateOrderStatusRequest,
    ) -> Result<OrderResponse, ServiceError> {
        ensure_admin(user)?;
        let target = OrderStatus::parse_target(&request.order_status)?;
        let order = self.load(id).await?;
        let old_status = order.order_status;
        check_fulfillment_transition(self.policy, old_status, target)?;

        let updated = self.repo.set_order_status(order, target).await?;
        info!(%old_status, new_status = %target, "Order status updated");

        self.event_sender.emit(Event::FulfillmentStatusChanged {
            order: updated.clone(),
            old_status,
            new_status: target,
        });
        OrderResponse::try_from(updated)
    }

    pub(crate) async fn load(&self, id: Uuid) -> Result<OrderModel, ServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }
}
