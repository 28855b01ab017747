use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::order::{
    ActiveModel as OrderActiveModel, Column, Entity as Order, Model as OrderModel, OrderStatus,
    PaymentStatus,
};
use crate::errors::ServiceError;
use crate::repositories::Repository;

use super::BaseRepository;

/// Persistence for orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn insert(&self, order: OrderActiveModel) -> Result<OrderModel, ServiceError> {
        Ok(order.insert(self.base.get_db()).await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderModel>, ServiceError> {
        Ok(Order::find_by_id(id).one(self.base.get_db()).await?)
    }

    /// Orders placed by `user_id`, newest first.
    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<OrderModel>, ServiceError> {
        Ok(Order::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::CreatedAt)
            .all(self.base.get_db())
            .await?)
    }

    /// Every order, newest first.
    pub async fn find_all(&self) -> Result<Vec<OrderModel>, ServiceError> {
        Ok(Order::find()
            .order_by_desc(Column::CreatedAt)
            .all(self.base.get_db())
            .await?)
    }

    async fn reload(&self, id: Uuid) -> Result<OrderModel, ServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))
    }

    /// Moves `payment_status` from `expected` to `new` in a single conditional
    /// update and bumps `version`. Zero affected rows means another writer got
    /// there first.
    pub async fn compare_and_set_payment_status(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        new: PaymentStatus,
        gateway_payment_id: Option<&str>,
    ) -> Result<OrderModel, ServiceError> {
        let mut update = Order::update_many()
            .col_expr(Column::PaymentStatus, Expr::value(new))
            .col_expr(Column::Version, Expr::col(Column::Version).add(1))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()));

        if let Some(payment_id) = gateway_payment_id {
            update = update.col_expr(
                Column::GatewayPaymentId,
                Expr::value(payment_id.to_string()),
            );
        }

        let result = update
            .filter(Column::Id.eq(id))
            .filter(Column::PaymentStatus.eq(expected))
            .exec(self.base.get_db())
            .await?;

        if result.rows_affected == 0 {
            warn!(order_id = %id, %expected, %new, "Payment status changed concurrently");
            return Err(ServiceError::ConcurrentModification(id));
        }

        debug!(order_id = %id, from = %expected, to = %new, "Payment status updated");
        self.reload(id).await
    }

    /// Records the latest gateway intent id. Payment and fulfillment state are untouched.
    pub async fn set_gateway_order_id(
        &self,
        order: OrderModel,
        gateway_order_id: &str,
    ) -> Result<OrderModel, ServiceError> {
        let mut active: OrderActiveModel = order.into();
        active.gateway_order_id = Set(Some(gateway_order_id.to_string()));
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.base.get_db()).await?)
    }

    pub async fn set_order_status(
        &self,
        order: OrderModel,
        status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let mut active: OrderActiveModel = order.into();
        active.order_status = Set(status);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.base.get_db()).await?)
    }
}
