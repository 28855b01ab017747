use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::menu_item::{
    self, ActiveModel as MenuItemActiveModel, Entity as MenuItemEntity, MenuCategory,
    Model as MenuItemModel, SizeOption, ToppingOption,
};
use crate::errors::ServiceError;

/// Read-only view of the authoritative catalog used while pricing carts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogOracle: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MenuItemModel>, ServiceError>;

    /// Available items, optionally restricted to one category.
    async fn find_available(
        &self,
        category: Option<MenuCategory>,
    ) -> Result<Vec<MenuItemModel>, ServiceError>;
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMenuItemRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    pub category: MenuCategory,
    #[serde(alias = "basePrice")]
    pub base_price: Decimal,
    #[validate(length(max = 2048))]
    pub image: Option<String>,
    #[serde(default)]
    pub sizes: Vec<SizeOption>,
    #[serde(default)]
    pub toppings: Vec<ToppingOption>,
    #[serde(default = "default_available", alias = "isAvailable")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuItemRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub category: Option<MenuCategory>,
    #[serde(alias = "basePrice")]
    pub base_price: Option<Decimal>,
    #[validate(length(max = 2048))]
    pub image: Option<String>,
    pub sizes: Option<Vec<SizeOption>>,
    pub toppings: Option<Vec<ToppingOption>>,
    #[serde(alias = "isAvailable")]
    pub is_available: Option<bool>,
}

/// Catalog entry as returned over the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuItemResponse {
    pub id: Uuid,
    pub name: String,
    pub category: MenuCategory,
    pub base_price: Decimal,
    pub image: Option<String>,
    pub sizes: Vec<SizeOption>,
    pub toppings: Vec<ToppingOption>,
    pub is_available: bool,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl TryFrom<MenuItemModel> for MenuItemResponse {
    type Error = ServiceError;

    fn try_from(model: MenuItemModel) -> Result<Self, Self::Error> {
        let sizes = model.size_options()?;
        let toppings = model.topping_options()?;
        Ok(Self {
            id: model.id,
            name: model.name,
            category: model.category,
            base_price: model.base_price,
            image: model.image,
            sizes,
            toppings,
            is_available: model.is_available,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

fn validate_price(field: &str, value: Decimal) -> Result<(), ServiceError> {
    if value < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be negative",
            field
        )));
    }
    Ok(())
}

/// Enforces the catalog invariants: non-negative prices and unique option names.
fn validate_options(sizes: &[SizeOption], toppings: &[ToppingOption]) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for size in sizes {
        if size.name.trim().is_empty() {
            return Err(ServiceError::ValidationError("Size name is required".into()));
        }
        if !seen.insert(size.name.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "Duplicate size name: {}",
                size.name
            )));
        }
        validate_price("priceMultiplier", size.price_multiplier)?;
    }

    let mut seen = HashSet::new();
    for topping in toppings {
        if topping.name.trim().is_empty() {
            return Err(ServiceError::ValidationError("Topping name is required".into()));
        }
        if !seen.insert(topping.name.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "Duplicate topping name: {}",
                topping.name
            )));
        }
        validate_price("topping price", topping.price)?;
    }
    Ok(())
}

/// Catalog persistence on top of sea-orm.
#[derive(Clone)]
pub struct MenuService {
    db: Arc<DatabaseConnection>,
}

impl MenuService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<MenuItemModel, ServiceError> {
        MenuItemEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, menu_item_id = %id, "Failed to fetch menu item");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Menu item not found: {}", id)))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<MenuItemModel>, ServiceError> {
        MenuItemEntity::find()
            .filter(menu_item::Column::Name.eq(name))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        request: CreateMenuItemRequest,
    ) -> Result<MenuItemModel, ServiceError> {
        request.validate()?;
        validate_price("basePrice", request.base_price)?;
        validate_options(&request.sizes, &request.toppings)?;

        let now = Utc::now();
        let item = MenuItemActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            category: Set(request.category),
            base_price: Set(request.base_price),
            image: Set(request.image),
            sizes: Set(serde_json::to_value(&request.sizes)?),
            toppings: Set(serde_json::to_value(&request.toppings)?),
            is_available: Set(request.is_available),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = item.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, "Failed to insert menu item");
            ServiceError::DatabaseError(e)
        })?;

        info!(menu_item_id = %created.id, category = %created.category, "Menu item created");
        Ok(created)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateMenuItemRequest,
    ) -> Result<MenuItemModel, ServiceError> {
        request.validate()?;
        let existing = self.get(id).await?;

        let sizes = match request.sizes {
            Some(sizes) => sizes,
            None => existing.size_options()?,
        };
        let toppings = match request.toppings {
            Some(toppings) => toppings,
            None => existing.topping_options()?,
        };
        validate_options(&sizes, &toppings)?;

        let mut active: MenuItemActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(category) = request.category {
            active.category = Set(category);
        }
        if let Some(base_price) = request.base_price {
            validate_price("basePrice", base_price)?;
            active.base_price = Set(base_price);
        }
        if let Some(image) = request.image {
            active.image = Set(Some(image));
        }
        if let Some(is_available) = request.is_available {
            active.is_available = Set(is_available);
        }
        active.sizes = Set(serde_json::to_value(&sizes)?);
        active.toppings = Set(serde_json::to_value(&toppings)?);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await.map_err(|e| {
            error!(error = %e, menu_item_id = %id, "Failed to update menu item");
            ServiceError::DatabaseError(e)
        })?;

        info!(menu_item_id = %id, "Menu item updated");
        Ok(updated)
    }

    /// Flips `is_available`.
    #[instrument(skip(self))]
    pub async fn toggle_availability(&self, id: Uuid) -> Result<MenuItemModel, ServiceError> {
        let existing = self.get(id).await?;
        let next = !existing.is_available;

        let mut active: MenuItemActiveModel = existing.into();
        active.is_available = Set(next);
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(menu_item_id = %id, is_available = next, "Menu item availability toggled");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = MenuItemEntity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Menu item not found: {}", id)));
        }

        info!(menu_item_id = %id, "Menu item deleted");
        Ok(())
    }
}

#[async_trait]
impl CatalogOracle for MenuService {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MenuItemModel>, ServiceError> {
        MenuItemEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn find_available(
        &self,
        category: Option<MenuCategory>,
    ) -> Result<Vec<MenuItemModel>, ServiceError> {
        let mut query =
            MenuItemEntity::find().filter(menu_item::Column::IsAvailable.eq(true));
        if let Some(category) = category {
            query = query.filter(menu_item::Column::Category.eq(category));
        }

        query
            .order_by_asc(menu_item::Column::Category)
            .order_by_asc(menu_item::Column::Name)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list available menu items");
                ServiceError::DatabaseError(e)
            })
    }
}
