use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A catalog entry. Sizes and toppings are stored as JSON arrays and read
/// back through [`Model::size_options`] / [`Model::topping_options`].
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub category: MenuCategory,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub base_price: Decimal,
    #[sea_orm(nullable)]
    pub image: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub sizes: Json,
    #[sea_orm(column_type = "Json")]
    pub toppings: Json,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn size_options(&self) -> Result<Vec<SizeOption>, serde_json::Error> {
        decode_options(&self.sizes)
    }

    pub fn topping_options(&self) -> Result<Vec<ToppingOption>, serde_json::Error> {
        decode_options(&self.toppings)
    }
}

fn decode_options<T: serde::de::DeserializeOwned>(value: &Json) -> Result<Vec<T>, serde_json::Error> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value.clone())
}

/// Menu sections. The set is closed; anything else is rejected at the edge.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MenuCategory {
    #[sea_orm(string_value = "pizza")]
    Pizza,
    #[sea_orm(string_value = "drinks")]
    Drinks,
    #[sea_orm(string_value = "sides")]
    Sides,
}

/// A named size with a price multiplier applied to the base price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SizeOption {
    pub name: String,
    #[serde(alias = "priceMultiplier")]
    #[schema(value_type = String, example = "1.5")]
    pub price_multiplier: Decimal,
}

/// A named add-on with a flat price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ToppingOption {
    pub name: String,
    #[schema(value_type = String, example = "5")]
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!(MenuCategory::from_str("Pizza").unwrap(), MenuCategory::Pizza);
        assert_eq!(MenuCategory::from_str("drinks").unwrap(), MenuCategory::Drinks);
        assert!(MenuCategory::from_str("desserts").is_err());
        assert_eq!(MenuCategory::Sides.to_string(), "sides");
    }

    #[test]
    fn options_decode_from_json_columns() {
        let now = Utc::now();
        let model = Model {
            id: Uuid::new_v4(),
            name: "Veggie Pizza".into(),
            category: MenuCategory::Pizza,
            base_price: dec!(20),
            image: None,
            sizes: serde_json::json!([{ "name": "Cheese Burst", "priceMultiplier": "1.5" }]),
            toppings: Json::Null,
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        let sizes = model.size_options().unwrap();
        assert_eq!(sizes[0].price_multiplier, dec!(1.5));
        assert!(model.topping_options().unwrap().is_empty());
    }
}
