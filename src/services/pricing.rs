//! Server-side cart pricing.
//!
//! Client carts are untrusted: every line is re-resolved against the catalog
//! and priced from catalog data only. Prices submitted by the client are
//! never read. The first invalid line aborts the whole cart.
//!
//! ```text
//! unit_price  = base_price × size_multiplier + Σ topping prices
//! total_price = unit_price × quantity
//! total       = Σ total_price
//! ```

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::menu_item::{Model as MenuItemModel, SizeOption, ToppingOption};
use crate::entities::order::{OrderLineItem, PaymentMethod};
use crate::errors::ServiceError;
use crate::services::catalog::CatalogOracle;

/// Reference to a size or topping by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct SelectedOption {
    pub name: String,
}

/// One untrusted cart line as submitted by the client.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CartLine {
    #[serde(alias = "menuItemId")]
    pub menu_item_id: String,
    #[serde(default, alias = "selectedSize")]
    pub selected_size: Option<SelectedOption>,
    #[serde(default, alias = "selectedToppings")]
    pub selected_toppings: Option<Vec<SelectedOption>>,
    /// Integer ≥ 1, or a string holding one
    #[serde(default)]
    #[schema(value_type = Object, example = 2)]
    pub quantity: Value,
}

/// Result of pricing a whole cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub items: Vec<OrderLineItem>,
    pub total_amount: Decimal,
}

/// Order fields validated before any line is priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEnvelope {
    pub delivery_location: String,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("No order items provided")]
    EmptyCart,

    #[error("Delivery location is required")]
    MissingDeliveryLocation,

    #[error("Invalid payment method")]
    InvalidPaymentMethod,

    #[error("Menu item not found: {0}")]
    ItemNotFound(String),

    #[error("Menu item is not available: {0}")]
    ItemUnavailable(String),

    #[error("Invalid size: {size} for {item}")]
    InvalidSize { size: String, item: String },

    #[error("Invalid topping: {topping} for {item}")]
    InvalidTopping { topping: String, item: String },

    #[error("Invalid quantity for {item}")]
    InvalidQuantity { item: String },

    #[error(transparent)]
    Catalog(#[from] ServiceError),
}

impl From<PricingError> for ServiceError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::ItemNotFound(_) => ServiceError::NotFound(err.to_string()),
            PricingError::Catalog(inner) => inner,
            other => ServiceError::ValidationError(other.to_string()),
        }
    }
}

/// Checks the order-level fields: non-empty cart, non-blank location, known
/// payment method (absent means `ONLINE`).
pub fn validate_envelope(
    lines: &[CartLine],
    delivery_location: Option<&str>,
    payment_method: Option<&str>,
) -> Result<OrderEnvelope, PricingError> {
    if lines.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    let delivery_location = delivery_location
        .map(str::trim)
        .filter(|loc| !loc.is_empty())
        .ok_or(PricingError::MissingDeliveryLocation)?
        .to_string();

    let payment_method = match payment_method {
        None => PaymentMethod::default(),
        Some(raw) => PaymentMethod::from_str(raw).map_err(|_| PricingError::InvalidPaymentMethod)?,
    };

    Ok(OrderEnvelope {
        delivery_location,
        payment_method,
    })
}

/// Resolves every line against `catalog` and prices it. Fail-fast: the first
/// invalid line aborts and later lines are not looked up.
#[instrument(skip(catalog, lines), fields(lines = lines.len()))]
pub async fn resolve_cart<C>(catalog: &C, lines: &[CartLine]) -> Result<PricedCart, PricingError>
where
    C: CatalogOracle + ?Sized,
{
    if lines.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    let mut items = Vec::with_capacity(lines.len());
    let mut total_amount = Decimal::ZERO;

    for line in lines {
        let item = lookup(catalog, &line.menu_item_id).await?;
        let priced = price_line(&item, line)?;
        total_amount += priced.total_price;
        items.push(priced);
    }

    Ok(PricedCart {
        items,
        total_amount,
    })
}

async fn lookup<C>(catalog: &C, reference: &str) -> Result<MenuItemModel, PricingError>
where
    C: CatalogOracle + ?Sized,
{
    // An id that does not parse cannot name a catalog entry.
    let id = Uuid::parse_str(reference.trim())
        .map_err(|_| PricingError::ItemNotFound(reference.to_string()))?;

    catalog
        .find_by_id(id)
        .await?
        .ok_or_else(|| PricingError::ItemNotFound(reference.to_string()))
}

/// Prices one line against an already-resolved catalog entry.
pub fn price_line(item: &MenuItemModel, line: &CartLine) -> Result<OrderLineItem, PricingError> {
    if !item.is_available {
        return Err(PricingError::ItemUnavailable(item.name.clone()));
    }

    let base_price = clamp_non_negative(item.base_price, "base_price", &item.name);

    let (selected_size, multiplier) = match &line.selected_size {
        None => (None, Decimal::ONE),
        Some(requested) => {
            let size = item
                .size_options()
                .map_err(|e| PricingError::Catalog(e.into()))?
                .into_iter()
                .find(|s| s.name == requested.name)
                .ok_or_else(|| PricingError::InvalidSize {
                    size: requested.name.clone(),
                    item: item.name.clone(),
                })?;
            let multiplier = clamp_non_negative(size.price_multiplier, "price_multiplier", &item.name);
            (
                Some(SizeOption {
                    name: size.name,
                    price_multiplier: multiplier,
                }),
                multiplier,
            )
        }
    };

    let requested_toppings = line.selected_toppings.as_deref().unwrap_or_default();
    let mut selected_toppings = Vec::with_capacity(requested_toppings.len());
    let mut toppings_total = Decimal::ZERO;
    if !requested_toppings.is_empty() {
        let available = item
            .topping_options()
            .map_err(|e| PricingError::Catalog(e.into()))?;
        for requested in requested_toppings {
            let topping = available
                .iter()
                .find(|t| t.name == requested.name)
                .ok_or_else(|| PricingError::InvalidTopping {
                    topping: requested.name.clone(),
                    item: item.name.clone(),
                })?;
            let price = clamp_non_negative(topping.price, "topping price", &item.name);
            toppings_total += price;
            selected_toppings.push(ToppingOption {
                name: topping.name.clone(),
                price,
            });
        }
    }

    let unit_price = base_price * multiplier + toppings_total;

    let quantity = parse_quantity(&line.quantity).ok_or_else(|| PricingError::InvalidQuantity {
        item: item.name.clone(),
    })?;

    Ok(OrderLineItem {
        menu_item_id: item.id,
        name: item.name.clone(),
        selected_size,
        selected_toppings,
        quantity,
        unit_price,
        total_price: unit_price * Decimal::from(quantity),
    })
}

/// Accepts JSON integers ≥ 1 and strings holding one. Floats, booleans,
/// zero, negatives and non-numeric strings are rejected.
pub fn parse_quantity(raw: &Value) -> Option<u32> {
    let parsed = match raw {
        Value::Number(n) => n.as_u64().and_then(|q| u32::try_from(q).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.filter(|q| *q >= 1)
}

// Catalog writes reject negatives, so a negative value here means the row was
// written around the service. It is priced as zero.
fn clamp_non_negative(value: Decimal, field: &'static str, item: &str) -> Decimal {
    if value < Decimal::ZERO {
        warn!(field, item, %value, "Negative catalog price coerced to zero");
        Decimal::ZERO
    } else {
        value
    }
}
