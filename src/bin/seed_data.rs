//! Seed data script - populates the database with the storefront menu
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - 4 pizzas with Pan / Cheese Burst sizes and flat-priced toppings
//! - 2 drinks and 3 sides
//! - optionally, an administrator account
//!
//! Items are matched by name, so running it twice inserts nothing new.

use std::sync::Arc;

use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use pizzeria_api::{
    auth::{user::UserRole, AuthConfig, AuthService},
    entities::menu_item::{MenuCategory, SizeOption, ToppingOption},
    errors::ServiceError,
    services::catalog::{CreateMenuItemRequest, MenuService, UpdateMenuItemRequest},
};

#[derive(Debug, Parser)]
#[command(name = "seed-data", about = "Seed the pizzeria menu and an optional admin account")]
struct Args {
    /// Database URL; defaults to the configured `database_url`
    #[arg(long)]
    database_url: Option<String>,

    /// Skip running pending migrations before seeding
    #[arg(long)]
    skip_migrations: bool,

    /// Create an administrator with this email (requires --admin-password)
    #[arg(long, requires = "admin_password")]
    admin_email: Option<String>,

    #[arg(long)]
    admin_password: Option<String>,

    #[arg(long, default_value = "Administrator")]
    admin_name: String,

    /// Mark the named item available again (repeatable)
    #[arg(long = "enable", value_name = "NAME")]
    enable: Vec<String>,

    /// Rename an item, given as `OLD=NEW`
    #[arg(long = "rename", value_name = "OLD=NEW")]
    rename: Vec<String>,
}

fn pizza_sizes() -> Vec<SizeOption> {
    vec![
        SizeOption {
            name: "Pan".into(),
            price_multiplier: dec!(1),
        },
        SizeOption {
            name: "Cheese Burst".into(),
            price_multiplier: dec!(1.5),
        },
    ]
}

fn toppings(names: &[&str]) -> Vec<ToppingOption> {
    names
        .iter()
        .map(|name| ToppingOption {
            name: (*name).to_string(),
            price: dec!(5),
        })
        .collect()
}

fn item(
    name: &str,
    category: MenuCategory,
    base_price: Decimal,
    image: &str,
    sizes: Vec<SizeOption>,
    toppings: Vec<ToppingOption>,
) -> CreateMenuItemRequest {
    CreateMenuItemRequest {
        name: name.to_string(),
        category,
        base_price,
        image: Some(image.to_string()),
        sizes,
        toppings,
        is_available: true,
    }
}

fn storefront_menu() -> Vec<CreateMenuItemRequest> {
    vec![
        item(
            "Margritta",
            MenuCategory::Pizza,
            dec!(20),
            "https://images.unsplash.com/photo-1574071318508-1cdbab80d002?w=400",
            pizza_sizes(),
            Vec::new(),
        ),
        item(
            "Fancy Pizza",
            MenuCategory::Pizza,
            dec!(20),
            "https://images.unsplash.com/photo-1513104890138-7c749659a591?w=400",
            pizza_sizes(),
            toppings(&["Corn", "Paneer", "Mushroom"]),
        ),
        item(
            "Veggie Pizza",
            MenuCategory::Pizza,
            dec!(20),
            "https://images.unsplash.com/photo-1511689660979-10d2b1aada49?w=400",
            pizza_sizes(),
            toppings(&["Capsicum", "Onion", "Corn", "Tomato"]),
        ),
        item(
            "All Toppings Pizza",
            MenuCategory::Pizza,
            dec!(20),
            "https://images.unsplash.com/photo-1565299624946-b28f40a0ae38?w=400",
            pizza_sizes(),
            toppings(&["Paneer", "Mushroom", "Corn", "Capsicum", "Onion", "Tomato"]),
        ),
        item(
            "Cold Coffee",
            MenuCategory::Drinks,
            dec!(20),
            "https://images.unsplash.com/photo-1517487881594-2787fef5ebf7?w=400",
            Vec::new(),
            Vec::new(),
        ),
        item(
            "Hot Chocolate",
            MenuCategory::Drinks,
            dec!(20),
            "https://images.unsplash.com/photo-1517578239113-b03992dcdd25?w=400",
            Vec::new(),
            Vec::new(),
        ),
        item(
            "Pizza Pockets",
            MenuCategory::Sides,
            dec!(5),
            "https://images.unsplash.com/photo-1601050690597-df0568f70950?w=400",
            Vec::new(),
            Vec::new(),
        ),
        item(
            "Calzone",
            MenuCategory::Sides,
            dec!(20),
            "https://images.unsplash.com/photo-1555939594-58d7cb561ad1?w=400",
            Vec::new(),
            Vec::new(),
        ),
        item(
            "Burger",
            MenuCategory::Sides,
            dec!(20),
            "https://images.unsplash.com/photo-1568901346375-23c9450c58cd?w=400",
            Vec::new(),
            Vec::new(),
        ),
    ]
}

async fn seed_menu(menu: &MenuService) -> Result<(usize, usize), ServiceError> {
    let mut inserted = 0;
    let mut skipped = 0;

    for request in storefront_menu() {
        if menu.find_by_name(&request.name).await?.is_some() {
            info!("  Skipped: {} (already exists)", request.name);
            skipped += 1;
            continue;
        }
        let category = request.category;
        let created = menu.create(request).await?;
        info!("  Inserted: {} ({})", created.name, category);
        inserted += 1;
    }

    Ok((inserted, skipped))
}

async fn rename_item(menu: &MenuService, spec: &str) -> anyhow::Result<()> {
    let Some((old, new)) = spec.split_once('=') else {
        anyhow::bail!("--rename expects OLD=NEW, got '{}'", spec);
    };
    let (old, new) = (old.trim(), new.trim());

    match menu.find_by_name(old).await? {
        Some(existing) => {
            let update = UpdateMenuItemRequest {
                name: Some(new.to_string()),
                ..Default::default()
            };
            menu.update(existing.id, update).await?;
            info!("  Renamed: {} -> {}", old, new);
        }
        None => warn!("  Not renamed: no item named '{}'", old),
    }
    Ok(())
}

async fn enable_item(menu: &MenuService, name: &str) -> Result<(), ServiceError> {
    match menu.find_by_name(name).await? {
        Some(existing) if existing.is_available => info!("  Already available: {}", name),
        Some(existing) => {
            let update = UpdateMenuItemRequest {
                is_available: Some(true),
                ..Default::default()
            };
            menu.update(existing.id, update).await?;
            info!("  Enabled: {}", name);
        }
        None => warn!("  Not enabled: no item named '{}'", name),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    info!("=== Pizzeria API Seed Data ===");

    let config = pizzeria_api::config::load_config()?;
    let database_url = args
        .database_url
        .clone()
        .unwrap_or_else(|| config.database_url.clone());

    info!("Connecting to database: {}", database_url);
    let db = pizzeria_api::db::establish_connection(&database_url).await?;
    if !args.skip_migrations {
        pizzeria_api::db::run_migrations(&db).await?;
    }
    let db = Arc::new(db);
    info!("Connected!");

    let menu = MenuService::new(db.clone());

    info!("Seeding menu...");
    let (inserted, skipped) = seed_menu(&menu).await?;
    info!("  {} inserted, {} skipped", inserted, skipped);

    for spec in &args.rename {
        rename_item(&menu, spec).await?;
    }
    for name in &args.enable {
        enable_item(&menu, name).await?;
    }

    if let (Some(email), Some(password)) = (&args.admin_email, &args.admin_password) {
        let auth = AuthService::new(AuthConfig::from_app_config(&config), db.clone());
        match auth
            .create_user(&args.admin_name, email, password, UserRole::Admin)
            .await
        {
            Ok(user) => info!("Created admin account {} ({})", user.email, user.id),
            Err(ServiceError::Conflict(_)) => info!("Admin account {} already exists", email),
            Err(e) => return Err(e.into()),
        }
    }

    let mut counts = Vec::new();
    for category in [MenuCategory::Pizza, MenuCategory::Drinks, MenuCategory::Sides] {
        let items = pizzeria_api::services::catalog::CatalogOracle::find_available(
            &menu,
            Some(category),
        )
        .await?;
        counts.push(format!("{}: {}", category, items.len()));
    }
    info!("Available menu: {}", counts.join(", "));

    info!("=== Seed Data Complete ===");
    info!("Try: curl http://localhost:{}/api/menu", config.port);

    Ok(())
}
