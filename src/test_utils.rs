//! Shared test utilities for `linen-shop`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating catalog, order and account fixtures with sensible defaults.

use crate::{
    core::{
        pack::{self, NewPack, PackItemInput},
        product::{self, NewProduct},
        user::{self, NewUser},
    },
    entities::{
        self, OrderStatus, UserRole,
        json::{CartItem, CartItems, Color},
    },
    errors::Result,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Password given to every account created by [`create_test_user`].
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Product input with sensible defaults.
///
/// # Defaults
/// * `category`: "Linge de lit"
/// * `status`: available
/// * no sizes, colors or measures
pub fn new_product(title: &str, price: f64, promotion: Option<f64>) -> NewProduct {
    NewProduct {
        title: title.to_string(),
        slug: None,
        description: None,
        category: "Linge de lit".to_string(),
        price,
        promotion,
        sizes: Vec::new(),
        sheet_measures: Vec::new(),
        colors: Vec::new(),
        measure_prices: Vec::new(),
        stock: None,
        status: true,
        hidden: false,
    }
}

/// A color swatch without hex code.
pub fn color(name: &str) -> Color {
    Color {
        name: name.to_string(),
        hex: None,
    }
}

/// Creates an available product in the default category.
pub async fn create_test_product(
    db: &DatabaseConnection,
    title: &str,
    price: f64,
    promotion: Option<f64>,
) -> Result<entities::product::Model> {
    product::create_product(db, new_product(title, price, promotion)).await
}

/// Pack input, available, with the given composition.
pub fn new_pack(
    title: &str,
    price: f64,
    promotion: Option<f64>,
    products: Vec<PackItemInput>,
) -> NewPack {
    NewPack {
        title: title.to_string(),
        slug: None,
        description: None,
        price,
        promotion,
        measure_prices: Vec::new(),
        availability: true,
        products,
    }
}

/// Creates an available pack holding `(product_id, quantity)` lines.
pub async fn create_test_pack(
    db: &DatabaseConnection,
    title: &str,
    price: f64,
    promotion: Option<f64>,
    items: &[(i64, i32)],
) -> Result<entities::pack::Model> {
    let items = items
        .iter()
        .map(|&(product_id, quantity)| PackItemInput {
            product_id,
            sheet_measures: Vec::new(),
            colors: Vec::new(),
            quantity: Some(quantity),
        })
        .collect();
    Ok(pack::create_pack(db, new_pack(title, price, promotion, items)).await?.pack)
}

/// A product cart line without options.
pub fn cart_line(product_id: i64, quantity: i32) -> CartItem {
    CartItem {
        product_id,
        quantity,
        is_pack: false,
        size: None,
        color: None,
        sheet_measure: None,
        pack_items: None,
    }
}

/// A pack cart line without options.
pub fn pack_line(pack_id: i64, quantity: i32) -> CartItem {
    CartItem {
        is_pack: true,
        ..cart_line(pack_id, quantity)
    }
}

/// Inserts a pending order directly, bypassing total validation.
pub async fn insert_test_order(
    db: &DatabaseConnection,
    products: Vec<CartItem>,
    total: f64,
) -> Result<entities::order::Model> {
    let now = Utc::now();
    let order = entities::order::ActiveModel {
        full_name: Set("Test Customer".to_string()),
        phone: Set("0555000000".to_string()),
        email: Set(None),
        address: Set("Test address".to_string()),
        products: Set(CartItems(products)),
        total: Set(total),
        status: Set(OrderStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(order.insert(db).await?)
}

/// Account input using [`TEST_PASSWORD`].
pub fn new_user(email: &str, role: UserRole) -> NewUser {
    NewUser {
        name: "Test User".to_string(),
        email: email.to_string(),
        password: TEST_PASSWORD.to_string(),
        password_confirmation: TEST_PASSWORD.to_string(),
        role: Some(role),
    }
}

/// Creates an account with [`TEST_PASSWORD`].
pub async fn create_test_user(
    db: &DatabaseConnection,
    email: &str,
    role: UserRole,
) -> Result<entities::user::Model> {
    user::create_user(db, new_user(email, role)).await
}
