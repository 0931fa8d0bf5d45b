//! Order business logic - placing storefront orders and managing them in the
//! back office.
//!
//! Placing an order never trusts the client's total: every cart line is
//! re-priced from the catalog inside a transaction, and the order is only
//! written when the submitted total agrees with the recomputed one within
//! [`TOTAL_TOLERANCE`](crate::core::pricing::TOTAL_TOLERANCE).

use crate::{
    core::{
        pagination::{Page, PageRequest, fetch_page},
        pricing::{Priced, round_currency, totals_match},
        validation,
    },
    entities::{
        Order, OrderStatus, Pack, Product,
        json::{CartItem, CartItems},
        order,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;

/// Default page size for order listings.
pub const DEFAULT_PER_PAGE: u64 = 20;
/// Largest accepted page size for order listings.
pub const MAX_PER_PAGE: u64 = 100;

/// A storefront order as submitted by the customer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    /// Customer full name
    pub full_name: String,
    /// Customer phone
    pub phone: String,
    /// Customer email
    #[serde(default)]
    pub email: Option<String>,
    /// Delivery address
    pub address: String,
    /// Cart lines
    pub products: Vec<CartItem>,
    /// Total the client computed
    pub total: f64,
}

/// Back-office edits of an order; absent fields are left as they are.
///
/// The cart and total are never edited.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderChanges {
    /// Customer full name
    pub full_name: Option<String>,
    /// Customer phone
    pub phone: Option<String>,
    /// Customer email
    pub email: Option<String>,
    /// Delivery address
    pub address: Option<String>,
    /// New status
    pub status: Option<OrderStatus>,
}

/// Customer fields after validation.
struct Customer {
    full_name: String,
    phone: String,
    email: Option<String>,
    address: String,
}

fn validate_customer(input: &NewOrder) -> Result<Customer> {
    let email = match input.email.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(email) => Some(validation::email("email", email)?),
    };
    Ok(Customer {
        full_name: validation::required_text("full_name", &input.full_name, 255)?,
        phone: validation::required_text("phone", &input.phone, 50)?,
        email,
        address: validation::required_text("address", &input.address, 500)?,
    })
}

fn validate_cart(items: &[CartItem]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::validation("products", "must contain at least one item"));
    }
    for (i, item) in items.iter().enumerate() {
        validation::at_least(&format!("products.{i}.quantity"), item.quantity, 1)?;
        for (name, value) in [
            ("size", &item.size),
            ("color", &item.color),
            ("sheet_measure", &item.sheet_measure),
        ] {
            if let Some(value) = value {
                validation::max_length(&format!("products.{i}.{name}"), value, 100)?;
            }
        }
        for (j, selection) in item.pack_items.iter().flatten().enumerate() {
            if let Some(quantity) = selection.quantity {
                validation::at_least(&format!("products.{i}.pack_items.{j}.quantity"), quantity, 1)?;
            }
        }
    }
    Ok(())
}

/// Sums `unit_price * quantity` over priced lines and rounds to cents.
#[must_use]
pub fn cart_total(lines: &[(f64, i32)]) -> f64 {
    round_currency(
        lines
            .iter()
            .map(|(unit_price, quantity)| unit_price * f64::from(*quantity))
            .sum(),
    )
}

/// Looks up the current unit price of one cart line.
async fn unit_price<C>(db: &C, item: &CartItem) -> Result<f64>
where
    C: ConnectionTrait,
{
    if item.is_pack {
        Pack::find_by_id(item.product_id)
            .one(db)
            .await?
            .map(|pack| pack.final_price())
            .ok_or(Error::PackNotFound { id: item.product_id })
    } else {
        Product::find_by_id(item.product_id)
            .one(db)
            .await?
            .map(|product| product.final_price())
            .ok_or(Error::ProductNotFound { id: item.product_id })
    }
}

/// Places a storefront order.
///
/// Runs in one transaction: each line is priced from the catalog, the sum is
/// compared to `input.total`, and the order is stored with the recomputed
/// total and status [`OrderStatus::Pending`]. Any failure leaves no row.
///
/// # Errors
/// Returns [`Error::Validation`] for malformed input, and
/// [`Error::OrderRejected`] when a line references an unknown product or pack
/// or when the totals disagree.
pub async fn place_order(db: &DatabaseConnection, input: NewOrder) -> Result<order::Model> {
    let customer = validate_customer(&input)?;
    validate_cart(&input.products)?;
    validation::amount("total", input.total)?;

    let txn = db.begin().await?;

    match price_and_insert(&txn, customer, input).await {
        Ok(order) => {
            txn.commit().await?;
            tracing::info!(order_id = order.id, total = order.total, "Order placed");
            Ok(order)
        }
        Err(e) => {
            txn.rollback().await?;
            tracing::warn!("Order rejected: {e}");
            Err(Error::OrderRejected {
                reason: e.to_string(),
            })
        }
    }
}

async fn price_and_insert<C>(db: &C, customer: Customer, input: NewOrder) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let mut lines = Vec::with_capacity(input.products.len());
    for item in &input.products {
        lines.push((unit_price(db, item).await?, item.quantity));
    }

    let expected = cart_total(&lines);
    if !totals_match(input.total, expected) {
        return Err(Error::TotalsMismatch {
            submitted: input.total,
            expected,
        });
    }

    let now = Utc::now();
    let order = order::ActiveModel {
        full_name: Set(customer.full_name),
        phone: Set(customer.phone),
        email: Set(customer.email),
        address: Set(customer.address),
        products: Set(CartItems(input.products)),
        total: Set(expected),
        status: Set(OrderStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    order.insert(db).await.map_err(Into::into)
}

/// Retrieves an order by id or fails with [`Error::OrderNotFound`].
pub async fn get_order(db: &DatabaseConnection, order_id: i64) -> Result<order::Model> {
    Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })
}

/// Lists orders newest first.
pub async fn list_orders(db: &DatabaseConnection, request: PageRequest) -> Result<Page<order::Model>> {
    let select = Order::find()
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id);
    fetch_page(db, select, request).await
}

/// Edits customer fields or the status of an order.
pub async fn update_order(
    db: &DatabaseConnection,
    order_id: i64,
    changes: OrderChanges,
) -> Result<order::Model> {
    let mut order: order::ActiveModel = get_order(db, order_id).await?.into();

    if let Some(full_name) = &changes.full_name {
        order.full_name = Set(validation::required_text("full_name", full_name, 255)?);
    }
    if let Some(phone) = &changes.phone {
        order.phone = Set(validation::required_text("phone", phone, 50)?);
    }
    if let Some(email) = changes.email.as_deref().map(str::trim) {
        order.email = Set(if email.is_empty() {
            None
        } else {
            Some(validation::email("email", email)?)
        });
    }
    if let Some(address) = &changes.address {
        order.address = Set(validation::required_text("address", address, 500)?);
    }
    if let Some(status) = changes.status {
        order.status = Set(status);
    }
    order.updated_at = Set(Utc::now());

    order.update(db).await.map_err(Into::into)
}

/// Moves an order to `status`. Any transition is allowed.
pub async fn update_status(
    db: &DatabaseConnection,
    order_id: i64,
    status: OrderStatus,
) -> Result<order::Model> {
    let order = update_order(
        db,
        order_id,
        OrderChanges {
            status: Some(status),
            ..Default::default()
        },
    )
    .await?;
    tracing::info!(order_id, status = status.as_str(), "Order status updated");
    Ok(order)
}

/// Deletes an order.
pub async fn delete_order(db: &DatabaseConnection, order_id: i64) -> Result<()> {
    let order = get_order(db, order_id).await?;
    order.delete(db).await?;
    tracing::info!(order_id, "Order deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn new_order(products: Vec<CartItem>, total: f64) -> NewOrder {
        NewOrder {
            full_name: "Amina Benali".to_string(),
            phone: "0555123456".to_string(),
            email: None,
            address: "12 rue des Oliviers, Alger".to_string(),
            products,
            total,
        }
    }

    #[test]
    fn test_cart_total() {
        assert_eq!(cart_total(&[]), 0.0);
        assert_eq!(cart_total(&[(80.0, 2)]), 160.0);
        assert_eq!(cart_total(&[(76.49, 1), (34.99, 3)]), 181.46);
        assert_eq!(cart_total(&[(0.1, 3)]), 0.3);
    }

    #[tokio::test]
    async fn test_place_order_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = place_order(&db, new_order(vec![], 0.0)).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "products"));

        let result = place_order(&db, new_order(vec![cart_line(1, 0)], 0.0)).await;
        assert!(
            matches!(result, Err(Error::Validation { field, .. }) if field == "products.0.quantity")
        );

        let mut input = new_order(vec![cart_line(1, 1)], 10.0);
        input.phone = " ".to_string();
        let result = place_order(&db, input).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "phone"));

        let mut input = new_order(vec![cart_line(1, 1)], 10.0);
        input.email = Some("not-an-email".to_string());
        let result = place_order(&db, input).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "email"));

        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_with_matching_total() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Drap", 100.0, Some(20.0)).await?;

        let order = place_order(&db, new_order(vec![cart_line(product.id, 2)], 160.0)).await?;

        assert_eq!(order.total, 160.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.products.0.len(), 1);
        assert_eq!(get_order(&db, order.id).await?.total, 160.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_stores_recomputed_total() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Drap", 100.0, Some(20.0)).await?;

        // Within tolerance: the catalog total wins
        let order = place_order(&db, new_order(vec![cart_line(product.id, 2)], 160.01)).await?;
        assert_eq!(order.total, 160.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_total_mismatch_creates_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Drap", 100.0, Some(20.0)).await?;

        let result = place_order(&db, new_order(vec![cart_line(product.id, 2)], 150.0)).await;

        match result {
            Err(Error::OrderRejected { reason }) => assert!(reason.contains("Totals mismatch")),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(Order::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_unknown_item_creates_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Drap", 10.0, None).await?;

        let result = place_order(
            &db,
            new_order(vec![cart_line(product.id, 1), cart_line(999, 1)], 20.0),
        )
        .await;
        assert!(matches!(result, Err(Error::OrderRejected { .. })));

        let result = place_order(&db, new_order(vec![pack_line(999, 1)], 20.0)).await;
        assert!(matches!(result, Err(Error::OrderRejected { .. })));

        assert_eq!(Order::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_mixed_products_and_packs() -> Result<()> {
        let db = setup_test_db().await?;
        let drap = create_test_product(&db, "Drap", 89.99, Some(15.0)).await?;
        let serviette = create_test_product(&db, "Serviette", 34.99, None).await?;
        let pack = create_test_pack(&db, "Pack bain", 120.0, Some(25.0), &[(serviette.id, 2)])
            .await?;

        // 76.49 + 3 * 34.99 + 2 * 90.00
        let order = place_order(
            &db,
            new_order(
                vec![
                    cart_line(drap.id, 1),
                    cart_line(serviette.id, 3),
                    pack_line(pack.id, 2),
                ],
                361.46,
            ),
        )
        .await?;
        assert_eq!(order.total, 361.46);
        Ok(())
    }

    #[tokio::test]
    async fn test_order_ignores_later_price_changes() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Drap", 50.0, None).await?;
        let order = place_order(&db, new_order(vec![cart_line(product.id, 1)], 50.0)).await?;

        crate::core::product::update_product(
            &db,
            product.id,
            crate::core::product::ProductChanges {
                price: Some(70.0),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(get_order(&db, order.id).await?.total, 50.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_status_and_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Drap", 50.0, None).await?;
        let order = place_order(&db, new_order(vec![cart_line(product.id, 1)], 50.0)).await?;

        let updated = update_status(&db, order.id, OrderStatus::Delivered).await?;
        assert_eq!(updated.status, OrderStatus::Delivered);

        // Any transition is allowed, including back to pending
        let updated = update_status(&db, order.id, OrderStatus::Pending).await?;
        assert_eq!(updated.status, OrderStatus::Pending);

        let updated = update_order(
            &db,
            order.id,
            OrderChanges {
                address: Some("3 place des Martyrs".to_string()),
                email: Some(String::new()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.address, "3 place des Martyrs");
        assert_eq!(updated.email, None);
        assert_eq!(updated.total, 50.0);

        delete_order(&db, order.id).await?;
        assert!(matches!(
            get_order(&db, order.id).await,
            Err(Error::OrderNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_orders_paginates_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Drap", 10.0, None).await?;
        for quantity in 1..=3 {
            place_order(
                &db,
                new_order(vec![cart_line(product.id, quantity)], f64::from(quantity) * 10.0),
            )
            .await?;
        }

        let page = list_orders(&db, PageRequest::new(None, Some(2), DEFAULT_PER_PAGE, MAX_PER_PAGE))
            .await?;
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].total, 30.0);
        Ok(())
    }
}
