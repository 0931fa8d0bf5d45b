//! Pack business logic - bundles of products sold at one price.
//!
//! A pack owns its composition rows (`pack_product`), each carrying the
//! quantity and the colors / sheet measures selected for that product inside
//! the pack. Composition changes always run in a database transaction.

use crate::{
    core::{
        pagination::{Page, PageRequest, fetch_page},
        pricing::Priced,
        product::{PivotView, require_product},
        slug::resolve_slug,
        validation,
    },
    entities::{
        Pack, PackProduct, Product,
        json::{MeasurePrice, MeasurePriceList, StringList},
        pack, pack_product, product,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default page size for pack listings.
pub const DEFAULT_PER_PAGE: u64 = 15;
/// Largest accepted page size for pack listings.
pub const MAX_PER_PAGE: u64 = 50;

/// One product line of a pack composition, as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct PackItemInput {
    /// Product to include
    pub product_id: i64,
    /// Sheet measures selected for the pack
    #[serde(default)]
    pub sheet_measures: Vec<String>,
    /// Colors selected for the pack
    #[serde(default)]
    pub colors: Vec<String>,
    /// Units of the product, 1 when absent
    #[serde(default)]
    pub quantity: Option<i32>,
}

/// Fields accepted when creating a pack.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPack {
    /// Display title
    pub title: String,
    /// URL slug; derived from the title when absent
    #[serde(default)]
    pub slug: Option<String>,
    /// Long description
    #[serde(default)]
    pub description: Option<String>,
    /// Bundle price
    pub price: f64,
    /// Percentage discount in [0, 100]
    #[serde(default)]
    pub promotion: Option<f64>,
    /// Per-measure prices
    #[serde(default)]
    pub measure_prices: Vec<MeasurePrice>,
    /// Whether the pack can be ordered
    pub availability: bool,
    /// Initial composition
    #[serde(default)]
    pub products: Vec<PackItemInput>,
}

/// Fields accepted when updating a pack; absent fields are left as they are.
///
/// When `products` is present the whole composition is replaced.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackChanges {
    /// Display title
    pub title: Option<String>,
    /// URL slug
    pub slug: Option<String>,
    /// Long description
    pub description: Option<String>,
    /// Bundle price
    pub price: Option<f64>,
    /// Percentage discount in [0, 100]; `null` removes it
    #[serde(default, with = "serde_with::rust::double_option")]
    pub promotion: Option<Option<f64>>,
    /// Per-measure prices
    pub measure_prices: Option<Vec<MeasurePrice>>,
    /// Whether the pack can be ordered
    pub availability: Option<bool>,
    /// Replacement composition
    pub products: Option<Vec<PackItemInput>>,
}

/// A product inside a pack, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackItemView {
    /// Product id
    pub id: i64,
    /// Product title
    pub title: String,
    /// Product slug
    pub slug: String,
    /// Product base price
    pub price: f64,
    /// Product price after its own promotion
    pub final_price: f64,
    /// Product images
    pub images: StringList,
    /// Sizes the product is offered in
    pub sizes: StringList,
    /// Sheet measures the product is offered in
    pub sheet_measures: StringList,
    /// Composition data
    pub pivot: PivotView,
}

/// A pack as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackView {
    /// Stored pack
    #[serde(flatten)]
    pub pack: pack::Model,
    /// Price after promotion
    pub final_price: f64,
    /// Composition
    pub products: Vec<PackItemView>,
}

/// Retrieves a pack by id, returning None if it does not exist.
pub async fn find_pack<C>(db: &C, pack_id: i64) -> Result<Option<pack::Model>>
where
    C: ConnectionTrait,
{
    Pack::find_by_id(pack_id).one(db).await.map_err(Into::into)
}

/// Retrieves a pack by id or fails with [`Error::PackNotFound`].
pub async fn require_pack<C>(db: &C, pack_id: i64) -> Result<pack::Model>
where
    C: ConnectionTrait,
{
    find_pack(db, pack_id)
        .await?
        .ok_or(Error::PackNotFound { id: pack_id })
}

/// Loads the composition of each pack.
async fn items_for<C>(db: &C, pack_ids: Vec<i64>) -> Result<HashMap<i64, Vec<PackItemView>>>
where
    C: ConnectionTrait,
{
    let pivots = PackProduct::find()
        .filter(pack_product::Column::PackId.is_in(pack_ids))
        .order_by_asc(pack_product::Column::ProductId)
        .all(db)
        .await?;

    let product_ids: Vec<i64> = pivots.iter().map(|p| p.product_id).collect();
    let products: HashMap<i64, product::Model> = Product::find()
        .filter(product::Column::Id.is_in(product_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut items: HashMap<i64, Vec<PackItemView>> = HashMap::new();
    for pivot in &pivots {
        if let Some(product) = products.get(&pivot.product_id) {
            items.entry(pivot.pack_id).or_default().push(PackItemView {
                id: product.id,
                title: product.title.clone(),
                slug: product.slug.clone(),
                price: product.price,
                final_price: product.final_price(),
                images: product.images.clone(),
                sizes: product.sizes.clone(),
                sheet_measures: product.sheet_measures.clone(),
                pivot: PivotView::from(pivot),
            });
        }
    }
    Ok(items)
}

fn to_view(pack: pack::Model, products: Vec<PackItemView>) -> PackView {
    PackView {
        final_price: pack.final_price(),
        pack,
        products,
    }
}

/// Lists packs with their composition.
pub async fn list_packs(db: &DatabaseConnection, request: PageRequest) -> Result<Page<PackView>> {
    let select = Pack::find().order_by_asc(pack::Column::Id);
    let page = fetch_page(db, select, request).await?;

    let ids = page.items.iter().map(|p| p.id).collect();
    let mut items = items_for(db, ids).await?;

    Ok(page.map(|pack| {
        let products = items.remove(&pack.id).unwrap_or_default();
        to_view(pack, products)
    }))
}

/// Retrieves one pack with its composition.
pub async fn get_pack<C>(db: &C, pack_id: i64) -> Result<PackView>
where
    C: ConnectionTrait,
{
    let pack = require_pack(db, pack_id).await?;
    let products = items_for(db, vec![pack_id])
        .await?
        .remove(&pack_id)
        .unwrap_or_default();
    Ok(to_view(pack, products))
}

/// Checks every composition line and that its product exists.
async fn validate_items(txn: &DatabaseTransaction, items: &[PackItemInput]) -> Result<()> {
    for (i, item) in items.iter().enumerate() {
        if let Some(quantity) = item.quantity {
            validation::at_least(&format!("products.{i}.quantity"), quantity, 1)?;
        }
        for value in item.sheet_measures.iter().chain(&item.colors) {
            validation::max_length(&format!("products.{i}"), value, 100)?;
        }
        if Product::find_by_id(item.product_id).one(txn).await?.is_none() {
            return Err(Error::validation(
                format!("products.{i}.product_id"),
                "does not exist",
            ));
        }
    }
    Ok(())
}

/// Replaces the composition of a pack with `items`.
///
/// A product listed twice keeps its last line.
async fn replace_items(txn: &DatabaseTransaction, pack_id: i64, items: &[PackItemInput]) -> Result<()> {
    PackProduct::delete_many()
        .filter(pack_product::Column::PackId.eq(pack_id))
        .exec(txn)
        .await?;

    let mut rows: HashMap<i64, pack_product::ActiveModel> = HashMap::new();
    for item in items {
        rows.insert(
            item.product_id,
            pack_product::ActiveModel {
                pack_id: Set(pack_id),
                product_id: Set(item.product_id),
                sheet_measures: Set(StringList(item.sheet_measures.clone())),
                colors: Set(StringList(item.colors.clone())),
                quantity: Set(item.quantity.unwrap_or(1)),
            },
        );
    }
    if !rows.is_empty() {
        PackProduct::insert_many(rows.into_values()).exec(txn).await?;
    }
    Ok(())
}

/// Creates a pack and its composition in one transaction.
///
/// # Errors
/// Returns [`Error::Validation`] for invalid fields or a composition line
/// referencing an unknown product; nothing is persisted in that case.
pub async fn create_pack(db: &DatabaseConnection, input: NewPack) -> Result<PackView> {
    let title = validation::required_text("title", &input.title, 255)?;
    let description = validation::optional_text("description", input.description.as_deref(), 10_000)?;
    let price = validation::amount("price", input.price)?;
    let promotion = validation::promotion("promotion", input.promotion)?;
    validation::measure_prices(&input.measure_prices)?;

    let txn = db.begin().await?;
    validate_items(&txn, &input.products).await?;

    let slug = resolve_slug::<Pack, _>(
        &txn,
        pack::Column::Slug,
        pack::Column::Id,
        input.slug.as_deref(),
        &title,
        None,
    )
    .await?;
    let now = Utc::now();

    let pack = pack::ActiveModel {
        title: Set(title),
        slug: Set(slug),
        description: Set(description),
        price: Set(price),
        promotion: Set(promotion),
        images: Set(StringList::default()),
        measure_prices: Set(MeasurePriceList(input.measure_prices)),
        availability: Set(input.availability),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    replace_items(&txn, pack.id, &input.products).await?;
    let view = get_pack(&txn, pack.id).await?;
    txn.commit().await?;

    tracing::info!(pack_id = view.pack.id, items = view.products.len(), "Pack created");
    Ok(view)
}

/// Applies the given changes to a pack, replacing its composition when
/// `products` is provided.
///
/// # Errors
/// Returns [`Error::PackNotFound`] for an unknown id and the same validation
/// errors as [`create_pack`].
pub async fn update_pack(
    db: &DatabaseConnection,
    pack_id: i64,
    changes: PackChanges,
) -> Result<PackView> {
    let txn = db.begin().await?;

    let existing = require_pack(&txn, pack_id).await?;
    let mut pack: pack::ActiveModel = existing.clone().into();

    if let Some(title) = &changes.title {
        pack.title = Set(validation::required_text("title", title, 255)?);
    }
    if let Some(slug) = &changes.slug {
        let title = changes.title.as_deref().unwrap_or(&existing.title);
        pack.slug = Set(resolve_slug::<Pack, _>(
            &txn,
            pack::Column::Slug,
            pack::Column::Id,
            Some(slug),
            title,
            Some(pack_id),
        )
        .await?);
    }
    if let Some(description) = &changes.description {
        pack.description = Set(validation::optional_text(
            "description",
            Some(description),
            10_000,
        )?);
    }
    if let Some(price) = changes.price {
        pack.price = Set(validation::amount("price", price)?);
    }
    if let Some(promotion) = changes.promotion {
        pack.promotion = Set(validation::promotion("promotion", promotion)?);
    }
    if let Some(measure_prices) = changes.measure_prices {
        validation::measure_prices(&measure_prices)?;
        pack.measure_prices = Set(MeasurePriceList(measure_prices));
    }
    if let Some(availability) = changes.availability {
        pack.availability = Set(availability);
    }
    pack.updated_at = Set(Utc::now());
    pack.update(&txn).await?;

    if let Some(items) = &changes.products {
        validate_items(&txn, items).await?;
        replace_items(&txn, pack_id, items).await?;
    }

    let view = get_pack(&txn, pack_id).await?;
    txn.commit().await?;
    Ok(view)
}

/// Replaces the stored image list of a pack.
pub async fn set_pack_images(
    db: &DatabaseConnection,
    pack_id: i64,
    images: Vec<String>,
) -> Result<PackView> {
    let mut pack: pack::ActiveModel = require_pack(db, pack_id).await?.into();
    pack.images = Set(StringList(images));
    pack.updated_at = Set(Utc::now());
    pack.update(db).await?;
    get_pack(db, pack_id).await
}

/// Deletes a pack and its composition.
pub async fn delete_pack(db: &DatabaseConnection, pack_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let pack = require_pack(&txn, pack_id).await?;
    PackProduct::delete_many()
        .filter(pack_product::Column::PackId.eq(pack_id))
        .exec(&txn)
        .await?;
    pack.delete(&txn).await?;

    txn.commit().await?;
    tracing::info!(pack_id, "Pack deleted");
    Ok(())
}

/// Adds a product to a pack, or updates its line when already present.
///
/// # Errors
/// Returns [`Error::PackNotFound`] / [`Error::ProductNotFound`] for unknown
/// ids and [`Error::Validation`] for a quantity below 1.
pub async fn add_product_to_pack(
    db: &DatabaseConnection,
    pack_id: i64,
    item: PackItemInput,
) -> Result<PackView> {
    let quantity = validation::at_least("quantity", item.quantity.unwrap_or(1), 1)?;

    let txn = db.begin().await?;
    require_pack(&txn, pack_id).await?;
    require_product(&txn, item.product_id).await?;

    let row = pack_product::ActiveModel {
        pack_id: Set(pack_id),
        product_id: Set(item.product_id),
        sheet_measures: Set(StringList(item.sheet_measures)),
        colors: Set(StringList(item.colors)),
        quantity: Set(quantity),
    };
    let existing = PackProduct::find_by_id((pack_id, item.product_id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        row.update(&txn).await?;
    } else {
        row.insert(&txn).await?;
    }

    let view = get_pack(&txn, pack_id).await?;
    txn.commit().await?;
    Ok(view)
}

/// Removes a product from a pack.
///
/// # Errors
/// Returns [`Error::PackItemNotFound`] when the product is not in the pack.
pub async fn remove_product_from_pack(
    db: &DatabaseConnection,
    pack_id: i64,
    product_id: i64,
) -> Result<PackView> {
    require_pack(db, pack_id).await?;
    require_product(db, product_id).await?;

    let result = PackProduct::delete_by_id((pack_id, product_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::PackItemNotFound {
            pack_id,
            product_id,
        });
    }

    get_pack(db, pack_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn item(product_id: i64, quantity: i32) -> PackItemInput {
        PackItemInput {
            product_id,
            sheet_measures: vec!["160x200x35 cm".to_string()],
            colors: vec!["Blanc".to_string()],
            quantity: Some(quantity),
        }
    }

    #[tokio::test]
    async fn test_create_pack_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_pack(&db, new_pack("", 10.0, None, vec![])).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "title"));

        let result = create_pack(&db, new_pack("Pack", -1.0, None, vec![])).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "price"));

        let result = create_pack(&db, new_pack("Pack", 10.0, Some(101.0), vec![])).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "promotion"));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_pack_with_products() -> Result<()> {
        let db = setup_test_db().await?;
        let drap = create_test_product(&db, "Drap", 50.0, Some(10.0)).await?;
        let taie = create_test_product(&db, "Taie", 10.0, None).await?;

        let view = create_pack(
            &db,
            new_pack("Pack chambre", 100.0, Some(20.0), vec![item(drap.id, 1), item(taie.id, 2)]),
        )
        .await?;

        assert_eq!(view.pack.slug, "pack-chambre");
        assert_eq!(view.final_price, 80.0);
        assert_eq!(view.products.len(), 2);
        assert_eq!(view.products[0].id, drap.id);
        assert_eq!(view.products[0].final_price, 45.0);
        assert_eq!(view.products[1].pivot.quantity, 2);
        assert_eq!(view.products[1].pivot.colors, StringList(vec!["Blanc".to_string()]));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_pack_unknown_product_persists_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let drap = create_test_product(&db, "Drap", 50.0, None).await?;

        let result = create_pack(
            &db,
            new_pack("Pack", 100.0, None, vec![item(drap.id, 1), item(999, 1)]),
        )
        .await;
        assert!(
            matches!(result, Err(Error::Validation { field, .. }) if field == "products.1.product_id")
        );
        assert_eq!(Pack::find().count(&db).await?, 0);
        assert_eq!(PackProduct::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_pack_replaces_composition_only_when_given() -> Result<()> {
        let db = setup_test_db().await?;
        let drap = create_test_product(&db, "Drap", 50.0, None).await?;
        let taie = create_test_product(&db, "Taie", 10.0, None).await?;
        let pack = create_test_pack(&db, "Pack", 60.0, None, &[(drap.id, 1)]).await?;

        let view = update_pack(
            &db,
            pack.id,
            PackChanges {
                price: Some(55.0),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(view.pack.price, 55.0);
        assert_eq!(view.products.len(), 1);

        let view = update_pack(
            &db,
            pack.id,
            PackChanges {
                products: Some(vec![item(taie.id, 4)]),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(view.products.len(), 1);
        assert_eq!(view.products[0].id, taie.id);
        assert_eq!(view.products[0].pivot.quantity, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_pack_promotion_can_be_cleared() -> Result<()> {
        let db = setup_test_db().await?;
        let pack = create_test_pack(&db, "Pack", 80.0, Some(10.0), &[]).await?;

        let changes: PackChanges = serde_json::from_value(serde_json::json!({ "promotion": null }))?;
        let view = update_pack(&db, pack.id, changes).await?;
        assert_eq!(view.pack.promotion, None);
        assert_eq!(view.final_price, 80.0);

        let changes: PackChanges = serde_json::from_value(serde_json::json!({
            "measure_prices": [{ "measure": "", "price": 90.0 }],
        }))?;
        let result = update_pack(&db, pack.id, changes).await;
        assert!(matches!(
            result,
            Err(Error::Validation { field, .. }) if field == "measure_prices.0.measure"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_and_remove_product() -> Result<()> {
        let db = setup_test_db().await?;
        let drap = create_test_product(&db, "Drap", 50.0, None).await?;
        let pack = create_test_pack(&db, "Pack", 60.0, None, &[]).await?;

        let view = add_product_to_pack(&db, pack.id, item(drap.id, 1)).await?;
        assert_eq!(view.products.len(), 1);

        // Adding again updates the line in place
        let view = add_product_to_pack(&db, pack.id, item(drap.id, 3)).await?;
        assert_eq!(view.products.len(), 1);
        assert_eq!(view.products[0].pivot.quantity, 3);

        let view = remove_product_from_pack(&db, pack.id, drap.id).await?;
        assert!(view.products.is_empty());

        let result = remove_product_from_pack(&db, pack.id, drap.id).await;
        assert!(matches!(result, Err(Error::PackItemNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_product_rejects_bad_quantity_and_unknown_ids() -> Result<()> {
        let db = setup_test_db().await?;
        let drap = create_test_product(&db, "Drap", 50.0, None).await?;
        let pack = create_test_pack(&db, "Pack", 60.0, None, &[]).await?;

        let result = add_product_to_pack(&db, pack.id, item(drap.id, 0)).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "quantity"));

        let result = add_product_to_pack(&db, 999, item(drap.id, 1)).await;
        assert!(matches!(result, Err(Error::PackNotFound { id: 999 })));

        let result = add_product_to_pack(&db, pack.id, item(999, 1)).await;
        assert!(matches!(result, Err(Error::ProductNotFound { id: 999 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_pack() -> Result<()> {
        let db = setup_test_db().await?;
        let drap = create_test_product(&db, "Drap", 50.0, None).await?;
        let pack = create_test_pack(&db, "Pack", 60.0, None, &[(drap.id, 1)]).await?;

        delete_pack(&db, pack.id).await?;
        assert!(find_pack(&db, pack.id).await?.is_none());
        assert_eq!(PackProduct::find().count(&db).await?, 0);
        // The product itself survives
        assert!(Product::find_by_id(drap.id).one(&db).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_packs_paginates() -> Result<()> {
        let db = setup_test_db().await?;
        for i in 0..3 {
            create_test_pack(&db, &format!("Pack {i}"), 10.0, None, &[]).await?;
        }

        let page = list_packs(&db, PageRequest::new(Some(2), Some(2), DEFAULT_PER_PAGE, MAX_PER_PAGE))
            .await?;
        assert_eq!(page.total, 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].pack.title, "Pack 2");
        Ok(())
    }
}
