//! Product business logic - Handles all product-related operations.
//!
//! This module provides functions for creating, retrieving, updating and deleting
//! catalog products, plus the storefront queries built on top of them: category
//! listing, related products and the monthly top sales. Returned views carry the
//! derived `final_price` and the packs each product belongs to.

use crate::{
    config::app::ProductSeed,
    core::{
        pagination::{Page, PageRequest, fetch_page},
        pricing::Priced,
        slug::resolve_slug,
        validation,
    },
    entities::{
        Order, Pack, PackProduct, Product,
        json::{Color, ColorList, MeasurePrice, MeasurePriceList, StringList},
        order, pack, pack_product, product,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default page size for product listings.
pub const DEFAULT_PER_PAGE: u64 = 20;
/// Largest accepted page size for product listings.
pub const MAX_PER_PAGE: u64 = 50;
/// How many related products are suggested.
pub const RELATED_LIMIT: usize = 6;
/// How many products the top sales ranking returns.
pub const TOP_SALES_LIMIT: usize = 10;

/// Fields accepted when creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    /// Display title
    pub title: String,
    /// URL slug; derived from the title when absent
    #[serde(default)]
    pub slug: Option<String>,
    /// Long description
    #[serde(default)]
    pub description: Option<String>,
    /// Catalog category
    pub category: String,
    /// Base price
    pub price: f64,
    /// Percentage discount in [0, 100]
    #[serde(default)]
    pub promotion: Option<f64>,
    /// Offered sizes
    #[serde(default)]
    pub sizes: Vec<String>,
    /// Offered sheet measures
    #[serde(default)]
    pub sheet_measures: Vec<String>,
    /// Offered colors
    #[serde(default)]
    pub colors: Vec<Color>,
    /// Per-measure prices
    #[serde(default)]
    pub measure_prices: Vec<MeasurePrice>,
    /// Units in stock, 0 when absent
    #[serde(default)]
    pub stock: Option<i32>,
    /// Whether the product can be ordered
    pub status: bool,
    /// Hidden from storefront listings
    #[serde(default)]
    pub hidden: bool,
}

/// Fields accepted when updating a product; absent fields are left as they are.
///
/// A promotion of 0 or `null` removes the discount.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductChanges {
    /// Display title
    pub title: Option<String>,
    /// URL slug
    pub slug: Option<String>,
    /// Long description
    pub description: Option<String>,
    /// Catalog category
    pub category: Option<String>,
    /// Base price
    pub price: Option<f64>,
    /// Percentage discount in [0, 100]; `null` removes it
    #[serde(default, with = "serde_with::rust::double_option")]
    pub promotion: Option<Option<f64>>,
    /// Offered sizes
    pub sizes: Option<Vec<String>>,
    /// Offered sheet measures
    pub sheet_measures: Option<Vec<String>>,
    /// Offered colors
    pub colors: Option<Vec<Color>>,
    /// Per-measure prices
    pub measure_prices: Option<Vec<MeasurePrice>>,
    /// Units in stock
    pub stock: Option<i32>,
    /// Whether the product can be ordered
    pub status: Option<bool>,
    /// Hidden from storefront listings
    pub hidden: Option<bool>,
}

/// Pivot data seen from either side of a pack composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotView {
    /// Sheet measures selected for the pack
    pub sheet_measures: StringList,
    /// Colors selected for the pack
    pub colors: StringList,
    /// Units of the product in the pack
    pub quantity: i32,
}

impl From<&pack_product::Model> for PivotView {
    fn from(row: &pack_product::Model) -> Self {
        Self {
            sheet_measures: row.sheet_measures.clone(),
            colors: row.colors.clone(),
            quantity: row.quantity,
        }
    }
}

/// A pack a product belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackRef {
    /// Pack id
    pub id: i64,
    /// Pack title
    pub title: String,
    /// Pack slug
    pub slug: String,
    /// Composition data for this product
    pub pivot: PivotView,
}

/// A product as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    /// Stored product
    #[serde(flatten)]
    pub product: product::Model,
    /// Price after promotion
    pub final_price: f64,
    /// Packs containing this product, when loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packs: Option<Vec<PackRef>>,
    /// Units sold this month, for the top sales ranking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_quantity: Option<i64>,
}

impl From<product::Model> for ProductView {
    fn from(product: product::Model) -> Self {
        Self {
            final_price: product.final_price(),
            product,
            packs: None,
            sales_quantity: None,
        }
    }
}

/// Best sellers of the current month.
#[derive(Debug, Clone, Serialize)]
pub struct TopSales {
    /// Products ordered by units sold, highest first
    pub products: Vec<ProductView>,
    /// First day of the period
    pub period: NaiveDate,
}

/// Retrieves a product by id, returning None if it does not exist.
pub async fn find_product<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product by id or fails with [`Error::ProductNotFound`].
pub async fn require_product<C>(db: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    find_product(db, product_id)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })
}

/// Loads, for each product id, the packs it belongs to.
async fn pack_refs_for(
    db: &DatabaseConnection,
    product_ids: Vec<i64>,
) -> Result<HashMap<i64, Vec<PackRef>>> {
    let pivots = PackProduct::find()
        .filter(pack_product::Column::ProductId.is_in(product_ids))
        .all(db)
        .await?;

    let pack_ids: Vec<i64> = pivots.iter().map(|p| p.pack_id).collect();
    let packs: HashMap<i64, pack::Model> = Pack::find()
        .filter(pack::Column::Id.is_in(pack_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut refs: HashMap<i64, Vec<PackRef>> = HashMap::new();
    for pivot in &pivots {
        if let Some(pack) = packs.get(&pivot.pack_id) {
            refs.entry(pivot.product_id).or_default().push(PackRef {
                id: pack.id,
                title: pack.title.clone(),
                slug: pack.slug.clone(),
                pivot: PivotView::from(pivot),
            });
        }
    }
    Ok(refs)
}

/// Lists products newest first, each with the packs it belongs to.
pub async fn list_products(
    db: &DatabaseConnection,
    request: PageRequest,
) -> Result<Page<ProductView>> {
    let select = Product::find()
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id);
    let page = fetch_page(db, select, request).await?;

    let ids = page.items.iter().map(|p| p.id).collect();
    let mut refs = pack_refs_for(db, ids).await?;

    Ok(page.map(|product| {
        let packs = refs.remove(&product.id).unwrap_or_default();
        ProductView {
            packs: Some(packs),
            ..ProductView::from(product)
        }
    }))
}

/// Retrieves one product with the packs it belongs to.
pub async fn get_product(db: &DatabaseConnection, product_id: i64) -> Result<ProductView> {
    let product = require_product(db, product_id).await?;
    let packs = pack_refs_for(db, vec![product_id])
        .await?
        .remove(&product_id)
        .unwrap_or_default();

    Ok(ProductView {
        packs: Some(packs),
        ..ProductView::from(product)
    })
}

/// Creates a new product after validating every field.
///
/// # Errors
/// Returns [`Error::Validation`] for a blank title or category, a negative or
/// non-finite price, a promotion outside [0, 100], a negative stock or a
/// taken slug; database errors otherwise.
pub async fn create_product(db: &DatabaseConnection, input: NewProduct) -> Result<product::Model> {
    let title = validation::required_text("title", &input.title, 255)?;
    let category = validation::required_text("category", &input.category, 255)?;
    let description = validation::optional_text("description", input.description.as_deref(), 10_000)?;
    let price = validation::amount("price", input.price)?;
    let promotion = validation::promotion("promotion", input.promotion)?;
    let stock = validation::at_least("stock", input.stock.unwrap_or(0), 0)?;
    validation::measure_prices(&input.measure_prices)?;

    let slug = resolve_slug::<Product, _>(
        db,
        product::Column::Slug,
        product::Column::Id,
        input.slug.as_deref(),
        &title,
        None,
    )
    .await?;
    let now = Utc::now();

    let product = product::ActiveModel {
        title: Set(title),
        slug: Set(slug),
        description: Set(description),
        category: Set(category),
        price: Set(price),
        promotion: Set(promotion),
        images: Set(StringList::default()),
        sizes: Set(StringList(input.sizes)),
        sheet_measures: Set(StringList(input.sheet_measures)),
        colors: Set(ColorList(input.colors)),
        measure_prices: Set(MeasurePriceList(input.measure_prices)),
        stock: Set(stock),
        status: Set(input.status),
        hidden: Set(input.hidden),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let product = product.insert(db).await?;
    tracing::info!(product_id = product.id, slug = %product.slug, "Product created");
    Ok(product)
}

/// Applies the given changes to an existing product.
///
/// Stock is kept when not provided.
///
/// # Errors
/// Returns [`Error::ProductNotFound`] for an unknown id and the same
/// validation errors as [`create_product`] for provided fields.
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    changes: ProductChanges,
) -> Result<product::Model> {
    let existing = require_product(db, product_id).await?;
    let mut product: product::ActiveModel = existing.clone().into();

    if let Some(title) = &changes.title {
        product.title = Set(validation::required_text("title", title, 255)?);
    }
    if let Some(slug) = &changes.slug {
        let title = changes.title.as_deref().unwrap_or(&existing.title);
        product.slug = Set(resolve_slug::<Product, _>(
            db,
            product::Column::Slug,
            product::Column::Id,
            Some(slug),
            title,
            Some(product_id),
        )
        .await?);
    }
    if let Some(description) = &changes.description {
        product.description = Set(validation::optional_text(
            "description",
            Some(description),
            10_000,
        )?);
    }
    if let Some(category) = &changes.category {
        product.category = Set(validation::required_text("category", category, 255)?);
    }
    if let Some(price) = changes.price {
        product.price = Set(validation::amount("price", price)?);
    }
    if let Some(promotion) = changes.promotion {
        product.promotion = Set(validation::promotion("promotion", promotion)?);
    }
    if let Some(stock) = changes.stock {
        product.stock = Set(validation::at_least("stock", stock, 0)?);
    }
    if let Some(sizes) = changes.sizes {
        product.sizes = Set(StringList(sizes));
    }
    if let Some(sheet_measures) = changes.sheet_measures {
        product.sheet_measures = Set(StringList(sheet_measures));
    }
    if let Some(colors) = changes.colors {
        product.colors = Set(ColorList(colors));
    }
    if let Some(measure_prices) = changes.measure_prices {
        validation::measure_prices(&measure_prices)?;
        product.measure_prices = Set(MeasurePriceList(measure_prices));
    }
    if let Some(status) = changes.status {
        product.status = Set(status);
    }
    if let Some(hidden) = changes.hidden {
        product.hidden = Set(hidden);
    }
    product.updated_at = Set(Utc::now());

    product.update(db).await.map_err(Into::into)
}

/// Replaces the stored image list of a product.
pub async fn set_product_images(
    db: &DatabaseConnection,
    product_id: i64,
    images: Vec<String>,
) -> Result<product::Model> {
    let mut product: product::ActiveModel = require_product(db, product_id).await?.into();
    product.images = Set(StringList(images));
    product.updated_at = Set(Utc::now());
    product.update(db).await.map_err(Into::into)
}

/// Deletes a product and its pack composition rows.
///
/// Stored orders keep referencing the id; their totals are unaffected.
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let product = require_product(&txn, product_id).await?;
    PackProduct::delete_many()
        .filter(pack_product::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    product.delete(&txn).await?;

    txn.commit().await?;
    tracing::info!(product_id, "Product deleted");
    Ok(())
}

/// Lists distinct non-empty categories, alphabetically.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<String>> {
    let categories: Vec<String> = Product::find()
        .select_only()
        .column(product::Column::Category)
        .distinct()
        .filter(product::Column::Category.ne(""))
        .order_by_asc(product::Column::Category)
        .into_tuple()
        .all(db)
        .await?;
    Ok(categories)
}

/// Whether `candidate` should be suggested next to `product`.
///
/// Same category and sharing the product's first color (when it has any), or
/// sharing its first size.
fn is_related(product: &product::Model, candidate: &product::Model) -> bool {
    let same_category = candidate.category == product.category;
    let color_match = product
        .colors
        .first_name()
        .is_none_or(|color| candidate.colors.contains_name(color));
    let size_match = product
        .sizes
        .first()
        .is_some_and(|size| candidate.sizes.contains(size));

    (same_category && color_match) || size_match
}

/// Suggests up to [`RELATED_LIMIT`] available products similar to `product_id`.
pub async fn related_products(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Vec<ProductView>> {
    let product = require_product(db, product_id).await?;

    let candidates = Product::find()
        .filter(product::Column::Id.ne(product_id))
        .filter(product::Column::Status.eq(true))
        .order_by_asc(product::Column::Id)
        .all(db)
        .await?;

    Ok(candidates
        .into_iter()
        .filter(|candidate| is_related(&product, candidate))
        .take(RELATED_LIMIT)
        .map(ProductView::from)
        .collect())
}

/// First instant of the month containing `now`.
#[must_use]
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Ranks products by units ordered since the start of the month of `now`.
///
/// Pack lines are not counted.
pub async fn top_sales(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<TopSales> {
    let since = start_of_month(now);
    let orders = Order::find()
        .filter(order::Column::CreatedAt.gte(since))
        .filter(order::Column::CreatedAt.lte(now))
        .all(db)
        .await?;

    let mut quantities: HashMap<i64, i64> = HashMap::new();
    for order in &orders {
        for item in order.products.0.iter().filter(|item| !item.is_pack) {
            *quantities.entry(item.product_id).or_default() += i64::from(item.quantity);
        }
    }

    let mut ranked: Vec<(i64, i64)> = quantities.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(TOP_SALES_LIMIT);

    let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();
    let mut products: HashMap<i64, product::Model> = Product::find()
        .filter(product::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let products = ranked
        .into_iter()
        .filter_map(|(id, quantity)| {
            products.remove(&id).map(|product| ProductView {
                sales_quantity: Some(quantity),
                ..ProductView::from(product)
            })
        })
        .collect();

    Ok(TopSales {
        products,
        period: since.date_naive(),
    })
}

/// Seeds products from configuration when the catalog is empty.
///
/// Returns the number of products created.
pub async fn seed_products(db: &DatabaseConnection, seeds: &[ProductSeed]) -> Result<usize> {
    if seeds.is_empty() || Product::find().count(db).await? > 0 {
        return Ok(0);
    }

    for seed in seeds {
        create_product(
            db,
            NewProduct {
                title: seed.title.clone(),
                slug: None,
                description: seed.description.clone(),
                category: seed.category.clone(),
                price: seed.price,
                promotion: seed.promotion,
                sizes: Vec::new(),
                sheet_measures: Vec::new(),
                colors: Vec::new(),
                measure_prices: Vec::new(),
                stock: Some(seed.stock),
                status: true,
                hidden: false,
            },
        )
        .await
        .inspect_err(|e| tracing::error!("Failed to seed product '{}': {e}", seed.title))?;
    }

    tracing::info!("Seeded {} products from configuration", seeds.len());
    Ok(seeds.len())
}
