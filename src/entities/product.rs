//! Product entity - a single catalog item.
//!
//! `final_price` is not stored; it is derived from `price` and `promotion`
//! through [`crate::core::pricing::Priced`].

use super::json::{ColorList, MeasurePriceList, StringList};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display title ("Parure de lit satin")
    pub title: String,
    /// URL slug, unique across products
    #[sea_orm(unique)]
    pub slug: String,
    /// Long description
    pub description: Option<String>,
    /// Catalog category ("Linge de lit")
    pub category: String,
    /// Base unit price
    pub price: f64,
    /// Percentage discount in [0, 100], if any
    pub promotion: Option<f64>,
    /// Relative image URLs
    #[sea_orm(column_type = "Json")]
    pub images: StringList,
    /// Offered sizes
    #[sea_orm(column_type = "Json")]
    pub sizes: StringList,
    /// Offered sheet measures
    #[sea_orm(column_type = "Json")]
    pub sheet_measures: StringList,
    /// Offered colors
    #[sea_orm(column_type = "Json")]
    pub colors: ColorList,
    /// Prices per measure, shown in the storefront
    #[sea_orm(column_type = "Json")]
    pub measure_prices: MeasurePriceList,
    /// Units in stock
    pub stock: i32,
    /// Whether the product can be ordered
    pub status: bool,
    /// Hidden from storefront listings
    pub hidden: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product appears in many pack compositions
    #[sea_orm(has_many = "super::pack_product::Entity")]
    PackProducts,
}

impl Related<super::pack_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackProducts.def()
    }
}

impl Related<super::pack::Entity> for Entity {
    fn to() -> RelationDef {
        super::pack_product::Relation::Pack.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::pack_product::Relation::Product.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
