//! Pack entity - a bundle of products sold together at one price.

use super::json::{MeasurePriceList, StringList};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pack database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "packs")]
pub struct Model {
    /// Unique identifier for the pack
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display title
    pub title: String,
    /// URL slug, unique across packs
    #[sea_orm(unique)]
    pub slug: String,
    /// Long description
    pub description: Option<String>,
    /// Bundle price
    pub price: f64,
    /// Percentage discount in [0, 100], if any
    pub promotion: Option<f64>,
    /// Relative image URLs
    #[sea_orm(column_type = "Json")]
    pub images: StringList,
    /// Prices per measure, shown in the storefront
    #[sea_orm(column_type = "Json")]
    pub measure_prices: MeasurePriceList,
    /// Whether the pack can be ordered
    pub availability: bool,
    /// When the pack was created
    pub created_at: DateTimeUtc,
    /// When the pack was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Pack and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One pack has many composition rows
    #[sea_orm(has_many = "super::pack_product::Entity")]
    PackProducts,
}

impl Related<super::pack_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackProducts.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        super::pack_product::Relation::Product.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::pack_product::Relation::Pack.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
