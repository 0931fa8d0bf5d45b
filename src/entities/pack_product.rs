//! Pack composition pivot - links a product to a pack with per-pack choices.

use super::json::StringList;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pivot row between a pack and one of its products
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pack_product")]
pub struct Model {
    /// Owning pack
    #[sea_orm(primary_key, auto_increment = false)]
    pub pack_id: i64,
    /// Constituent product
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: i64,
    /// Sheet measures selected for this pack
    #[sea_orm(column_type = "Json")]
    pub sheet_measures: StringList,
    /// Colors selected for this pack
    #[sea_orm(column_type = "Json")]
    pub colors: StringList,
    /// How many units of the product the pack contains
    pub quantity: i32,
}

/// Defines relationships between the pivot and both sides
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each row belongs to one pack
    #[sea_orm(
        belongs_to = "super::pack::Entity",
        from = "Column::PackId",
        to = "super::pack::Column::Id",
        on_delete = "Cascade"
    )]
    Pack,
    /// Each row references one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
}

impl Related<super::pack::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pack.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
