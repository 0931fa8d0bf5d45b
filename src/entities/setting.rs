//! Setting entity - stores site settings as key/value pairs.
//! Keys are `theme`, `contact`, `social`, `logo` and `carousel`; values are
//! arbitrary JSON documents.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Setting database model - one JSON value per key
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Setting key (e.g., `"theme"`)
    #[sea_orm(unique)]
    pub key: String,
    /// Setting value
    pub value: Json,
    /// When this setting was last modified
    pub updated_at: DateTimeUtc,
}

/// `Setting` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
