//! Access token entity - opaque bearer tokens issued at login.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access token database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "access_tokens")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner
    pub user_id: i64,
    /// Opaque token value sent as `Authorization: Bearer <token>`
    #[sea_orm(unique)]
    pub token: String,
    /// When the token was issued
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `AccessToken` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each token belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
