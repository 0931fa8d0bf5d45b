//! User entity - back-office accounts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Back-office role
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Manages catalog and orders
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Additionally manages users and site settings
    #[sea_orm(string_value = "superadmin")]
    Superadmin,
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login email, unique
    #[sea_orm(unique)]
    pub email: String,
    /// bcrypt hash, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role
    pub role: UserRole,
    /// When the user was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Whether the user holds the superadmin role.
    #[must_use]
    pub fn is_superadmin(&self) -> bool {
        self.role == UserRole::Superadmin
    }
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many access tokens
    #[sea_orm(has_many = "super::access_token::Entity")]
    AccessTokens,
}

impl Related<super::access_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
