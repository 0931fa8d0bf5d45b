//! Order entity - a placed storefront order.
//!
//! The cart and total are frozen at creation time; later catalog price
//! changes never touch stored orders.

use super::json::CartItems;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Just placed, not yet handled
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Customer did not pick up the confirmation call
    #[sea_orm(string_value = "no_answer")]
    NoAnswer,
    /// Confirmed by phone
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    /// Cancelled during the confirmation call
    #[sea_orm(string_value = "cancelled_phone")]
    CancelledPhone,
    /// Handed to the courier
    #[sea_orm(string_value = "delivering")]
    Delivering,
    /// Delivered to the customer
    #[sea_orm(string_value = "delivered")]
    Delivered,
    /// Refused or cancelled at delivery
    #[sea_orm(string_value = "cancelled_delivery")]
    CancelledDelivery,
}

impl OrderStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::NoAnswer => "no_answer",
            Self::Confirmed => "confirmed",
            Self::CancelledPhone => "cancelled_phone",
            Self::Delivering => "delivering",
            Self::Delivered => "delivered",
            Self::CancelledDelivery => "cancelled_delivery",
        }
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Customer full name
    pub full_name: String,
    /// Customer phone
    pub phone: String,
    /// Customer email, optional
    pub email: Option<String>,
    /// Delivery address
    pub address: String,
    /// Cart as submitted
    #[sea_orm(column_type = "Json")]
    pub products: CartItems,
    /// Server-computed total
    pub total: f64,
    /// Current status
    pub status: OrderStatus,
    /// When the order was placed
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
}

/// `Order` has no foreign keys; cart lines reference the catalog by id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
