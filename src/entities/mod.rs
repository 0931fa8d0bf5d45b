//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod access_token;
pub mod json;
pub mod order;
pub mod pack;
pub mod pack_product;
pub mod product;
pub mod setting;
pub mod user;

// Re-export specific types to avoid conflicts
pub use access_token::{Entity as AccessToken, Model as AccessTokenModel};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel, OrderStatus};
pub use pack::{Column as PackColumn, Entity as Pack, Model as PackModel};
pub use pack_product::{Column as PackProductColumn, Entity as PackProduct, Model as PackProductModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use setting::{Column as SettingColumn, Entity as Setting, Model as SettingModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, UserRole};
