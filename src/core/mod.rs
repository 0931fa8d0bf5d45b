//! Core business logic, independent of the HTTP layer.
//!
//! Every operation takes a sea-orm connection and returns [`crate::errors::Result`].

pub mod auth;
pub mod dashboard;
pub mod order;
pub mod pack;
pub mod pagination;
pub mod pricing;
pub mod product;
pub mod settings;
pub mod slug;
pub mod upload;
pub mod user;
pub mod validation;
