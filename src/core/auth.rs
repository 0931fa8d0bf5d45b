//! Bearer-token authentication and the first-run superadmin.

use crate::{
    config::app::AdminConfig,
    core::user::{self, NewUser},
    entities::{AccessToken, User, UserRole, access_token, user as user_entity},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use serde::Serialize;
use uuid::Uuid;

/// A freshly issued token and its owner.
#[derive(Debug, Clone, Serialize)]
pub struct Login {
    /// Authenticated user
    pub user: user_entity::Model,
    /// Value for `Authorization: Bearer`
    pub token: String,
}

/// Checks credentials and issues a new token.
///
/// # Errors
/// Returns [`Error::InvalidCredentials`] for an unknown email or a wrong
/// password; both cases look the same to the caller.
pub async fn login(db: &DatabaseConnection, email: &str, password: &str) -> Result<Login> {
    let Some(user) = user::find_by_email(db, email).await? else {
        tracing::info!("Login failed: unknown email");
        return Err(Error::InvalidCredentials);
    };
    if !user::verify_password(password.to_string(), user.password_hash.clone()).await? {
        tracing::info!(user_id = user.id, "Login failed: wrong password");
        return Err(Error::InvalidCredentials);
    }

    let token = issue_token(db, user.id).await?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(Login { user, token })
}

/// Stores a new opaque token for `user_id`.
pub async fn issue_token(db: &DatabaseConnection, user_id: i64) -> Result<String> {
    let token = Uuid::new_v4().simple().to_string();
    access_token::ActiveModel {
        user_id: Set(user_id),
        token: Set(token.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(token)
}

/// Resolves a bearer token to its user.
///
/// # Errors
/// Returns [`Error::Unauthenticated`] for an unknown token.
pub async fn authenticate(db: &DatabaseConnection, token: &str) -> Result<user_entity::Model> {
    let found = AccessToken::find()
        .filter(access_token::Column::Token.eq(token))
        .find_also_related(User)
        .one(db)
        .await?;

    match found {
        Some((_, Some(user))) => Ok(user),
        _ => Err(Error::Unauthenticated),
    }
}

/// Revokes one token.
pub async fn logout(db: &DatabaseConnection, token: &str) -> Result<()> {
    AccessToken::delete_many()
        .filter(access_token::Column::Token.eq(token))
        .exec(db)
        .await?;
    Ok(())
}

/// Creates the configured superadmin when no superadmin exists yet.
///
/// Returns the created user, or `None` when a superadmin was already present.
///
/// # Errors
/// Returns [`Error::Config`] when a superadmin is needed but `password` is
/// missing.
pub async fn seed_superadmin(
    db: &DatabaseConnection,
    admin: &AdminConfig,
    password: Option<String>,
) -> Result<Option<user_entity::Model>> {
    let existing = User::find()
        .filter(user_entity::Column::Role.eq(UserRole::Superadmin))
        .count(db)
        .await?;
    if existing > 0 {
        tracing::debug!("Superadmin already present, skipping seed");
        return Ok(None);
    }

    let password = password.ok_or_else(|| Error::Config {
        message: "ADMIN_PASSWORD must be set to create the first superadmin".to_string(),
    })?;
    let created = user::create_user(
        db,
        NewUser {
            name: admin.name.clone(),
            email: admin.email.clone(),
            password_confirmation: password.clone(),
            password,
            role: Some(UserRole::Superadmin),
        },
    )
    .await?;

    tracing::info!(email = %created.email, "Seeded superadmin");
    Ok(Some(created))
}
