//! Back-office account management.
//!
//! At least one superadmin must exist at all times: deleting or demoting the
//! last one fails with [`Error::LastSuperadmin`].

use crate::{
    core::{
        pagination::{Page, PageRequest, fetch_page},
        validation,
    },
    entities::{User, UserRole, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;

/// Default page size for user listings.
pub const DEFAULT_PER_PAGE: u64 = 20;
/// Largest accepted page size for user listings.
pub const MAX_PER_PAGE: u64 = 100;
/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Fields accepted when creating an account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Plain password
    pub password: String,
    /// Must equal `password`
    pub password_confirmation: String,
    /// Role, `admin` when absent
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// Partial account edit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    /// Display name
    pub name: Option<String>,
    /// Login email
    pub email: Option<String>,
    /// New plain password
    pub password: Option<String>,
    /// Must equal `password` when a password is given
    pub password_confirmation: Option<String>,
    /// New role
    pub role: Option<UserRole>,
}

/// Hashes a password with bcrypt on the blocking pool.
pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| Error::Hashing(e.to_string()))?
        .map_err(Into::into)
}

/// Checks a password against a bcrypt hash on the blocking pool.
pub async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| Error::Hashing(e.to_string()))?
        .map_err(Into::into)
}

fn validate_password(password: &str, confirmation: Option<&str>) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    if confirmation != Some(password) {
        return Err(Error::validation("password", "confirmation does not match"));
    }
    Ok(())
}

async fn email_taken<C>(db: &C, email: &str, except: Option<i64>) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut query = User::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

async fn superadmin_count<C>(db: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Role.eq(UserRole::Superadmin))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Finds a user by login email.
pub async fn find_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(email.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a user by id or fails with [`Error::UserNotFound`].
pub async fn get_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })
}

/// Lists accounts newest first.
pub async fn list_users(db: &DatabaseConnection, request: PageRequest) -> Result<Page<user::Model>> {
    let select = User::find()
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id);
    fetch_page(db, select, request).await
}

/// Creates an account.
///
/// # Errors
/// Returns [`Error::Validation`] for a blank name, malformed or taken email,
/// or a short or unconfirmed password.
pub async fn create_user(db: &DatabaseConnection, input: NewUser) -> Result<user::Model> {
    let name = validation::required_text("name", &input.name, 255)?;
    let email = validation::email("email", &input.email)?;
    validate_password(&input.password, Some(&input.password_confirmation))?;
    if email_taken(db, &email, None).await? {
        return Err(Error::validation("email", "has already been taken"));
    }

    let password_hash = hash_password(input.password).await?;
    let user = user::ActiveModel {
        name: Set(name),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(input.role.unwrap_or(UserRole::Admin)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = user.id, role = ?user.role, "User created");
    Ok(user)
}

/// Applies a partial edit to an account.
///
/// # Errors
/// Returns [`Error::LastSuperadmin`] when the change would demote the only
/// superadmin, plus the validation errors of [`create_user`].
pub async fn update_user(
    db: &DatabaseConnection,
    user_id: i64,
    changes: UserChanges,
) -> Result<user::Model> {
    let txn = db.begin().await?;
    let existing = get_user(&txn, user_id).await?;
    let mut user: user::ActiveModel = existing.clone().into();

    if let Some(name) = &changes.name {
        user.name = Set(validation::required_text("name", name, 255)?);
    }
    if let Some(email) = &changes.email {
        let email = validation::email("email", email)?;
        if email_taken(&txn, &email, Some(user_id)).await? {
            return Err(Error::validation("email", "has already been taken"));
        }
        user.email = Set(email);
    }
    if let Some(password) = changes.password {
        validate_password(&password, changes.password_confirmation.as_deref())?;
        user.password_hash = Set(hash_password(password).await?);
    }
    if let Some(role) = changes.role {
        if existing.is_superadmin() && role != UserRole::Superadmin && superadmin_count(&txn).await? <= 1 {
            tracing::warn!(user_id, "Refusing to demote the last superadmin");
            return Err(Error::LastSuperadmin);
        }
        user.role = Set(role);
    }

    let user = user.update(&txn).await?;
    txn.commit().await?;
    Ok(user)
}

/// Deletes an account and its tokens.
///
/// # Errors
/// Returns [`Error::LastSuperadmin`] when `user_id` is the only superadmin.
pub async fn delete_user(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let user = get_user(&txn, user_id).await?;

    if user.is_superadmin() && superadmin_count(&txn).await? <= 1 {
        tracing::warn!(user_id, "Refusing to delete the last superadmin");
        return Err(Error::LastSuperadmin);
    }

    crate::entities::AccessToken::delete_many()
        .filter(crate::entities::access_token::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    user.delete(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id, "User deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_user_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let mut input = new_user("a@shop.test", UserRole::Admin);
        input.password = "short".to_string();
        input.password_confirmation = "short".to_string();
        let result = create_user(&db, input).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "password"));

        let mut input = new_user("a@shop.test", UserRole::Admin);
        input.password_confirmation = "different-secret".to_string();
        let result = create_user(&db, input).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "password"));

        let result = create_user(&db, new_user("nope", UserRole::Admin)).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "email"));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user(&db, new_user("a@shop.test", UserRole::Admin)).await?;

        assert_ne!(user.password_hash, TEST_PASSWORD);
        assert!(verify_password(TEST_PASSWORD.to_string(), user.password_hash.clone()).await?);
        assert!(!verify_password("wrong-password".to_string(), user.password_hash).await?);

        let result = create_user(&db, new_user("a@shop.test", UserRole::Admin)).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "email"));
        Ok(())
    }

    #[tokio::test]
    async fn test_cannot_delete_last_superadmin() -> Result<()> {
        let db = setup_test_db().await?;
        let root = create_test_user(&db, "root@shop.test", UserRole::Superadmin).await?;
        let admin = create_test_user(&db, "admin@shop.test", UserRole::Admin).await?;

        let result = delete_user(&db, root.id).await;
        assert!(matches!(result, Err(Error::LastSuperadmin)));
        assert!(get_user(&db, root.id).await.is_ok());

        delete_user(&db, admin.id).await?;
        assert!(matches!(
            get_user(&db, admin.id).await,
            Err(Error::UserNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_superadmin_can_be_deleted_when_another_remains() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_user(&db, "one@shop.test", UserRole::Superadmin).await?;
        let second = create_test_user(&db, "two@shop.test", UserRole::Superadmin).await?;

        delete_user(&db, first.id).await?;
        let result = delete_user(&db, second.id).await;
        assert!(matches!(result, Err(Error::LastSuperadmin)));
        Ok(())
    }

    #[tokio::test]
    async fn test_cannot_demote_last_superadmin() -> Result<()> {
        let db = setup_test_db().await?;
        let root = create_test_user(&db, "root@shop.test", UserRole::Superadmin).await?;

        let result = update_user(
            &db,
            root.id,
            UserChanges {
                role: Some(UserRole::Admin),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::LastSuperadmin)));

        let updated = update_user(
            &db,
            root.id,
            UserChanges {
                name: Some("Owner".to_string()),
                role: Some(UserRole::Superadmin),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.name, "Owner");
        assert!(updated.is_superadmin());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_password_requires_confirmation() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "a@shop.test", UserRole::Admin).await?;

        let result = update_user(
            &db,
            user.id,
            UserChanges {
                password: Some("new-password".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "password"));

        let updated = update_user(
            &db,
            user.id,
            UserChanges {
                password: Some("new-password".to_string()),
                password_confirmation: Some("new-password".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert!(verify_password("new-password".to_string(), updated.password_hash).await?);
        Ok(())
    }
}
