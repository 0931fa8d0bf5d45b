//! Login, session and user management routes.

use super::{
    AppState,
    extract::{ApiJson, ApiQuery, AuthUser, BearerToken, SuperAdmin},
    response::{ApiResponse, message},
};
use crate::{
    core::{
        auth::{self, Login},
        pagination::PageQuery,
        user::{self, DEFAULT_PER_PAGE, MAX_PER_PAGE, NewUser, UserChanges},
    },
    entities::user as user_entity,
    errors::Result,
};
use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/auth/register", post(create_user))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", put(update_user).delete(delete_user))
}

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<ApiResponse<Login>> {
    let login = auth::login(&state.db, &credentials.email, &credentials.password).await?;
    Ok(ApiResponse::ok(login).with_message("Logged in"))
}

async fn me(AuthUser(user): AuthUser) -> ApiResponse<user_entity::Model> {
    ApiResponse::ok(user)
}

async fn logout(
    State(state): State<AppState>,
    _user: AuthUser,
    BearerToken(token): BearerToken,
) -> Result<ApiResponse<Option<()>>> {
    auth::logout(&state.db, &token).await?;
    Ok(message("Logged out"))
}

async fn list_users(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<ApiResponse<Vec<user_entity::Model>>> {
    let page = user::list_users(&state.db, query.to_request(DEFAULT_PER_PAGE, MAX_PER_PAGE)).await?;
    Ok(ApiResponse::page(page))
}

async fn create_user(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    ApiJson(input): ApiJson<NewUser>,
) -> Result<ApiResponse<user_entity::Model>> {
    let user = user::create_user(&state.db, input).await?;
    Ok(ApiResponse::created(user).with_message("User created"))
}

async fn update_user(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    Path(id): Path<i64>,
    ApiJson(changes): ApiJson<UserChanges>,
) -> Result<ApiResponse<user_entity::Model>> {
    let user = user::update_user(&state.db, id, changes).await?;
    Ok(ApiResponse::ok(user).with_message("User updated"))
}

async fn delete_user(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Option<()>>> {
    user::delete_user(&state.db, id).await?;
    Ok(message("User deleted"))
}
