//! Request extractors.
//!
//! Handlers that take [`AuthUser`] require a valid token; [`SuperAdmin`]
//! additionally requires the superadmin role. [`ApiJson`] and [`ApiQuery`]
//! report malformed input as field-level validation errors.

use crate::{
    api::AppState,
    core::auth,
    entities::user,
    errors::Error,
};
use axum::{
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{header::AUTHORIZATION, request::Parts},
};

/// Body extractor like [`axum::Json`], rejecting with [`Error::Validation`].
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// Query string extractor like [`axum::extract::Query`], rejecting with
/// [`Error::Validation`].
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

const JSON_DATA_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

fn is_serde_path(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

/// `products[0].quantity` becomes `products.0.quantity`.
fn dotted(path: &str) -> String {
    path.replace('[', ".").replace(']', "").trim_matches('.').to_string()
}

fn join_field(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{parent}.{name}"),
        _ => name.to_string(),
    }
}

/// Turns a JSON deserialization message into a field-level error.
///
/// The message is `<path>: <serde error>`, or only the serde error for the
/// document root.
fn json_data_error(text: &str) -> Error {
    let detail = text.strip_prefix(JSON_DATA_PREFIX).unwrap_or(text);
    let (path, reason) = match detail.split_once(": ") {
        Some((path, reason)) if is_serde_path(path) => (Some(dotted(path)), reason),
        _ => (None, detail),
    };
    let reason = reason.split(" at line ").next().unwrap_or(reason);

    let missing = reason
        .strip_prefix("missing field `")
        .and_then(|rest| rest.strip_suffix('`'));
    match missing {
        Some(name) => Error::validation(join_field(path.as_deref(), name), "is required"),
        None => Error::validation(path.unwrap_or_else(|| "body".to_string()), reason),
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => json_data_error(&e.body_text()),
            other => Self::validation("body", other.body_text()),
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation("query", rejection.body_text())
    }
}

/// The raw bearer token of the request.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| Self(token.to_string()))
            .ok_or(Error::Unauthenticated)
    }
}

/// Any authenticated back-office user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        auth::authenticate(&state.db, &token).await.map(Self)
    }
}

/// An authenticated superadmin.
#[derive(Debug, Clone)]
pub struct SuperAdmin(pub user::Model);

impl FromRequestParts<AppState> for SuperAdmin {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_superadmin() {
            tracing::warn!(user_id = user.id, "Superadmin action refused");
            return Err(Error::Forbidden);
        }
        Ok(Self(user))
    }
}
