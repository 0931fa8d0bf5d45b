//! JSON envelopes and the mapping from [`Error`] to HTTP responses.

use crate::{core::pagination::Page, errors::Error};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

/// Paging metadata of a list response.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Meta {
    /// 1-based page number
    pub current_page: u64,
    /// Page size used
    pub per_page: u64,
    /// Items across all pages
    pub total: u64,
}

/// `{ data, message?, meta? }` body returned by every successful handler.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<Meta>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> ApiResponse<T> {
    /// 200 with `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            data,
            message: None,
            meta: None,
            status: StatusCode::OK,
        }
    }

    /// 201 with `data`.
    pub const fn created(data: T) -> Self {
        Self {
            data,
            message: None,
            meta: None,
            status: StatusCode::CREATED,
        }
    }

    /// Adds a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// 200 with the items of `page` and its paging metadata.
    pub fn page(page: Page<T>) -> Self {
        let meta = Meta {
            current_page: page.current_page,
            per_page: page.per_page,
            total: page.total,
        };
        Self {
            meta: Some(meta),
            ..Self::ok(page.items)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Empty-data response carrying only a message.
pub fn message(text: &str) -> ApiResponse<Option<()>> {
    ApiResponse::ok(None).with_message(text)
}

impl Error {
    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::OrderRejected { .. }
            | Self::TotalsMismatch { .. }
            | Self::LastSuperadmin
            | Self::Upload { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::ProductNotFound { .. }
            | Self::PackNotFound { .. }
            | Self::OrderNotFound { .. }
            | Self::UserNotFound { .. }
            | Self::PackItemNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Config { .. }
            | Self::Hashing(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation { field, message } => {
                let mut errors = serde_json::Map::new();
                errors.insert(field.clone(), json!([message]));
                json!({ "message": self.to_string(), "errors": errors })
            }
            Self::OrderRejected { reason } => json!({
                "message": "Unable to place order",
                "error": reason,
            }),
            _ if status.is_server_error() => {
                tracing::error!("Request failed: {self}");
                json!({ "message": "Server error" })
            }
            _ => json!({ "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
