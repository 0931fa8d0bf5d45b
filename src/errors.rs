//! Unified error types and result handling.
//!
//! Every layer returns [`Result`]; the HTTP layer maps each variant to a status
//! code in one place (see `api::response`).

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// A request field failed validation.
    #[error("{field}: {message}")]
    Validation {
        /// Name of the offending field, dotted for nested fields
        field: String,
        /// Human-readable reason
        message: String,
    },

    /// No product with this id.
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Requested product id
        id: i64,
    },

    /// No pack with this id.
    #[error("Pack not found: {id}")]
    PackNotFound {
        /// Requested pack id
        id: i64,
    },

    /// No order with this id.
    #[error("Order not found: {id}")]
    OrderNotFound {
        /// Requested order id
        id: i64,
    },

    /// No user with this id.
    #[error("User not found: {id}")]
    UserNotFound {
        /// Requested user id
        id: i64,
    },

    /// The product is not part of the pack.
    #[error("Product {product_id} is not part of pack {pack_id}")]
    PackItemNotFound {
        /// Pack id
        pack_id: i64,
        /// Product id
        product_id: i64,
    },

    /// The recomputed cart total disagrees with the submitted one.
    #[error("Totals mismatch: submitted {submitted:.2}, expected {expected:.2}")]
    TotalsMismatch {
        /// Total sent by the client
        submitted: f64,
        /// Total recomputed from the catalog
        expected: f64,
    },

    /// The order could not be placed; wraps the underlying reason.
    #[error("Unable to place order: {reason}")]
    OrderRejected {
        /// Underlying error message
        reason: String,
    },

    /// Email/password pair did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing or unknown bearer token.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Authenticated but not allowed.
    #[error("Unauthorized")]
    Forbidden,

    /// Deleting or demoting this user would leave no superadmin.
    #[error("At least one superadmin must remain")]
    LastSuperadmin,

    /// Password hashing failed.
    #[error("Password hashing error: {0}")]
    Hashing(String),

    /// Malformed multipart upload.
    #[error("Upload error: {message}")]
    Upload {
        /// What went wrong
        message: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a field validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<bcrypt::BcryptError> for Error {
    fn from(value: bcrypt::BcryptError) -> Self {
        Self::Hashing(value.to_string())
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
