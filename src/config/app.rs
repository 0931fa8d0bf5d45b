//! Application configuration loading from config.toml
//!
//! `config.toml` describes the listening address, where uploaded files live,
//! the superadmin account to create on first run and an optional catalog to
//! seed. Every section is optional; environment variables override the file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Upload storage settings
    pub storage: StorageConfig,
    /// Superadmin seeded when no superadmin exists
    pub admin: AdminConfig,
    /// Products seeded when the catalog is empty
    pub products: Vec<ProductSeed>,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind (`BIND_ADDRESS` overrides)
    pub bind: String,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// Upload storage settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory served under `/storage`
    pub public_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("storage/public"),
        }
    }
}

/// Superadmin seeded on first run. The password comes from `ADMIN_PASSWORD`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            name: "Super Admin".to_string(),
            email: "admin@ecom.test".to_string(),
        }
    }
}

/// Configuration for a single seeded product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductSeed {
    /// Display title
    pub title: String,
    /// Catalog category
    pub category: String,
    /// Base price
    pub price: f64,
    /// Percentage discount
    #[serde(default)]
    pub promotion: Option<f64>,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Units in stock
    #[serde(default)]
    pub stock: i32,
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read, the TOML syntax is invalid
/// or a field has the wrong type.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the application configuration.
///
/// Reads `CONFIG_PATH` (default `./config.toml`); a missing file yields the
/// defaults. `BIND_ADDRESS` and `PUBLIC_DIR` override the file.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        load_config(&path)
            .inspect_err(|e| tracing::error!("Critical error loading configuration: {e}"))?
    } else {
        tracing::info!("No configuration file at {path}, using defaults");
        AppConfig::default()
    };

    if let Ok(bind) = std::env::var("BIND_ADDRESS") {
        config.server.bind = bind;
    }
    if let Ok(dir) = std::env::var("PUBLIC_DIR") {
        config.storage.public_dir = PathBuf::from(dir);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind = "0.0.0.0:9000"
            cors_origins = ["http://localhost:5173"]

            [storage]
            public_dir = "/srv/linen/public"

            [admin]
            name = "Owner"
            email = "owner@linen.test"

            [[products]]
            title = "Drap de bain coton"
            category = "Linge de bain"
            price = 89.99
            promotion = 15.0
            stock = 50

            [[products]]
            title = "Serviette bambou"
            category = "Linge de bain"
            price = 34.99
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.server.cors_origins.len(), 1);
        assert_eq!(config.storage.public_dir, PathBuf::from("/srv/linen/public"));
        assert_eq!(config.admin.email, "owner@linen.test");
        assert_eq!(config.products.len(), 2);
        assert_eq!(config.products[0].promotion, Some(15.0));
        assert_eq!(config.products[1].promotion, None);
        assert_eq!(config.products[1].stock, 0);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.admin.email, "admin@ecom.test");
        assert!(config.products.is_empty());
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let result = parse_config("[server]\nbind = 12");
        assert!(matches!(result, Err(Error::Config { message: _ })));
    }
}
