//! Uploaded image storage on the local filesystem.
//!
//! Files land under `<public_dir>/<directory>/<uuid>.<ext>` and are addressed
//! by the relative URL `/storage/<directory>/<uuid>.<ext>`, which the HTTP
//! layer serves statically.

use crate::errors::{Error, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// URL prefix under which `public_dir` is served.
pub const PUBLIC_URL_PREFIX: &str = "/storage";

/// Extensions accepted for uploaded images.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "avif"];

/// Writes uploaded images below a public directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    public_dir: PathBuf,
}

impl ImageStore {
    /// Creates a store rooted at `public_dir`.
    pub fn new(public_dir: impl Into<PathBuf>) -> Self {
        Self {
            public_dir: public_dir.into(),
        }
    }

    /// Root directory of stored files.
    #[must_use]
    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// Stores `bytes` under `directory` with a fresh name and returns its URL.
    ///
    /// The extension is taken from `original_name`.
    ///
    /// # Errors
    /// Returns [`Error::Upload`] for an empty file or a non-image extension,
    /// and [`Error::Io`] when writing fails.
    pub async fn store(&self, directory: &str, original_name: &str, bytes: &[u8]) -> Result<String> {
        if bytes.is_empty() {
            return Err(Error::Upload {
                message: format!("{original_name} is empty"),
            });
        }
        let extension = image_extension(original_name).ok_or_else(|| Error::Upload {
            message: format!("{original_name} is not an image"),
        })?;

        let directory = clean_directory(directory);
        let file_name = format!("{}.{extension}", Uuid::new_v4());
        let target_dir = self.public_dir.join(&directory);

        tokio::fs::create_dir_all(&target_dir)
            .await
            .inspect_err(|e| tracing::error!("Failed to create {}: {e}", target_dir.display()))?;
        let path = target_dir.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .inspect_err(|e| tracing::error!("Failed to write {}: {e}", path.display()))?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored upload");
        Ok(public_url(&directory, &file_name))
    }
}

/// Lowercased image extension of `name`, if it has an accepted one.
fn image_extension(name: &str) -> Option<String> {
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Strips surrounding slashes, a leading `public/` and any `..` segment.
fn clean_directory(directory: &str) -> String {
    let trimmed = directory.trim_matches('/');
    let trimmed = trimmed.strip_prefix("public/").unwrap_or(trimmed);
    trimmed
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect::<Vec<_>>()
        .join("/")
}

fn public_url(directory: &str, file_name: &str) -> String {
    if directory.is_empty() {
        format!("{PUBLIC_URL_PREFIX}/{file_name}")
    } else {
        format!("{PUBLIC_URL_PREFIX}/{directory}/{file_name}")
    }
}
