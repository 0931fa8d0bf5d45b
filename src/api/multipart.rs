//! Reading `multipart/form-data` bodies and storing their files.

use crate::{
    core::upload::ImageStore,
    errors::{Error, Result},
};
use axum::{body::Bytes, extract::Multipart};
use std::collections::HashMap;

/// One uploaded file.
#[derive(Debug)]
pub struct UploadedFile {
    /// Form field name, without a trailing `[]`
    pub field: String,
    /// Client-side file name
    pub file_name: String,
    /// File content
    pub bytes: Bytes,
}

/// A fully read multipart body.
#[derive(Debug, Default)]
pub struct Form {
    /// Text fields by name
    pub fields: HashMap<String, String>,
    /// Files in submission order
    pub files: Vec<UploadedFile>,
}

impl Form {
    /// Reads every part of `multipart`.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(|e| Error::Upload {
            message: e.body_text(),
        })? {
            let name = field
                .name()
                .unwrap_or_default()
                .trim_end_matches("[]")
                .to_string();
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| Error::Upload {
                message: e.body_text(),
            })?;

            match file_name {
                Some(file_name) => form.files.push(UploadedFile {
                    field: name,
                    file_name,
                    bytes,
                }),
                None => {
                    let text = String::from_utf8(bytes.to_vec()).map_err(|_| Error::Upload {
                        message: format!("field {name} is not valid UTF-8"),
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// Files submitted under `field`.
    pub fn files_named<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a UploadedFile> {
        self.files.iter().filter(move |file| file.field == field)
    }

    /// Stores every file submitted under `field` and returns their URLs.
    pub async fn store_files(&self, store: &ImageStore, field: &str, directory: &str) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        for file in self.files_named(field) {
            urls.push(store.store(directory, &file.file_name, &file.bytes).await?);
        }
        Ok(urls)
    }
}
