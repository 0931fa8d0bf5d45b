//! Site settings: theme colors, contact details, social links, logo and the
//! home page carousel.
//!
//! Each section is stored as one JSON row of the `settings` table keyed by
//! section name.

use crate::{
    core::validation,
    entities::{Setting, setting},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use std::collections::HashMap;

const THEME: &str = "theme";
const CONTACT: &str = "contact";
const SOCIAL: &str = "social";
const LOGO: &str = "logo";
const CAROUSEL: &str = "carousel";

/// Storefront colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Primary color
    pub primary: String,
    /// Secondary color
    pub secondary: String,
    /// Page background
    pub background: String,
    /// Text color
    pub text: String,
}

/// Shop contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Phone number
    pub phone: String,
    /// Contact email
    pub email: String,
    /// Postal address
    pub address: String,
}

/// Social network links; other networks are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Social {
    /// Facebook page URL
    #[serde(default)]
    pub facebook: Option<String>,
    /// Instagram profile URL
    #[serde(default)]
    pub instagram: Option<String>,
}

/// All settings, as served to the storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteSettings {
    /// Colors, when configured
    pub theme: Option<Theme>,
    /// Contact details, when configured
    pub contact: Option<Contact>,
    /// Social links, when configured
    pub social: Option<Social>,
    /// Carousel image URLs
    pub carousel: Vec<String>,
    /// Logo URL
    pub logo: Option<String>,
}

/// Settings submitted from the back office.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsUpdate {
    /// Colors
    pub theme: Theme,
    /// Contact details
    pub contact: Contact,
    /// Social links
    #[serde(default)]
    pub social: Social,
    /// Keep the current logo when no new one is uploaded
    #[serde(default)]
    pub keep_logo: bool,
    /// Current carousel URLs to keep
    #[serde(default)]
    pub keep_carousel: Vec<String>,
}

/// Logo row payload.
#[derive(Debug, Default, Deserialize)]
struct LogoValue {
    url: Option<String>,
}

fn decode<T: DeserializeOwned>(values: &mut HashMap<String, Json>, key: &str) -> Option<T> {
    let value = values.remove(key)?;
    serde_json::from_value(value)
        .inspect_err(|e| tracing::warn!("Ignoring malformed {key} setting: {e}"))
        .ok()
}

/// Reads every settings section; missing or malformed sections are empty.
pub async fn get_settings<C>(db: &C) -> Result<SiteSettings>
where
    C: ConnectionTrait,
{
    let mut values: HashMap<String, Json> = Setting::find()
        .all(db)
        .await?
        .into_iter()
        .map(|row| (row.key, row.value))
        .collect();

    let logo: Option<LogoValue> = decode(&mut values, LOGO);
    Ok(SiteSettings {
        theme: decode(&mut values, THEME),
        contact: decode(&mut values, CONTACT),
        social: decode(&mut values, SOCIAL),
        carousel: decode(&mut values, CAROUSEL).unwrap_or_default(),
        logo: logo.and_then(|logo| logo.url),
    })
}

/// Validates submitted settings and returns the normalized sections.
pub fn validate(update: &SettingsUpdate) -> Result<(Theme, Contact, Social)> {
    let theme = Theme {
        primary: validation::required_text("theme.primary", &update.theme.primary, 20)?,
        secondary: validation::required_text("theme.secondary", &update.theme.secondary, 20)?,
        background: validation::required_text("theme.background", &update.theme.background, 20)?,
        text: validation::required_text("theme.text", &update.theme.text, 20)?,
    };
    let email = validation::email("contact.email", &update.contact.email)?;
    validation::max_length("contact.email", &email, 150)?;
    let contact = Contact {
        phone: validation::required_text("contact.phone", &update.contact.phone, 100)?,
        email,
        address: validation::required_text("contact.address", &update.contact.address, 255)?,
    };
    let social = Social {
        facebook: validation::web_url("social.facebook", update.social.facebook.as_deref(), 255)?,
        instagram: validation::web_url("social.instagram", update.social.instagram.as_deref(), 255)?,
    };
    Ok((theme, contact, social))
}

async fn put<C>(db: &C, key: &str, value: Json) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = Setting::find()
        .filter(setting::Column::Key.eq(key))
        .one(db)
        .await?;

    match existing {
        Some(row) => {
            let mut row: setting::ActiveModel = row.into();
            row.value = Set(value);
            row.updated_at = Set(Utc::now());
            row.update(db).await?;
        }
        None => {
            setting::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value),
                updated_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

/// Replaces the site settings.
///
/// `uploaded_logo` and `uploaded_carousel` are URLs of files already stored
/// for this request. The logo is cleared unless `keep_logo` is set, then
/// replaced by an upload. The carousel keeps the current URLs listed in
/// `keep_carousel`, followed by the uploads, without duplicates.
///
/// # Errors
/// Returns [`Error::Validation`](crate::errors::Error::Validation) for a missing or oversized theme or contact
/// field and for malformed social URLs; nothing is stored in that case.
pub async fn update_settings(
    db: &DatabaseConnection,
    update: SettingsUpdate,
    uploaded_logo: Option<String>,
    uploaded_carousel: Vec<String>,
) -> Result<SiteSettings> {
    let (theme, contact, social) = validate(&update)?;

    let txn = db.begin().await?;
    let current = get_settings(&txn).await?;

    let logo = uploaded_logo.or(if update.keep_logo { current.logo } else { None });

    let mut carousel: Vec<String> = Vec::new();
    let kept = current
        .carousel
        .into_iter()
        .filter(|url| update.keep_carousel.contains(url));
    for url in kept.chain(uploaded_carousel) {
        if !carousel.contains(&url) {
            carousel.push(url);
        }
    }

    put(&txn, THEME, serde_json::to_value(&theme)?).await?;
    put(&txn, CONTACT, serde_json::to_value(&contact)?).await?;
    put(&txn, SOCIAL, serde_json::to_value(&social)?).await?;
    put(&txn, LOGO, json!({ "url": logo })).await?;
    put(&txn, CAROUSEL, serde_json::to_value(&carousel)?).await?;
    txn.commit().await?;

    tracing::info!(carousel = carousel.len(), has_logo = logo.is_some(), "Settings updated");
    Ok(SiteSettings {
        theme: Some(theme),
        contact: Some(contact),
        social: Some(social),
        carousel,
        logo,
    })
}
