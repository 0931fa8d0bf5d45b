//! Input validation shared by the catalog, order and account operations.
//!
//! Every check reports the offending field so the HTTP layer can answer with
//! field-level messages.

use crate::{
    entities::json::MeasurePrice,
    errors::{Error, Result},
};
use url::Url;

/// Trims `value` and checks it is non-empty and at most `max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(field, "is required"));
    }
    max_length(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// Trims an optional value; blank strings become `None`.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) => {
            max_length(field, trimmed, max)?;
            Ok(Some(trimmed.to_string()))
        }
    }
}

/// Checks `value` is at most `max` characters.
pub fn max_length(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::validation(
            field,
            format!("may not be greater than {max} characters"),
        ));
    }
    Ok(())
}

/// Checks `value` is a well-formed email address.
pub fn email(field: &str, value: &str) -> Result<String> {
    let trimmed = required_text(field, value, 255)?;
    if !validator::validate_email(trimmed.as_str()) {
        return Err(Error::validation(field, "must be a valid email address"));
    }
    Ok(trimmed)
}

/// Checks an optional `http(s)` URL with a host; blank values become `None`.
pub fn web_url(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>> {
    let Some(trimmed) = optional_text(field, value, max)? else {
        return Ok(None);
    };
    let valid = Url::parse(&trimmed).is_ok_and(|parsed| {
        matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some_and(|h| !h.is_empty())
    });
    if !valid {
        return Err(Error::validation(field, "must be a valid URL"));
    }
    Ok(Some(trimmed))
}

/// Checks a monetary amount is finite and not negative.
pub fn amount(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(Error::validation(field, "must be a number"));
    }
    if value < 0.0 {
        return Err(Error::validation(field, "must be at least 0"));
    }
    Ok(value)
}

/// Checks an optional promotion lies in [0, 100].
pub fn promotion(field: &str, value: Option<f64>) -> Result<Option<f64>> {
    match value {
        Some(percent) if !percent.is_finite() || !(0.0..=100.0).contains(&percent) => Err(
            Error::validation(field, "must be between 0 and 100"),
        ),
        other => Ok(other),
    }
}

/// Checks each per-measure price has a measure label and a valid amount.
pub fn measure_prices(values: &[MeasurePrice]) -> Result<()> {
    for (i, mp) in values.iter().enumerate() {
        required_text(&format!("measure_prices.{i}.measure"), &mp.measure, 255)?;
        amount(&format!("measure_prices.{i}.price"), mp.price)?;
    }
    Ok(())
}

/// Checks an integer is at least `min`.
pub fn at_least(field: &str, value: i32, min: i32) -> Result<i32> {
    if value < min {
        return Err(Error::validation(field, format!("must be at least {min}")));
    }
    Ok(value)
}

/// Builds a URL slug: lowercase ASCII letters and digits separated by dashes.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        let mapped = match c {
            'à' | 'á' | 'â' | 'ä' | 'ã' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' | 'í' => 'i',
            'ô' | 'ö' | 'ó' => 'o',
            'ù' | 'û' | 'ü' | 'ú' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            c if c.is_ascii_alphanumeric() => c,
            _ => '-',
        };
        if mapped == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(mapped);
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
