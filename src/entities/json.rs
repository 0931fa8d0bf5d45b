//! JSON-backed column types shared by the catalog and order entities.
//!
//! Each wrapper is stored as a JSON text column and (de)serializes as its
//! inner value, so the API sees plain arrays.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// List of strings (image URLs, sizes, sheet measures, selected colors).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct StringList(pub Vec<String>);

impl From<Vec<String>> for StringList {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl StringList {
    /// First entry, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Whether `value` is present.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }
}

/// A color swatch offered for a product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    /// Display name ("Blanc", "Champagne")
    pub name: String,
    /// Optional hex code (`#FFFFFF`)
    #[serde(default)]
    pub hex: Option<String>,
}

/// List of color swatches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct ColorList(pub Vec<Color>);

impl ColorList {
    /// Name of the first color, if any.
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.0.first().map(|c| c.name.as_str())
    }

    /// Whether a color with this name is present.
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.0.iter().any(|c| c.name == name)
    }
}

/// Price shown for one specific measure (e.g. a sheet size).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurePrice {
    /// Measure label ("160x200x35 cm")
    pub measure: String,
    /// Price for that measure
    pub price: f64,
}

/// List of per-measure prices.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct MeasurePriceList(pub Vec<MeasurePrice>);

/// Per-item selection inside a pack line of a cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackItemSelection {
    /// Product inside the pack
    pub product_id: i64,
    /// Quantity of that product
    #[serde(default)]
    pub quantity: Option<i32>,
    /// Chosen color
    #[serde(default)]
    pub color: Option<String>,
    /// Chosen sheet measure
    #[serde(default)]
    pub sheet_measure: Option<String>,
}

/// One line of a submitted cart, stored verbatim on the order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product id, or pack id when `is_pack` is set
    pub product_id: i64,
    /// Number of units
    pub quantity: i32,
    /// Whether `product_id` refers to a pack
    #[serde(default)]
    pub is_pack: bool,
    /// Chosen size
    #[serde(default)]
    pub size: Option<String>,
    /// Chosen color
    #[serde(default)]
    pub color: Option<String>,
    /// Chosen sheet measure
    #[serde(default)]
    pub sheet_measure: Option<String>,
    /// Per-product selections when this line is a pack
    #[serde(default)]
    pub pack_items: Option<Vec<PackItemSelection>>,
}

/// The cart embedded in an order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct CartItems(pub Vec<CartItem>);
