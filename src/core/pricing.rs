//! Discount pricing shared by products and packs.
//!
//! Both catalog entities carry a base `price` and an optional percentage
//! `promotion`; [`Priced::final_price`] is the only place the discount is
//! applied, so the two cannot drift apart.

use crate::entities::{pack, product};

/// Absolute tolerance when comparing a submitted total to a recomputed one.
pub const TOTAL_TOLERANCE: f64 = 0.01;

/// Rounds an amount to cents, half away from zero.
#[must_use]
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Applies a percentage promotion to a base price.
///
/// A missing or zero promotion returns the price unchanged. The result is
/// rounded to cents. Range checks on `promotion` belong to input validation.
#[must_use]
pub fn final_price(price: f64, promotion: Option<f64>) -> f64 {
    match promotion {
        Some(percent) if percent.abs() > f64::EPSILON => {
            round_currency(price - price * (percent / 100.0))
        }
        _ => round_currency(price),
    }
}

/// Whether two totals agree within [`TOTAL_TOLERANCE`].
#[must_use]
pub fn totals_match(submitted: f64, expected: f64) -> bool {
    // Small epsilon so a difference of exactly one cent is not rejected by
    // binary float noise.
    (submitted - expected).abs() <= TOTAL_TOLERANCE + 1e-9
}

/// Anything sold at a base price with an optional percentage promotion.
pub trait Priced {
    /// Base price before promotion.
    fn base_price(&self) -> f64;

    /// Percentage promotion in [0, 100], if any.
    fn promotion(&self) -> Option<f64>;

    /// Price after promotion, rounded to cents.
    fn final_price(&self) -> f64 {
        final_price(self.base_price(), self.promotion())
    }
}

impl Priced for product::Model {
    fn base_price(&self) -> f64 {
        self.price
    }

    fn promotion(&self) -> Option<f64> {
        self.promotion
    }
}

impl Priced for pack::Model {
    fn base_price(&self) -> f64 {
        self.price
    }

    fn promotion(&self) -> Option<f64> {
        self.promotion
    }
}
