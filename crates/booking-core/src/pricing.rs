//! Pricing policy for cleaning bookings
//!
//! Pure rate lookup and price computation. The hourly rate is keyed by
//! (category, add-on count): `Standard` and `ApartmentOrHotel` bookings move
//! through three rate tiers as premium add-ons are selected, every other
//! category always bills at the base rate.
//!
//! Duration validation is the caller's responsibility; `quote` assumes it
//! already holds `duration_hours >= MIN_DURATION_HOURS`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Minimum bookable duration in hours
pub const MIN_DURATION_HOURS: u32 = 3;

/// A currency amount in euro cents.
///
/// Integer cents keep price arithmetic exact; `Display` renders the
/// conventional two-decimal form (`"150.00"`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Create a price from euro cents
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount in euro cents
    pub const fn cents(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

/// Cleaning category of a booking
///
/// A closed enumeration; rate lookup never string-matches. Records imported
/// from before the category field was constrained carry their free-form name
/// in `Legacy`, which always bills at the base rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningCategory {
    /// Standard home cleaning
    Standard,
    /// Office cleaning
    Office,
    /// Apartment or hotel turnover cleaning
    ApartmentOrHotel,
    /// Free-form category from legacy records
    Legacy(String),
}

impl CleaningCategory {
    /// Whether this category's rate is affected by add-ons
    pub fn supports_addons(&self) -> bool {
        matches!(self, Self::Standard | Self::ApartmentOrHotel)
    }
}

impl fmt::Display for CleaningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "Standard"),
            Self::Office => write!(f, "Office"),
            Self::ApartmentOrHotel => write!(f, "Apartment / Hotel"),
            Self::Legacy(name) => write!(f, "{}", name),
        }
    }
}

/// Premium add-on service component
///
/// Each selected add-on moves add-on-eligible categories one rate tier up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOn {
    /// Intensive deep cleaning
    IntensiveCleaning,
    /// Interior/exterior window cleaning
    WindowCleaning,
}

impl AddOn {
    /// Human-readable name used in notifications
    pub fn label(&self) -> &'static str {
        match self {
            Self::IntensiveCleaning => "Intensive cleaning",
            Self::WindowCleaning => "Window cleaning",
        }
    }
}

impl fmt::Display for AddOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Hourly base rate in euro cents (all categories, zero add-ons)
const BASE_RATE: Price = Price::from_cents(3000);

/// Hourly rates for add-on-eligible categories, indexed by add-on count
const TIERED_RATES: [Price; 3] = [
    Price::from_cents(3000),
    Price::from_cents(4200),
    Price::from_cents(4800),
];

/// Look up the hourly rate for a category and add-on count.
///
/// Only two add-ons exist, so counts above two clamp to the highest tier.
pub fn hourly_rate(category: &CleaningCategory, addon_count: usize) -> Price {
    if category.supports_addons() {
        TIERED_RATES[addon_count.min(TIERED_RATES.len() - 1)]
    } else {
        BASE_RATE
    }
}

/// Compute the total price for a booking.
///
/// `amount = duration_hours * hourly_rate(category, addons)`. The caller has
/// already validated `duration_hours >= MIN_DURATION_HOURS`.
pub fn quote(category: &CleaningCategory, addons: &BTreeSet<AddOn>, duration_hours: u32) -> Price {
    let rate = hourly_rate(category, addons.len());
    Price::from_cents(rate.cents() * i64::from(duration_hours))
}
