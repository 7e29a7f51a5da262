//! Booking model and input validation
//!
//! A booking is created in state `Requested` from a client-supplied draft,
//! and moves to `Confirmed` exactly once when the customer supplies contact
//! details and GDPR consent. There is no transition out of `Confirmed`.

use crate::error::{Error, Result};
use crate::pricing::{self, AddOn, CleaningCategory, Price, MIN_DURATION_HOURS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle state of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingState {
    /// Created, no customer fields attached yet
    Requested,
    /// Customer fields populated, price finalized, notification attempted
    Confirmed,
}

/// A customer's cleaning service request and its lifecycle record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Store-assigned identity
    pub id: u64,

    /// Where the cleaning takes place
    pub location: Option<String>,

    /// Calendar date of the appointment
    pub date: String,

    /// Time of day of the appointment
    pub time: String,

    /// Booked duration in hours (at least [`MIN_DURATION_HOURS`])
    pub duration_hours: u32,

    /// Cleaning category
    pub category: CleaningCategory,

    /// Selected premium add-ons
    pub addons: BTreeSet<AddOn>,

    /// Whether the customer wants to renegotiate if the job runs longer
    pub renegotiate: bool,

    /// Computed total price; always `duration_hours * rate(category, addons)`
    pub price: Price,

    /// Customer name, present once confirmed
    pub customer_name: Option<String>,

    /// Validated customer email, present once confirmed
    pub customer_email: Option<String>,

    /// Customer postal address, present once confirmed
    pub customer_address: Option<String>,

    /// Normalized customer phone number, present once confirmed
    pub customer_phone: Option<String>,

    /// GDPR consent; must be true for the booking to be confirmed
    pub gdpr_consent: bool,

    /// Lifecycle state
    pub state: BookingState,

    /// When the booking was created
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// When the booking was confirmed, if it was
    pub confirmed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Booking {
    /// Materialize a stored booking from a validated request.
    ///
    /// This constructor is public for use by [`BookingStore`] implementations
    /// and contract tests; application code obtains bookings through the
    /// lifecycle service.
    ///
    /// [`BookingStore`]: crate::traits::BookingStore
    pub fn new(id: u64, request: NewBooking) -> Self {
        Self {
            id,
            location: request.location,
            date: request.date,
            time: request.time,
            duration_hours: request.duration_hours,
            category: request.category,
            addons: request.addons,
            renegotiate: request.renegotiate,
            price: request.price,
            customer_name: None,
            customer_email: None,
            customer_address: None,
            customer_phone: None,
            gdpr_consent: false,
            state: BookingState::Requested,
            created_at: chrono::Utc::now(),
            confirmed_at: None,
        }
    }

    /// Whether this booking has been confirmed
    pub fn is_confirmed(&self) -> bool {
        self.state == BookingState::Confirmed
    }

    /// Attach validated customer details, finalize the price and flip the
    /// state to `Confirmed`.
    ///
    /// Re-confirming an already-confirmed booking overwrites the customer
    /// fields with identical validated values; the stored record converges.
    pub(crate) fn confirm(&mut self, customer: CustomerDetails, price: Price) {
        self.customer_name = Some(customer.name);
        self.customer_email = Some(customer.email);
        self.customer_address = Some(customer.address);
        self.customer_phone = Some(customer.phone);
        self.gdpr_consent = true;
        self.price = price;
        self.state = BookingState::Confirmed;
        self.confirmed_at = Some(chrono::Utc::now());
    }
}

/// Client-supplied fields for creating a booking.
///
/// Everything is optional at the edge; [`BookingDraft::validate`] enforces
/// presence and the duration minimum.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingDraft {
    /// Where the cleaning takes place (optional)
    pub location: Option<String>,
    /// Calendar date of the appointment
    pub date: Option<String>,
    /// Time of day of the appointment
    pub time: Option<String>,
    /// Requested duration in hours
    pub duration_hours: Option<u32>,
    /// Cleaning category
    pub category: Option<CleaningCategory>,
    /// Selected premium add-ons
    #[serde(default)]
    pub addons: BTreeSet<AddOn>,
    /// Renegotiate-if-longer flag
    #[serde(default)]
    pub renegotiate: bool,
}

impl BookingDraft {
    /// Validate presence of the required fields and compute the price.
    ///
    /// Rejects with a validation error when date, time, duration or category
    /// is missing, or when the duration is below the domain minimum. Nothing
    /// is persisted on rejection.
    pub fn validate(self) -> Result<NewBooking> {
        let date = non_empty(self.date, "date")?;
        let time = non_empty(self.time, "time")?;
        let duration_hours = self
            .duration_hours
            .ok_or_else(|| Error::validation("duration is required"))?;
        let category = self
            .category
            .ok_or_else(|| Error::validation("cleaning category is required"))?;

        if duration_hours < MIN_DURATION_HOURS {
            return Err(Error::validation(format!(
                "duration must be at least {} hours, got {}",
                MIN_DURATION_HOURS, duration_hours
            )));
        }

        let price = pricing::quote(&category, &self.addons, duration_hours);

        Ok(NewBooking {
            location: self.location.filter(|l| !l.trim().is_empty()),
            date,
            time,
            duration_hours,
            category,
            addons: self.addons,
            renegotiate: self.renegotiate,
            price,
        })
    }
}

/// A validated, priced booking request ready for persistence
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub location: Option<String>,
    pub date: String,
    pub time: String,
    pub duration_hours: u32,
    pub category: CleaningCategory,
    pub addons: BTreeSet<AddOn>,
    pub renegotiate: bool,
    pub price: Price,
}

/// Customer contact details submitted at confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    /// Customer name
    pub name: String,
    /// Customer email address
    pub email: String,
    /// Customer postal address
    pub address: String,
    /// Customer phone number
    pub phone: String,
    /// GDPR consent checkbox value
    pub gdpr_consent: bool,
}

impl CustomerDetails {
    /// Validate and normalize the customer fields.
    ///
    /// All four contact fields must be non-empty, consent must be true, the
    /// email must be syntactically valid, and the phone must pass validation
    /// after whitespace normalization. Returns the normalized details.
    pub fn validated(self) -> Result<CustomerDetails> {
        let name = self.name.trim().to_string();
        let email = self.email.trim().to_string();
        let address = self.address.trim().to_string();
        let phone = normalize_phone(&self.phone);

        if name.is_empty() {
            return Err(Error::validation("customer name is required"));
        }
        if address.is_empty() {
            return Err(Error::validation("customer address is required"));
        }
        if !self.gdpr_consent {
            return Err(Error::validation("GDPR consent is required to confirm"));
        }
        if email.is_empty() {
            return Err(Error::validation("customer email is required"));
        }
        if !is_valid_email(&email) {
            return Err(Error::validation(format!("invalid email address: {}", email)));
        }
        if phone.is_empty() {
            return Err(Error::validation("customer phone is required"));
        }
        if !is_valid_phone(&phone) {
            return Err(Error::validation(format!("invalid phone number: {}", phone)));
        }

        Ok(CustomerDetails {
            name,
            email,
            address,
            phone,
            gdpr_consent: true,
        })
    }
}

/// Filter for booking list queries
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    /// Exact-match location filter
    pub location: Option<String>,
    /// Exact-match date filter
    pub date: Option<String>,
    /// Category filter
    pub category: Option<CleaningCategory>,
}

impl BookingFilter {
    /// Create an empty filter matching every booking
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Filter by date
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Filter by cleaning category
    pub fn with_category(mut self, category: CleaningCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Whether a booking matches every set field
    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(ref location) = self.location {
            if booking.location.as_deref() != Some(location.as_str()) {
                return false;
            }
        }
        if let Some(ref date) = self.date {
            if booking.date != *date {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if booking.category != *category {
                return false;
            }
        }
        true
    }
}

fn non_empty(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::validation(format!("{} is required", field))),
    }
}

/// Syntactic email check: one `@`, non-empty local part, and a domain with a
/// dot that has text on both sides. No whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Strip all whitespace from a phone number (international numbers are
/// submitted with grouping spaces)
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Validate a normalized phone number: an optional leading `+`, then at
/// least seven characters of digits, hyphens and parentheses.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    digits.len() >= 7
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == '(' || c == ')')
}
